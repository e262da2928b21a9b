use scan_core::scan::Scan;

/// Number of emitter/detector channels of the simulated sensor.
pub const NUM_BEAMS: u8 = 64;

/// Reconstructs a per-point ring id from raw geometry.
///
/// The source format stores no channel index, so the id is recovered by
/// watching the azimuth sweep: each time the projected angle wraps from near
/// 1 back to near 0, the scanner has finished one ring and moved to the next.
/// Only valid for a single-rotation, single-direction scan in strict
/// acquisition order; reordering or sub-sampling the points beforehand breaks
/// the wraparound detector.
pub fn estimate_ring_ids(scan: &Scan) -> Vec<u8> {
    let mut ids = Vec::with_capacity(scan.len());
    let mut ring: u32 = 0;
    let mut prev_proj: Option<f32> = None;

    for point in &scan.points {
        let yaw = (-point.y).atan2(-point.x);
        let proj = 0.5 * (yaw / std::f32::consts::PI + 1.0);

        if let Some(prev) = prev_proj {
            if prev > 0.8 && proj < 0.2 {
                ring += 1;
            }
        }
        prev_proj = Some(proj);

        // clamp absorbs estimation drift past the last channel
        ids.push(ring.min(NUM_BEAMS as u32 - 1) as u8);
    }

    ids
}

/// Places a point so that its projected azimuth equals `proj` in [0, 1).
#[cfg(test)]
pub(crate) fn point_at_proj(proj: f32, range: f32) -> scan_core::scan::ScanPoint {
    let yaw = (2.0 * proj - 1.0) * std::f32::consts::PI;
    scan_core::scan::ScanPoint::new(-range * yaw.cos(), -range * yaw.sin(), 0.0, 1.0)
}

/// Synthetic spinning scan: each ring sweeps the azimuth from low to high so
/// consecutive rings produce a wraparound.
#[cfg(test)]
pub(crate) fn synthetic_scan(rings: usize, per_ring: usize) -> Scan {
    let mut points = Vec::with_capacity(rings * per_ring);
    for _ in 0..rings {
        for k in 0..per_ring {
            let proj = 0.01 + 0.98 * k as f32 / (per_ring - 1) as f32;
            points.push(point_at_proj(proj, 20.0));
        }
    }
    Scan::new(points, 4)
}
