use scan_core::scan::Scan;

use crate::error::CorruptionError;
use crate::ring::{estimate_ring_ids, NUM_BEAMS};

/// Number of beams removed to emulate a lower-resolution sensor.
/// 16 = light, 32 = moderate, 48 = heavy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCount {
    Sixteen,
    ThirtyTwo,
    FortyEight,
}

impl DropCount {
    pub fn count(self) -> usize {
        match self {
            DropCount::Sixteen => 16,
            DropCount::ThirtyTwo => 32,
            DropCount::FortyEight => 48,
        }
    }
}

impl TryFrom<u32> for DropCount {
    type Error = CorruptionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            16 => Ok(DropCount::Sixteen),
            32 => Ok(DropCount::ThirtyTwo),
            48 => Ok(DropCount::FortyEight),
            other => Err(CorruptionError::UnsupportedDropCount(other)),
        }
    }
}

/// Deterministic set of beam ids to remove. Depends only on the drop count,
/// never on the scan.
pub fn drop_set(count: DropCount) -> Vec<u8> {
    match count {
        DropCount::Sixteen => (1..NUM_BEAMS).step_by(4).collect(),
        DropCount::ThirtyTwo => (1..NUM_BEAMS).step_by(2).collect(),
        // fractional stride, truncated: 1, 2, 3, 4, 6, ... 63
        DropCount::FortyEight => (0..48).map(|k| (1.0 + 1.33 * k as f64) as u8).collect(),
    }
}

/// Complement of [`drop_set`] within [0, 63].
pub fn keep_set(count: DropCount) -> Vec<u8> {
    let mut dropped = [false; NUM_BEAMS as usize];
    for id in drop_set(count) {
        dropped[id as usize] = true;
    }
    (0..NUM_BEAMS).filter(|&id| !dropped[id as usize]).collect()
}

/// Removes every point whose estimated ring id is in the drop set, then keeps
/// every 2nd remaining point. Labels follow the scan index-for-index.
pub fn apply_beam_drop(
    scan: Scan,
    labels: Vec<u32>,
    count: DropCount,
) -> Result<(Scan, Vec<u32>), CorruptionError> {
    if scan.len() != labels.len() {
        return Err(CorruptionError::LengthMismatch {
            scan: scan.len(),
            labels: labels.len(),
        });
    }

    let drop = drop_set(count);
    let keep = keep_set(count);
    if drop.len() != count.count() || drop.len() + keep.len() != NUM_BEAMS as usize {
        return Err(CorruptionError::DropSetInvariant {
            dropped: drop.len(),
            kept: keep.len(),
        });
    }

    let ring_ids = estimate_ring_ids(&scan);
    let mut dropped = [false; NUM_BEAMS as usize];
    for id in drop {
        dropped[id as usize] = true;
    }

    let num_features = scan.num_features;
    let mut kept_points = Vec::with_capacity(scan.len());
    let mut kept_labels = Vec::with_capacity(labels.len());
    for ((point, label), ring) in scan.points.into_iter().zip(labels).zip(ring_ids) {
        if !dropped[ring as usize] {
            kept_points.push(point);
            kept_labels.push(label);
        }
    }

    // fixed-stride decimation, scan and labels jointly
    let points: Vec<_> = kept_points.into_iter().step_by(2).collect();
    let labels: Vec<_> = kept_labels.into_iter().step_by(2).collect();

    if points.len() != labels.len() {
        return Err(CorruptionError::LengthMismatch {
            scan: points.len(),
            labels: labels.len(),
        });
    }

    Ok((Scan::new(points, num_features), labels))
}
