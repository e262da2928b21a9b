/// Reserved class id assigned to points replaced by a simulated fog return.
pub const FOG_LABEL: u32 = 21;

/// Low 16 bits of a label carry the semantic class; the upper bits may hold
/// instance or auxiliary flags.
pub const SEMANTIC_MASK: u32 = 0xFFFF;

// Scan rows are raw sensor output: the first four features are always
// x, y, z (in meters) and intensity; anything past that is carried verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    pub extra: Vec<f32>,
}

impl ScanPoint {
    pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
        ScanPoint {
            x,
            y,
            z,
            intensity,
            extra: Vec::new(),
        }
    }

    /// Euclidean distance from the sensor origin.
    pub fn range(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One full sensor sweep in original acquisition order.
///
/// The order encodes the azimuth/ring structure of a spinning sensor, so any
/// transform that filters by index must keep it intact.
#[derive(Debug, Clone)]
pub struct Scan {
    pub points: Vec<ScanPoint>,
    pub num_features: usize,
}

impl Scan {
    pub fn new(points: Vec<ScanPoint>, num_features: usize) -> Self {
        debug_assert!(num_features >= 4);
        debug_assert!(points
            .iter()
            .all(|p| p.extra.len() == num_features.saturating_sub(4)));
        Scan {
            points,
            num_features,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Strips instance/auxiliary bits, leaving only the semantic class id.
pub fn mask_semantic(labels: &mut [u32]) {
    for label in labels.iter_mut() {
        *label &= SEMANTIC_MASK;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_euclidean_norm() {
        let p = ScanPoint::new(3.0, 4.0, 0.0, 1.0);
        assert_eq!(p.range(), 5.0);
    }

    #[test]
    fn mask_semantic_keeps_low_16_bits() {
        let mut labels = vec![0x0001_0015, 0xFFFF_0000, 0x0000_0030];
        mask_semantic(&mut labels);
        assert_eq!(labels, vec![0x15, 0x0, 0x30]);
    }
}
