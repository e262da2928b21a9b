use std::fs;
use std::path::Path;

use byteorder::{ByteOrder as _, LittleEndian};

use scan_core::scan::{Scan, ScanPoint};

use crate::ParseError;

fn io_err(path: &Path, source: std::io::Error) -> ParseError {
    ParseError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads a headerless row-major array of little-endian f32 values,
/// `num_features` per point. The first four features are x, y, z, intensity;
/// any remaining ones are kept as extra channels.
pub fn read_scan(path: &Path, num_features: usize) -> Result<Scan, ParseError> {
    if num_features < 4 {
        return Err(ParseError::BadFeatureCount(num_features));
    }

    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let row_size = 4 * num_features;
    if bytes.len() % row_size != 0 {
        return Err(ParseError::TruncatedScan {
            path: path.to_path_buf(),
            size: bytes.len(),
            row_size,
        });
    }

    let mut values = vec![0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(&bytes, &mut values);

    let points = values
        .chunks_exact(num_features)
        .map(|row| ScanPoint {
            x: row[0],
            y: row[1],
            z: row[2],
            intensity: row[3],
            extra: row[4..].to_vec(),
        })
        .collect();

    Ok(Scan::new(points, num_features))
}

pub fn write_scan(path: &Path, scan: &Scan) -> Result<(), ParseError> {
    let mut values = Vec::with_capacity(scan.len() * scan.num_features);
    for p in &scan.points {
        values.extend_from_slice(&[p.x, p.y, p.z, p.intensity]);
        values.extend_from_slice(&p.extra);
    }

    let mut bytes = vec![0u8; values.len() * 4];
    LittleEndian::write_f32_into(&values, &mut bytes);
    fs::write(path, bytes).map_err(|e| io_err(path, e))
}

/// Reads a headerless array of little-endian u32 labels, one per point.
pub fn read_labels(path: &Path) -> Result<Vec<u32>, ParseError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    if bytes.len() % 4 != 0 {
        return Err(ParseError::TruncatedLabels {
            path: path.to_path_buf(),
            size: bytes.len(),
        });
    }

    let mut labels = vec![0u32; bytes.len() / 4];
    LittleEndian::read_u32_into(&bytes, &mut labels);
    Ok(labels)
}

pub fn write_labels(path: &Path, labels: &[u32]) -> Result<(), ParseError> {
    let mut bytes = vec![0u8; labels.len() * 4];
    LittleEndian::write_u32_into(labels, &mut bytes);
    fs::write(path, bytes).map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000000.bin");

        let points = vec![
            ScanPoint::new(1.0, 2.0, 3.0, 40.0),
            ScanPoint::new(-4.5, 0.25, 1.5, 0.0),
        ];
        let scan = Scan::new(points, 4);

        write_scan(&path, &scan).unwrap();
        let read = read_scan(&path, 4).unwrap();

        assert_eq!(read.len(), 2);
        assert_eq!(read.points, scan.points);
    }

    #[test]
    fn scan_round_trip_with_extra_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan5.bin");

        let mut p = ScanPoint::new(1.0, 0.0, 0.0, 10.0);
        p.extra = vec![0.5];
        let scan = Scan::new(vec![p], 5);

        write_scan(&path, &scan).unwrap();
        let read = read_scan(&path, 5).unwrap();
        assert_eq!(read.points[0].extra, vec![0.5]);
    }

    #[test]
    fn truncated_scan_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, [0u8; 17]).unwrap();

        assert!(matches!(
            read_scan(&path, 4),
            Err(ParseError::TruncatedScan { .. })
        ));
    }

    #[test]
    fn label_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000000.label");

        let labels = vec![0x0001_0015, 30, 0];
        write_labels(&path, &labels).unwrap();
        assert_eq!(read_labels(&path).unwrap(), labels);
    }
}
