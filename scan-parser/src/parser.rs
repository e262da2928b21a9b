use std::path::PathBuf;

use scan_core::scan::Scan;

use crate::{binary, ParseError};

pub trait Parser {
    fn parse(&self) -> Result<(Scan, Vec<u32>), ParseError>;
}

/// Loads one scan/label file pair and checks index alignment.
pub struct ScanPairParser {
    pub scan_path: PathBuf,
    pub label_path: PathBuf,
    pub num_features: usize,
}

impl Parser for ScanPairParser {
    fn parse(&self) -> Result<(Scan, Vec<u32>), ParseError> {
        let scan = binary::read_scan(&self.scan_path, self.num_features)?;
        let labels = binary::read_labels(&self.label_path)?;

        if scan.len() != labels.len() {
            return Err(ParseError::LengthMismatch {
                points: scan.len(),
                labels: labels.len(),
            });
        }

        Ok((scan, labels))
    }
}
