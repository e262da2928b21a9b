pub mod binary;
pub mod parser;

pub use binary::{read_labels, read_scan, write_labels, write_scan};
pub use parser::{Parser, ScanPairParser};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: file size {size} is not a multiple of the {row_size}-byte row")]
    TruncatedScan {
        path: PathBuf,
        size: usize,
        row_size: usize,
    },
    #[error("{path}: file size {size} is not a multiple of 4 bytes per label")]
    TruncatedLabels { path: PathBuf, size: usize },
    #[error("feature count {0} is too small (x, y, z, intensity are required)")]
    BadFeatureCount(usize),
    #[error("scan has {points} points but label file has {labels} labels")]
    LengthMismatch { points: usize, labels: usize },
}
