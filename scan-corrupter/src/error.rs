use thiserror::Error;

use integral_tables::TableError;

#[derive(Debug, Error)]
pub enum CorruptionError {
    #[error("scan has {scan} points but {labels} labels")]
    LengthMismatch { scan: usize, labels: usize },
    #[error("unsupported beam drop count {0} (supported: 16, 32, 48)")]
    UnsupportedDropCount(u32),
    #[error("noise variant '{0}' is not implemented")]
    UnknownNoiseVariant(String),
    #[error("drop set of {dropped} and keep set of {kept} beams do not partition the 64 channels")]
    DropSetInvariant { dropped: usize, kept: usize },
    #[error(transparent)]
    Table(#[from] TableError),
}
