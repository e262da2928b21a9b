pub mod beam;
pub mod corruption;
pub mod error;
pub mod fog;
pub mod ring;

pub use corruption::{BeamDropCorruption, Corruption, FogCorruption};
pub use error::CorruptionError;
