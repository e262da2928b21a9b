pub mod params;
pub mod scan;

pub use params::{ParameterError, ParameterSet, ParameterSetBuilder};
pub use scan::{Scan, ScanPoint, FOG_LABEL};
