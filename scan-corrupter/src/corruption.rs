use rand::rngs::StdRng;

use integral_tables::IntegralTable;
use scan_core::params::ParameterSet;
use scan_core::scan::Scan;

use crate::beam::{apply_beam_drop, DropCount};
use crate::error::CorruptionError;
use crate::fog::{simulate_fog, FogOptions};

/// One degradation applied to a scan/label pair. The driver owns the RNG so
/// each task can seed its own.
pub trait Corruption {
    fn apply(
        &self,
        scan: Scan,
        labels: Vec<u32>,
        rng: &mut StdRng,
    ) -> Result<(Scan, Vec<u32>), CorruptionError>;
}

/// Cross-sensor simulation: beam removal plus angular decimation.
pub struct BeamDropCorruption {
    pub drop_count: DropCount,
}

impl Corruption for BeamDropCorruption {
    fn apply(
        &self,
        scan: Scan,
        labels: Vec<u32>,
        _rng: &mut StdRng,
    ) -> Result<(Scan, Vec<u32>), CorruptionError> {
        apply_beam_drop(scan, labels, self.drop_count)
    }
}

/// Fog simulation against one preloaded integral table.
pub struct FogCorruption<'a> {
    pub params: ParameterSet,
    pub table: &'a IntegralTable,
    pub options: FogOptions,
}

impl Corruption for FogCorruption<'_> {
    fn apply(
        &self,
        scan: Scan,
        labels: Vec<u32>,
        rng: &mut StdRng,
    ) -> Result<(Scan, Vec<u32>), CorruptionError> {
        let output = simulate_fog(&self.params, self.table, &scan, &labels, &self.options, rng)?;
        Ok((output.scan, output.labels))
    }
}
