//! Precomputed integral lookup tables for the fog backscatter model.
//!
//! Tables are generated out-of-band, one artifact per (attenuation
//! coefficient, pulse half-width) bucket; this crate only discovers, loads
//! and queries them. Selection always snaps to the nearest available bucket,
//! never interpolates between tables.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Quantization step of the range key, in meters.
pub const KEY_STEP_M: f32 = 0.1;
/// Upper bound of the table domain, in meters; larger ranges are clamped.
pub const MAX_RANGE_M: f32 = 200.0;
/// Dense domain [0, 200] m at 0.1 m steps.
pub const ENTRY_COUNT: usize = 2001;

/// Pulse half-widths (ns) the table generator is run for.
pub const SUPPORTED_TAU_H_NS: [u32; 1] = [20];

const FILE_PREFIX: &str = "integral_0m_to_200m_stepsize_0.1m_tau_h_";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode integral table {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bitcode::Error,
    },
    #[error("no integral tables found under {0}")]
    NoTables(PathBuf),
    #[error("degenerate range {0} (negative or non-finite) has no table entry")]
    InvalidRange(f32),
    #[error("no table entry for quantized key {key} (table holds {len} entries)")]
    MissingEntry { key: usize, len: usize },
}

/// One range -> (effective scaled range, integrated backscatter response)
/// table for a single (alpha, tau_h) bucket. `entries[k]` corresponds to the
/// range k * 0.1 m.
#[derive(Debug, Clone, bitcode::Encode, bitcode::Decode)]
pub struct IntegralTable {
    pub alpha: f64,
    pub tau_h_ns: u32,
    pub entries: Vec<(f32, f32)>,
}

impl IntegralTable {
    /// Quantizes `range` (round to 0.1 m, clamp to 200 m) and returns the
    /// precomputed pair. Negative or non-finite ranges are rejected rather
    /// than clamped; they indicate a degenerate point upstream.
    pub fn lookup(&self, range: f32) -> Result<(f32, f32), TableError> {
        if !range.is_finite() || range < 0.0 {
            return Err(TableError::InvalidRange(range));
        }

        let key = (range.min(MAX_RANGE_M) / KEY_STEP_M).round() as usize;
        self.entries
            .get(key)
            .copied()
            .ok_or(TableError::MissingEntry {
                key,
                len: self.entries.len(),
            })
    }

    pub fn encode(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self, TableError> {
        bitcode::decode(bytes).map_err(|source| TableError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Canonical artifact file name for this table's bucket.
    pub fn file_name(&self) -> String {
        format!("{}{}ns_alpha_{}.bin", FILE_PREFIX, self.tau_h_ns, self.alpha)
    }
}

fn parse_table_name(name: &str) -> Option<(u32, f64)> {
    let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(".bin")?;
    let (tau, alpha) = stem.split_once("ns_alpha_")?;
    Some((tau.parse().ok()?, alpha.parse().ok()?))
}

/// Directory of integral table artifacts, indexed by bucket. The backing
/// files are read-only and safe to share across workers; `load` deserializes
/// on each call.
#[derive(Debug)]
pub struct TableStore {
    dir: PathBuf,
    // (alpha, tau_h_ns, path), sorted by alpha
    available: Vec<(f64, u32, PathBuf)>,
}

impl TableStore {
    pub fn open(dir: &Path) -> Result<Self, TableError> {
        let entries = fs::read_dir(dir).map_err(|source| TableError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut available = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TableError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some((tau_h_ns, alpha)) = parse_table_name(name) {
                available.push((alpha, tau_h_ns, path));
            }
        }

        if available.is_empty() {
            return Err(TableError::NoTables(dir.to_path_buf()));
        }
        available.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(TableStore {
            dir: dir.to_path_buf(),
            available,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn available_alphas(&self) -> Vec<f64> {
        self.available.iter().map(|(alpha, _, _)| *alpha).collect()
    }

    /// Loads the table whose bucket is nearest to the requested attenuation
    /// coefficient and pulse half-width (in seconds).
    pub fn load(&self, alpha: f64, tau_h_s: f64) -> Result<IntegralTable, TableError> {
        let tau_req = (tau_h_s * 1e9) as i64;
        let tau_h_ns = SUPPORTED_TAU_H_NS
            .iter()
            .copied()
            .min_by_key(|t| (*t as i64 - tau_req).abs())
            .expect("at least one supported half-width");

        let candidates: Vec<_> = self
            .available
            .iter()
            .filter(|(_, tau, _)| *tau == tau_h_ns)
            .collect();
        let (_, _, path) = candidates
            .iter()
            .min_by(|a, b| (a.0 - alpha).abs().total_cmp(&(b.0 - alpha).abs()))
            .ok_or_else(|| TableError::NoTables(self.dir.clone()))?;

        let bytes = fs::read(path).map_err(|source| TableError::Io {
            path: path.clone(),
            source,
        })?;
        IntegralTable::decode(path, &bytes)
    }
}
