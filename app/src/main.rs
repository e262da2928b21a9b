use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use rayon::iter::{IndexedParallelIterator as _, IntoParallelRefIterator as _, ParallelIterator as _};
use thiserror::Error;

use integral_tables::{TableError, TableStore};
use scan_core::params::{ParameterError, ParameterSet};
use scan_core::scan::mask_semantic;
use scan_corrupter::beam::DropCount;
use scan_corrupter::fog::{simulate_fog, FogOptions, NoiseVariant};
use scan_corrupter::{BeamDropCorruption, Corruption as _, CorruptionError};
use scan_parser::{write_labels, write_scan, ParseError, Parser as _, ScanPairParser};

/// Attenuation coefficients sampled per scan; 0.0 leaves the geometry in
/// clear air while still producing fog returns from the nearest table.
const ALPHA_LEVELS: [f64; 6] = [0.0, 0.005, 0.01, 0.02, 0.03, 0.06];

#[derive(Parser, Debug)]
#[command(
    name = "Scan Corruptor",
    about = "Degrades recorded LiDAR scans with simulated fog or a reduced-beam sensor",
    version = "0.0.1"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Physically-grounded fog simulation (backscatter + attenuation)
    Fog(FogArgs),
    /// Cross-sensor simulation (beam removal + angular decimation)
    CrossSensor(CrossSensorArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Input scan files (.bin), as paths or glob patterns
    #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
    input: Vec<String>,

    /// Output dataset root; scans land in velodyne/, labels in labels/
    #[arg(short, long, required = true, value_name = "DIR")]
    output: String,

    /// Number of features per scan row (x, y, z, intensity, ...)
    #[arg(short = 'f', long, default_value_t = 4)]
    n_features: usize,

    /// Worker pool size
    #[arg(short = 'c', long, default_value_t = num_cpus::get())]
    n_cpus: usize,

    /// Global seed; every file derives its own generator from seed + index
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Abort the whole batch on the first failed file
    #[arg(long, default_value_t = false)]
    fail_fast: bool,
}

#[derive(Args, Debug)]
struct FogArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Backscattering coefficient (0.008 light, 0.05 moderate, 0.2 heavy)
    #[arg(short, long, default_value_t = 0.008)]
    beta: f64,

    /// Directory holding the precomputed integral lookup tables
    #[arg(long, value_name = "DIR")]
    integral_dir: PathBuf,

    /// Range-noise level for replaced points; 0 disables noise
    #[arg(long, default_value_t = 10)]
    noise: u32,

    /// Range-noise model (v1, v2, v3 or v4)
    #[arg(long, default_value = "v1")]
    noise_variant: String,

    /// Renormalize replaced intensities so the strongest is 255
    #[arg(long, default_value_t = false)]
    gain: bool,
}

#[derive(Args, Debug)]
struct CrossSensorArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of beams to drop: 16 (light), 32 (moderate) or 48 (heavy)
    #[arg(short = 'n', long, default_value_t = 16)]
    num_beam_to_drop: u32,
}

#[derive(Debug, Error)]
enum TaskError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

#[derive(serde::Serialize)]
struct RunSummary {
    total: usize,
    succeeded: usize,
    failed: usize,
    failed_files: Vec<String>,
}

fn expand_globs(input_patterns: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            for entry in glob(pattern).expect("Failed to read glob pattern") {
                match entry {
                    Ok(path) => paths.push(path),
                    Err(e) => eprintln!("Error: {:?}", e),
                }
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    paths.sort();
    paths
}

/// Derives the label file that pairs with a scan file: the `velodyne` path
/// component becomes `labels` and the extension becomes `.label`.
fn label_path_for(scan_path: &Path) -> PathBuf {
    let velodyne = std::ffi::OsStr::new("velodyne");
    let labels = std::ffi::OsStr::new("labels");
    let mut path: PathBuf = scan_path
        .iter()
        .map(|part| if part == velodyne { labels } else { part })
        .collect();
    path.set_extension("label");
    path
}

fn output_paths(output_root: &Path, scan_path: &Path) -> (PathBuf, PathBuf) {
    let name = scan_path.file_name().expect("scan files have a file name");
    let scan_out = output_root.join("velodyne").join(name);
    let label_out = output_root
        .join("labels")
        .join(Path::new(name).with_extension("label"));
    (scan_out, label_out)
}

/// Runs `process` over every file on a fixed-size pool, one independent task
/// per file. A failed file never blocks or corrupts its siblings; under
/// `--fail-fast` the first failure aborts the remaining tasks instead.
fn run_batch<F>(
    common: &CommonArgs,
    files: &[PathBuf],
    process: F,
) -> Result<RunSummary, rayon::ThreadPoolBuildError>
where
    F: Fn(usize, &Path) -> Result<(), TaskError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(common.n_cpus)
        .build()?;
    log::info!("using {} workers for {} files", common.n_cpus, files.len());

    let done = AtomicUsize::new(0);
    let total = files.len();

    let track = |index: usize, path: &Path| -> Result<(), TaskError> {
        let result = process(index, path);
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        if finished % 100 == 0 || finished == total {
            log::info!("processed {}/{} files", finished, total);
        }
        result
    };

    let failed_files: Vec<String> = if common.fail_fast {
        let first_failure = pool.install(|| {
            files.par_iter().enumerate().try_for_each(|(i, path)| {
                track(i, path).map_err(|e| {
                    log::error!("{}: {}", path.display(), e);
                    path.display().to_string()
                })
            })
        });
        first_failure.err().into_iter().collect()
    } else {
        pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .filter_map(|(i, path)| match track(i, path) {
                    Ok(()) => None,
                    Err(e) => {
                        log::error!("{}: {}", path.display(), e);
                        Some(path.display().to_string())
                    }
                })
                .collect()
        })
    };

    // under fail-fast not every file gets processed, so count completions
    let processed = done.load(Ordering::Relaxed);
    Ok(RunSummary {
        total,
        succeeded: processed - failed_files.len(),
        failed: failed_files.len(),
        failed_files,
    })
}

fn prepare_output(common: &CommonArgs) -> std::io::Result<PathBuf> {
    let output_root = PathBuf::from(&common.output);
    fs::create_dir_all(output_root.join("velodyne"))?;
    fs::create_dir_all(output_root.join("labels"))?;
    Ok(output_root)
}

fn write_summary(output_root: &Path, summary: &RunSummary) -> Result<(), Box<dyn std::error::Error>> {
    let summary_path = output_root.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(summary)?)?;
    log::info!("wrote batch summary: {:?}", summary_path);
    Ok(())
}

fn run_fog(args: FogArgs) -> Result<(), Box<dyn std::error::Error>> {
    let common = &args.common;

    // unsupported configuration is rejected before any file is touched
    let noise_variant: NoiseVariant = args.noise_variant.parse()?;

    let files = expand_globs(&common.input);
    log::info!("corrupting {} scans with fog (beta = {})", files.len(), args.beta);

    let store = TableStore::open(&args.integral_dir)?;
    log::info!(
        "integral tables under {:?}, available alphas: {:?}",
        store.dir(),
        store.available_alphas()
    );

    let output_root = prepare_output(common)?;

    let summary = run_batch(common, &files, |index, scan_path| {
        let mut rng = StdRng::seed_from_u64(common.seed.wrapping_add(index as u64));

        let parser = ScanPairParser {
            scan_path: scan_path.to_path_buf(),
            label_path: label_path_for(scan_path),
            num_features: common.n_features,
        };
        let (scan, mut labels) = parser.parse()?;
        mask_semantic(&mut labels);

        let alpha = ALPHA_LEVELS[rng.gen_range(0..ALPHA_LEVELS.len())];
        let params = ParameterSet::builder()
            .alpha(alpha)?
            .beta(args.beta)?
            .build()?;
        let table = store.load(params.alpha, params.tau_h)?;

        let options = FogOptions {
            noise: args.noise,
            noise_variant,
            gain: args.gain,
            ..Default::default()
        };
        let out = simulate_fog(&params, &table, &scan, &labels, &options, &mut rng)?;
        log::debug!(
            "{}: alpha {} replaced {} of {} points",
            scan_path.display(),
            alpha,
            out.num_replaced,
            scan.len()
        );

        let (scan_out, label_out) = output_paths(&output_root, scan_path);
        write_scan(&scan_out, &out.scan)?;
        write_labels(&label_out, &out.labels)?;
        Ok(())
    })?;

    write_summary(&output_root, &summary)?;
    Ok(())
}

fn run_cross_sensor(args: CrossSensorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let common = &args.common;

    let drop_count = DropCount::try_from(args.num_beam_to_drop)?;

    let files = expand_globs(&common.input);
    log::info!(
        "corrupting {} scans by dropping {} of 64 beams",
        files.len(),
        drop_count.count()
    );

    let output_root = prepare_output(common)?;
    let corruption = BeamDropCorruption { drop_count };

    let summary = run_batch(common, &files, |index, scan_path| {
        let mut rng = StdRng::seed_from_u64(common.seed.wrapping_add(index as u64));

        let parser = ScanPairParser {
            scan_path: scan_path.to_path_buf(),
            label_path: label_path_for(scan_path),
            num_features: common.n_features,
        };
        let (scan, labels) = parser.parse()?;

        let (out_scan, out_labels) = corruption.apply(scan, labels, &mut rng)?;

        let (scan_out, label_out) = output_paths(&output_root, scan_path);
        write_scan(&scan_out, &out_scan)?;
        write_labels(&label_out, &out_labels)?;
        Ok(())
    })?;

    write_summary(&output_root, &summary)?;
    Ok(())
}

fn main() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let start = std::time::Instant::now();

    let result = match cli.command {
        Command::Fog(args) => run_fog(args),
        Command::CrossSensor(args) => run_cross_sensor(args),
    };

    if let Err(e) = result {
        log::error!("batch failed: {}", e);
        std::process::exit(1);
    }

    log::info!("Elapsed: {:?}", start.elapsed());
    log::info!("Finish processing");
}
