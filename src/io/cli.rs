//! Command-line interface for cubing tiles and inspecting datasets

use crate::api::dataset::Dataset;
use crate::cubing::executor::{TileCubingConfig, tile_cubing};
use crate::cubing::pattern::check_input_pattern;
use crate::format::voxel::VoxelType;
use crate::io::configuration::{
    DEFAULT_BATCH_SIZE, DEFAULT_DTYPE, DEFAULT_INPUT_PATH_PATTERN, DEFAULT_LAYER_NAME, VERSION,
};
use crate::io::error::Result;
use crate::io::logging::setup_logging;
use crate::io::progress::ProgressManager;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "wkcuber")]
#[command(author, version = VERSION, about = "Cube image tile stacks into WKW datasets")]
/// Command-line arguments shared by all subcommands
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors and hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available operations
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a directory of 2D tiles into a WKW layer
    Cube(CubeArgs),
    /// Print the layers and magnifications of a dataset
    Info(InfoArgs),
}

/// Arguments of `cube`
#[derive(Args, Debug)]
pub struct CubeArgs {
    /// Directory containing the input tiles
    #[arg(value_name = "SOURCE_PATH")]
    pub source_path: PathBuf,

    /// Output directory for the generated dataset
    #[arg(value_name = "TARGET_PATH")]
    pub target_path: PathBuf,

    /// Name of the cubed layer
    #[arg(short, long, default_value = DEFAULT_LAYER_NAME)]
    pub layer_name: String,

    /// Target element class (uint8, uint16, float32, ...)
    #[arg(short, long, default_value = DEFAULT_DTYPE)]
    pub dtype: VoxelType,

    /// Number of z slices buffered per write
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_positive)]
    pub batch_size: usize,

    /// Tile file names relative to the source path, e.g. `{zzzz}/{yyyy}/{xxxx}.png`
    #[arg(short, long, default_value = DEFAULT_INPUT_PATH_PATTERN, value_parser = check_input_pattern)]
    pub input_path_pattern: String,

    /// Worker threads, defaults to the available CPU count
    #[arg(short, long, value_parser = parse_positive)]
    pub jobs: Option<usize>,

    /// Voxel size in nanometers as `x,y,z`
    #[arg(short, long, default_value = "1,1,1", value_parser = parse_scale)]
    pub scale: [f64; 3],
}

impl CubeArgs {
    /// Cubing configuration for these arguments
    pub fn to_config(&self) -> TileCubingConfig {
        TileCubingConfig {
            source_path: self.source_path.clone(),
            target_path: self.target_path.clone(),
            layer_name: self.layer_name.clone(),
            voxel_type: self.dtype,
            batch_size: self.batch_size,
            input_path_pattern: self.input_path_pattern.clone(),
            jobs: self.jobs.unwrap_or_else(default_jobs),
            scale: self.scale,
        }
    }
}

/// Arguments of `info`
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Dataset directory
    #[arg(value_name = "DATASET_PATH")]
    pub dataset_path: PathBuf,
}

/// Number of worker threads when `--jobs` is absent
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Parse a voxel scale given as `x,y,z`
///
/// # Errors
///
/// Returns a message if there are not exactly three positive numbers
pub fn parse_scale(value: &str) -> std::result::Result<[f64; 3], String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid scale '{value}': {e}"))?;

    let scale: [f64; 3] = parts
        .try_into()
        .map_err(|_parts| format!("scale '{value}' must have three components"))?;
    if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(format!("scale '{value}' must be positive"));
    }
    Ok(scale)
}

fn parse_positive(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Human-readable overview of a dataset
pub fn describe_dataset(dataset: &Dataset) -> String {
    let properties = dataset.properties();
    let [sx, sy, sz] = properties.scale;
    let mut out = String::new();
    let _ = writeln!(out, "Dataset {} at {}", properties.id.name, dataset.path().display());
    let _ = writeln!(out, "Scale: {sx} x {sy} x {sz} nm");
    let storage = dataset.tiff().map_or_else(
        || "WKW".to_string(),
        |tiff| {
            tiff.tile_size.map_or_else(
                || format!("TIFF slices named {}", tiff.pattern),
                |[w, h]| format!("TIFF tiles of {w} x {h} named {}", tiff.pattern),
            )
        },
    );
    let _ = writeln!(out, "Storage: {storage}");

    for layer in dataset.layers() {
        let _ = writeln!(
            out,
            "Layer {} ({}): {}, {} channel(s)",
            layer.name(),
            layer.category(),
            layer.voxel_type(),
            layer.num_channels()
        );
        if let Some(layer_properties) = properties.layer(layer.name()) {
            let bbox = &layer_properties.bounding_box;
            if bbox.is_empty() {
                let _ = writeln!(out, "  Bounding box: empty");
            } else {
                let [x, y, z] = bbox.offset();
                let [w, h, d] = bbox.size();
                let _ = writeln!(out, "  Bounding box: ({x}, {y}, {z}) size {w} x {h} x {d}");
            }
        }
        let mags = layer
            .mags()
            .map(|m| m.mag().to_layer_name())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  Mags: {mags}");
    }
    out
}

/// Runs the selected subcommand
pub struct Runner {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl Runner {
    /// Create a runner; progress bars are shown unless `--quiet` is given
    pub fn new(cli: Cli) -> Self {
        let progress_manager = if cli.quiet {
            None
        } else {
            Some(ProgressManager::new())
        };
        Self {
            cli,
            progress_manager,
        }
    }

    /// Set up logging and execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails
    pub fn run(&mut self) -> Result<()> {
        setup_logging(self.cli.verbose, self.cli.quiet);

        match &self.cli.command {
            Command::Cube(args) => {
                let config = args.to_config();
                Self::cube(&config, self.progress_manager.as_mut())
            }
            Command::Info(args) => Self::info(args),
        }
    }

    fn cube(config: &TileCubingConfig, progress: Option<&mut ProgressManager>) -> Result<()> {
        let start = Instant::now();
        log::info!(
            "Cubing {} into {} (layer {}, {}, {} job(s))",
            config.source_path.display(),
            config.target_path.display(),
            config.layer_name,
            config.voxel_type,
            config.jobs
        );

        let summary = tile_cubing(config, progress)?;
        log::info!(
            "Wrote {} of {} tile stacks from {} files in {:.2}s",
            summary.tiles_written,
            summary.tiles_written + summary.tiles_skipped,
            summary.file_count,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    // Dataset overview goes to stdout
    #[allow(clippy::print_stdout)]
    fn info(args: &InfoArgs) -> Result<()> {
        let dataset = Dataset::open(&args.dataset_path)?;
        print!("{}", describe_dataset(&dataset));
        Ok(())
    }
}
