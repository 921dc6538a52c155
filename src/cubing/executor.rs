//! Tile cubing run: discovery, job planning and parallel execution

use crate::api::dataset::Dataset;
use crate::api::layer::MagStorage;
use crate::api::mag::Mag;
use crate::api::properties::Category;
use crate::cubing::chunks::regular_chunks;
use crate::cubing::discovery::{TileInterval, detect_interval};
use crate::cubing::job::{CubingContext, JobStats, tile_cubing_job};
use crate::cubing::pattern::InputPattern;
use crate::format::voxel::VoxelType;
use crate::io::configuration::{
    BLOCK_LEN, DEFAULT_BATCH_SIZE, DEFAULT_INPUT_PATH_PATTERN, DEFAULT_LAYER_NAME, DEFAULT_SCALE,
};
use crate::io::error::{CubingError, Result, invalid_parameter};
use crate::io::image::{TileShape, read_tile_shape};
use crate::io::progress::ProgressManager;
use crate::with_element_type;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Parameters of one tile cubing run
#[derive(Debug, Clone, PartialEq)]
pub struct TileCubingConfig {
    /// Directory the input pattern is relative to
    pub source_path: PathBuf,
    /// Target dataset directory
    pub target_path: PathBuf,
    /// Layer to write into
    pub layer_name: String,
    /// Element type of the target layer
    pub voxel_type: VoxelType,
    /// Z slices buffered per write
    pub batch_size: usize,
    /// Tile file names relative to `source_path`
    pub input_path_pattern: String,
    /// Worker threads
    pub jobs: usize,
    /// Voxel size in nanometers, used when the target is created
    pub scale: [f64; 3],
}

impl TileCubingConfig {
    /// Configuration with default layer, dtype, batch size and pattern
    pub fn new(source_path: impl Into<PathBuf>, target_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: target_path.into(),
            layer_name: DEFAULT_LAYER_NAME.to_string(),
            voxel_type: VoxelType::U8,
            batch_size: DEFAULT_BATCH_SIZE,
            input_path_pattern: DEFAULT_INPUT_PATH_PATTERN.to_string(),
            jobs: 1,
            scale: DEFAULT_SCALE,
        }
    }

    fn full_pattern(&self) -> Result<InputPattern> {
        let root = self.source_path.to_string_lossy();
        let root = root.trim_end_matches('/');
        let relative = self.input_path_pattern.trim_start_matches('/');
        let joined = if root.is_empty() {
            relative.to_string()
        } else {
            format!("{root}/{relative}")
        };
        InputPattern::parse(&joined)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(invalid_parameter("batch_size", &self.batch_size, &"must be positive"));
        }
        if self.jobs == 0 {
            return Err(invalid_parameter("jobs", &self.jobs, &"must be positive"));
        }
        if self.layer_name.is_empty() {
            return Err(invalid_parameter("layer_name", &"", &"must not be empty"));
        }
        Ok(())
    }
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubingSummary {
    /// Source files found
    pub file_count: usize,
    /// Shape of every tile
    pub tile_shape: TileShape,
    /// Tile coordinate range covered
    pub interval: TileInterval,
    /// Tile stacks written
    pub tiles_written: usize,
    /// Tile stacks skipped as all zero
    pub tiles_skipped: usize,
}

/// Convert a directory of 2D tiles into the `1` magnification of a WKW layer
///
/// The z range is split into block-aligned chunks processed in parallel on
/// `config.jobs` threads. Afterwards the layer's bounding box is set to the
/// full tile grid.
///
/// # Errors
///
/// Returns an error if no source file matches, a tile is unreadable or has a
/// different shape, or the target dataset cannot be written
pub fn tile_cubing(config: &TileCubingConfig, progress: Option<&mut ProgressManager>) -> Result<CubingSummary> {
    config.validate()?;
    let start = Instant::now();
    let pattern = config.full_pattern()?;

    let Some(discovered) = detect_interval(&pattern)? else {
        log::error!("No source files found matching {}", pattern.as_str());
        return Err(CubingError::NoSourceFiles {
            pattern: pattern.as_str().to_string(),
        });
    };
    let interval = discovered.interval;
    log::info!(
        "Found source files {} in x={}-{} y={}-{} z={}-{}",
        discovered.file_count,
        interval.min[0],
        interval.max[0],
        interval.min[1],
        interval.max[1],
        interval.min[2],
        interval.max[2]
    );

    let tile_shape = read_tile_shape(&discovered.arbitrary_file)?;
    log::info!(
        "Found source files with shape {}x{} and {} channel(s)",
        tile_shape.width,
        tile_shape.height,
        tile_shape.channels
    );

    let mut dataset = Dataset::open_or_create(&config.target_path, config.scale)?;
    dataset.get_or_add_layer(
        &config.layer_name,
        Category::Color,
        config.voxel_type,
        tile_shape.channels,
    )?;
    let target: MagStorage = dataset
        .get_or_add_mag(&config.layer_name, Mag::ONE)?
        .storage()
        .clone();

    let context = CubingContext {
        digit_counts: pattern.digit_counts(),
        pattern,
        interval,
        tile_shape,
        batch_size: config.batch_size,
    };

    let job_slices: Vec<Vec<u64>> = regular_chunks(interval.min[2], interval.max[2], BLOCK_LEN)?
        .into_iter()
        .map(Iterator::collect)
        .collect();

    let progress: Option<&ProgressManager> = match progress {
        Some(pm) => {
            let sizes: Vec<u64> = job_slices.iter().map(|slices| slices.len() as u64).collect();
            pm.initialize(interval.extent()[2], &sizes);
            Some(&*pm)
        }
        None => None,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .map_err(|e| invalid_parameter("jobs", &config.jobs, &e))?;

    let voxel_type = config.voxel_type;
    let stats = pool.install(|| {
        job_slices
            .par_iter()
            .enumerate()
            .map(|(job, slices)| {
                with_element_type!(voxel_type, T => tile_cubing_job::<T>(
                    &context, &target, job, slices, progress
                ))
            })
            .collect::<Result<Vec<JobStats>>>()
    });

    if let Some(pm) = progress {
        pm.finish();
    }
    let stats = stats?.into_iter().fold(JobStats::default(), JobStats::merge);

    let [extent_x, extent_y, extent_z] = interval.extent();
    let size = [
        extent_x * tile_shape.width as u64,
        extent_y * tile_shape.height as u64,
        extent_z,
    ];
    let top_left = [
        signed(interval.min[0] * tile_shape.width as u64)?,
        signed(interval.min[1] * tile_shape.height as u64)?,
        signed(interval.min[2])?,
    ];
    dataset.set_bounding_box(&config.layer_name, top_left, size)?;

    log::info!(
        "Cubed {} of {} tile stacks in {:.3}s",
        stats.tiles_written,
        stats.tiles_written + stats.tiles_skipped,
        start.elapsed().as_secs_f64()
    );

    Ok(CubingSummary {
        file_count: discovered.file_count,
        tile_shape,
        interval,
        tiles_written: stats.tiles_written,
        tiles_skipped: stats.tiles_skipped,
    })
}

fn signed(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|err| invalid_parameter("bounding_box", &value, &err))
}
