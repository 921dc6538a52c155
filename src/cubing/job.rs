//! Cubing of one block-aligned z range

use crate::api::layer::MagStorage;
use crate::cubing::chunks::batches;
use crate::cubing::discovery::{TileInterval, find_file_with_dimensions};
use crate::cubing::pattern::InputPattern;
use crate::format::voxel::Element;
use crate::io::error::Result;
use crate::io::image::{TileShape, read_tile};
use crate::io::progress::ProgressManager;
use ndarray::{Array4, s};
use std::time::Instant;

/// Inputs shared by all cubing jobs of one run
#[derive(Debug, Clone)]
pub struct CubingContext {
    /// Full input path pattern
    pub pattern: InputPattern,
    /// Placeholder widths used for zero-padded file names
    pub digit_counts: [usize; 3],
    /// Tile coordinate range to cover
    pub interval: TileInterval,
    /// Shape every tile must have
    pub tile_shape: TileShape,
    /// Z slices read before each write
    pub batch_size: usize,
}

/// Outcome of one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Tile stacks written to the target
    pub tiles_written: usize,
    /// Tile stacks skipped because every voxel was zero
    pub tiles_skipped: usize,
}

impl JobStats {
    /// Sum of two job outcomes
    pub const fn merge(self, other: Self) -> Self {
        Self {
            tiles_written: self.tiles_written + other.tiles_written,
            tiles_skipped: self.tiles_skipped + other.tiles_skipped,
        }
    }
}

/// Cube the slices `z_slices` of every tile column into `target`
///
/// Missing tiles read as zeros; stacks without any non-zero voxel are not
/// written.
///
/// # Errors
///
/// Returns an error if a tile cannot be read or has the wrong shape, or
/// writing to the target fails
pub fn tile_cubing_job<T: Element>(
    context: &CubingContext,
    target: &MagStorage,
    job: usize,
    z_slices: &[u64],
    progress: Option<&ProgressManager>,
) -> Result<JobStats> {
    let mut stats = JobStats::default();
    if z_slices.is_empty() {
        return Ok(stats);
    }

    for z_batch in batches(z_slices, context.batch_size)? {
        let (Some(&first_z), Some(&last_z)) = (z_batch.first(), z_batch.last()) else {
            continue;
        };
        if let Some(pm) = progress {
            pm.start_batch(job, first_z, last_z);
        }

        let batch_stats = cube_batch::<T>(context, target, z_batch).inspect_err(|e| {
            log::error!("Cubing of z={first_z}-{last_z} failed with: {e}");
        })?;
        stats = stats.merge(batch_stats);

        if let Some(pm) = progress {
            pm.complete_batch(job, z_batch.len() as u64);
        }
    }

    if let Some(pm) = progress {
        pm.complete_job(job);
    }
    Ok(stats)
}

fn cube_batch<T: Element>(
    context: &CubingContext,
    target: &MagStorage,
    z_batch: &[u64],
) -> Result<JobStats> {
    let batch_start = Instant::now();
    let first_z = z_batch.first().copied().unwrap_or_default();
    let last_z = z_batch.last().copied().unwrap_or_default();
    log::info!("Cubing z={first_z}-{last_z}");

    let TileShape {
        width,
        height,
        channels,
    } = context.tile_shape;
    let interval = context.interval;
    let mut stats = JobStats::default();

    for x in interval.min[0]..=interval.max[0] {
        for y in interval.min[1]..=interval.max[1] {
            let tile_start = Instant::now();
            let mut buffer = Array4::<T>::zeros((channels, width, height, z_batch.len()));

            for (slot, &z) in z_batch.iter().enumerate() {
                let Some(file) = find_file_with_dimensions(&context.pattern, [x, y, z], context.digit_counts)
                else {
                    continue;
                };
                let tile = read_tile::<T>(&file, context.tile_shape)?;
                buffer
                    .slice_mut(s![.., .., .., slot])
                    .assign(&tile.view().permuted_axes([2, 0, 1]));
            }

            if buffer.iter().any(|v| *v != T::zero()) {
                target.write(
                    [x * width as u64, y * height as u64, first_z],
                    buffer.view(),
                )?;
                stats.tiles_written += 1;
            } else {
                stats.tiles_skipped += 1;
            }

            log::debug!(
                "Cubing of z={first_z}-{last_z} x={x} y={y} took {:.8}s",
                tile_start.elapsed().as_secs_f64()
            );
        }
    }

    log::debug!(
        "Cubing of z={first_z}-{last_z} took {:.8}s",
        batch_start.elapsed().as_secs_f64()
    );
    Ok(stats)
}
