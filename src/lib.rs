//! Cubing of 2D image tile stacks into webKnossos-wrap (WKW) datasets
//!
//! Tiles named by an input path pattern such as `{zzzz}/{yyyy}/{xxxx}.png` are
//! stacked along z and written into the finest magnification of a dataset
//! layer. The dataset keeps its metadata in `datasource-properties.json` and
//! stores voxels as WKW files, or as TIFF images per z slice.

/// Dataset, layer and magnification management
pub mod api;
/// Tile discovery and the parallel cubing pipeline
pub mod cubing;
/// WKW and TIFF voxel storage
pub mod format;
/// Input/output operations, configuration and error handling
pub mod io;

pub use io::error::{CubingError, Result};
