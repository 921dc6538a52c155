//! Format constants and runtime configuration defaults

/// Version derived from the git tag state at build time
pub const VERSION: &str = env!("WKCUBER_VERSION");

// WKW geometry
/// Default block side length in voxels
pub const DEFAULT_BLOCK_LEN: usize = 32;
/// Default file side length in blocks
pub const DEFAULT_FILE_LEN: usize = 32;
/// Default side length of one WKW file in voxels
pub const DEFAULT_CUBE_LENGTH: u64 = (DEFAULT_BLOCK_LEN * DEFAULT_FILE_LEN) as u64;
/// Name of the per-dataset header file
pub const HEADER_FILE_NAME: &str = "header.wkw";
/// Extension of WKW data files
pub const DATA_FILE_EXTENSION: &str = "wkw";

// TIFF stacks
/// Default image name pattern of untiled TIFF datasets
pub const DEFAULT_TIFF_PATTERN: &str = "{z}.tif";
/// Default image name pattern of tiled TIFF datasets
pub const DEFAULT_TILED_TIFF_PATTERN: &str = "{z}/{y}/{x}.tif";

// Dataset metadata
/// Name of the dataset metadata file
pub const PROPERTIES_FILE_NAME: &str = "datasource-properties.json";
/// Indentation used when writing the metadata file
pub const PROPERTIES_INDENT: &[u8] = b"    ";

// Cubing defaults
/// Z slices per cubing job, aligned so jobs never share a block
pub const BLOCK_LEN: u64 = 32;
/// Default z slices read before each write
pub const DEFAULT_BATCH_SIZE: usize = 32;
/// Default input path pattern relative to the source path
pub const DEFAULT_INPUT_PATH_PATTERN: &str = "{zzzzzzzzzz}/{yyyyyyyyyy}/{xxxxxxxxxx}.jpg";
/// Default target layer name
pub const DEFAULT_LAYER_NAME: &str = "color";
/// Default target element class
pub const DEFAULT_DTYPE: &str = "uint8";
/// Default voxel scale in nanometers
pub const DEFAULT_SCALE: [f64; 3] = [1.0, 1.0, 1.0];

// Default bounding box of a layer that holds no data yet
/// Top left corner of an empty bounding box
pub const EMPTY_BOUNDING_BOX_TOP_LEFT: [i64; 3] = [-1, -1, -1];

// Progress bar display settings
/// Threshold for showing one progress bar per job
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
