//! Error types and context management for dataset and cubing operations

use crate::format::voxel::VoxelType;
use std::path::{Path, PathBuf};

/// Main error type for all cubing and dataset operations
#[derive(Debug, thiserror::Error)]
pub enum CubingError {
    /// General file system operation failure
    #[error("File system error during {operation} on '{}': {source}", path.display())]
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to decode a source tile image
    #[error("Failed to load image '{}': {source}", path.display())]
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to encode or write a TIFF slice
    #[error("Failed to save image '{}': {source}", path.display())]
    ImageSave {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image encoding error
        source: image::ImageError,
    },

    /// `datasource-properties.json` could not be parsed or serialized
    #[error("Invalid dataset properties '{}': {source}", path.display())]
    Properties {
        /// Path of the properties file
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// A WKW header or data file is malformed
    #[error("Invalid WKW file '{}': {reason}", path.display())]
    InvalidFormat {
        /// Offending file
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// The dataset uses a feature this implementation cannot read or write
    #[error("Unsupported: {feature}")]
    Unsupported {
        /// Name of the unsupported feature
        feature: String,
    },

    /// Parameter validation failed
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Data element type does not match the dataset voxel type
    #[error("Voxel type mismatch: dataset stores {expected}, got {found}")]
    VoxelTypeMismatch {
        /// Voxel type declared by the dataset
        expected: VoxelType,
        /// Voxel type of the supplied data
        found: VoxelType,
    },

    /// Dataset directory already exists
    #[error("Creation of dataset '{}' failed: path already exists", path.display())]
    DatasetExists {
        /// Dataset root
        path: PathBuf,
    },

    /// Requested layer is not part of the dataset
    #[error("The layer '{name}' is not a layer of this dataset")]
    LayerNotFound {
        /// Layer name
        name: String,
    },

    /// A layer with the same name already exists
    #[error("Adding layer '{name}' failed: there is already a layer with this name")]
    LayerExists {
        /// Layer name
        name: String,
    },

    /// Existing layer differs from the requested layer
    #[error("Cannot get or add layer '{name}': the layer already exists, but {reason}")]
    LayerMismatch {
        /// Layer name
        name: String,
        /// Which attribute differs
        reason: String,
    },

    /// Requested magnification is not part of the layer
    #[error("The magnification '{mag}' is not part of layer '{layer}'")]
    MagNotFound {
        /// Layer name
        layer: String,
        /// Magnification name
        mag: String,
    },

    /// Layer metadata lacks `num_channels` and no WKW header can supply it
    #[error(
        "The dataset does not have the attribute 'num_channels' for layer '{layer}' and '{}' \
         does not exist to read it from; add the attribute manually or re-create the layer",
        header.display()
    )]
    MissingChannelCount {
        /// Layer name
        layer: String,
        /// Header file that was looked up
        header: PathBuf,
    },

    /// Access outside the region of a view
    #[error("Access at offset {offset:?} with size {size:?} exceeds view bounds {bounds:?}")]
    OutOfBounds {
        /// Requested relative offset
        offset: [u64; 3],
        /// Requested size
        size: [usize; 3],
        /// Size of the view
        bounds: [usize; 3],
    },

    /// A source tile has a different shape than the reference tile
    #[error(
        "Tile '{}' has shape {found:?}, expected {expected:?} (width, height, channels)",
        path.display()
    )]
    TileShapeMismatch {
        /// Offending tile
        path: PathBuf,
        /// Shape of the reference tile
        expected: (usize, usize, usize),
        /// Shape of this tile
        found: (usize, usize, usize),
    },

    /// Input path pattern did not match any file
    #[error("No source files found, maybe the input path pattern was wrong: {pattern}")]
    NoSourceFiles {
        /// The full input pattern that was searched
        pattern: String,
    },
}

/// Convenience type alias for cubing results
pub type Result<T> = std::result::Result<T, CubingError>;

/// Attaches path and operation context to I/O results
pub trait WithPath<T> {
    /// Convert an I/O error into [`CubingError::FileSystem`]
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path and operation applied
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T> WithPath<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T> {
        self.map_err(|source| file_system(path, operation, source))
    }
}

impl From<std::io::Error> for CubingError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create a file system error
pub fn file_system(path: &Path, operation: &'static str, source: std::io::Error) -> CubingError {
    CubingError::FileSystem {
        path: path.to_path_buf(),
        operation,
        source,
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> CubingError {
    CubingError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a malformed WKW file error
pub fn format_error(path: &Path, reason: &impl ToString) -> CubingError {
    CubingError::InvalidFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
