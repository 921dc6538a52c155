//! On-disk voxel storage: the webKnossos-wrap (WKW) format and TIFF stacks

/// Reading and writing voxel data in a WKW dataset directory
pub mod dataset;
/// The 16-byte file header
pub mod header;
/// Z-order curve used for block placement inside files
pub mod morton;
/// Voxel storage as TIFF images per z slice
pub mod tiff;
/// Voxel element types
pub mod voxel;
