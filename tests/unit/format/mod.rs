pub mod dataset;
pub mod tiff;
