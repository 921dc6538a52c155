//! Dataset abstraction over WKW: layers, magnifications and metadata

/// Datasets and their layer management
pub mod dataset;
/// Layers and per-magnification datasets
pub mod layer;
/// Power-of-two magnifications
pub mod mag;
/// `datasource-properties.json` model
pub mod properties;
/// Bounded windows into a magnification
pub mod view;
