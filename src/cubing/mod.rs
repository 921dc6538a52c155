//! Conversion of 2D image tiles into a cubed WKW layer

/// Block-aligned z chunks and IO batches
pub mod chunks;
/// File system scan for source tiles
pub mod discovery;
/// Orchestration of a full cubing run
pub mod executor;
/// Cubing of one z chunk
pub mod job;
/// Input path patterns with coordinate placeholders
pub mod pattern;
