//! Input/output operations, configuration and error handling

/// Command-line interface
pub mod cli;
/// Compile-time configuration constants
pub mod configuration;
/// Crate error type
pub mod error;
/// Decoding of 2D source tiles
pub mod image;
/// Logger setup
pub mod logging;
/// Progress bars for cubing runs
pub mod progress;
