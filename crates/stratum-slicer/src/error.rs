//! Error types for the slicer.

use thiserror::Error;

/// Errors that can occur while generating toolpaths.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Invalid options.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
