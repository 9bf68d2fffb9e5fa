//! Error types for the fabrication pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the pipeline's error type
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither the model nor the support structure was requested
    #[error("You need at least the model or the support structure")]
    NoTarget,

    /// Primitive tag not recognised
    #[error("Primitive type '{0}' has not been implemented")]
    UnknownPrimitive(String),

    /// No file name and no primitive tag
    #[error("Provide either a file name or a primitive type")]
    NoSource,

    /// Named input file does not exist
    #[error("Input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kernel failure (shape mismatch, empty field)
    #[error("Kernel error: {0}")]
    Kernel(#[from] latticework_core::Error),

    /// Input file could not be voxelized
    #[error("Voxelization failed: {0}")]
    Voxelize(String),

    /// Lattice synthesis failed
    #[error("Lattice synthesis failed: {0}")]
    Synthesis(String),

    /// Mesh export failed
    #[error("Export failed: {0}")]
    Export(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PipelineError {
    /// Whether this error was raised by configuration checks, before any
    /// kernel work
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::NoTarget
                | PipelineError::UnknownPrimitive(_)
                | PipelineError::NoSource
                | PipelineError::SourceNotFound(_)
                | PipelineError::InvalidConfig(_)
        )
    }
}
