//! Error types for Latticework kernels

use thiserror::Error;

/// Result type alias using the kernel Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kernel operations
///
/// Numeric edge cases inside a kernel (zero distances, neighbours outside the
/// grid) are handled by guards and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Two operands of a pointwise operator have different dimensions
    #[error("Shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: [u32; 3], right: [u32; 3] },

    /// The field has no occupied voxels
    #[error("Field has no occupied voxels: {0}")]
    EmptyField(String),

    /// Primitive tag not recognised
    #[error("Unknown primitive type: {0}")]
    UnknownPrimitive(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
