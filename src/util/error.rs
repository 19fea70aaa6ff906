//! Error types for detpost.

use crate::tensor::TensorType;
use thiserror::Error;

/// Result alias for detpost operations.
pub type DetPostResult<T> = std::result::Result<T, DetPostError>;

/// Errors that can occur when decoding model outputs or running NMS.
///
/// Decode and NMS entry points fail fast on validation errors and never
/// write partial output; the scratch arena and result store are left as
/// they were before the call.
#[derive(Debug, Error, PartialEq)]
pub enum DetPostError {
    /// Internal error without a more specific code.
    #[error("internal error: {0}")]
    Internal(&'static str),
    /// A required parameter was missing or invalid.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// A tensor's element type differs from what the operation requires.
    #[error("type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch {
        expected: TensorType,
        got: TensorType,
    },
    /// Two related tensors have incompatible shapes.
    #[error("shape mismatch: {context} (expected {expected:?}, got {got:?})")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A tensor's shape is invalid on its own for the given operation.
    #[error("invalid shape {shape:?}: {context}")]
    InvalidShape {
        context: &'static str,
        shape: Vec<usize>,
    },
    /// The requested axis does not exist for the tensor's rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },
    /// The tensor has no data.
    #[error("tensor has no data")]
    TensorNoData,
    /// The operation does not support the tensor's element type.
    #[error("unsupported tensor type {0:?}")]
    UnsupportedTensorType(TensorType),
    /// More input tensors were provided than the operation accepts.
    #[error("too many inputs: got {got}, at most {max}")]
    TooManyInputs { max: usize, got: usize },
    /// The quantization parameters attached to a tensor are invalid.
    #[error("invalid quantization parameters: {0}")]
    InvalidQuant(&'static str),
    /// Candidate storage in the scratch arena was exhausted.
    #[error("scratch capacity exhausted: needed {needed}, capacity {capacity}")]
    OutOfResources { needed: usize, capacity: usize },
}
