//! Error types for s3fd post-processing.

use thiserror::Error;

/// Result alias for s3fd operations.
pub type S3fdResult<T> = std::result::Result<T, S3fdError>;

/// Errors that can occur while decoding network outputs.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum S3fdError {
    /// A tensor does not have the shape the decoder expects.
    #[error("invalid input shape for {context}: {reason} (got {shape:?})")]
    InvalidInputShape {
        context: &'static str,
        reason: &'static str,
        shape: Vec<usize>,
    },
    /// The backing buffer length does not match the declared shape.
    #[error("buffer length mismatch: expected {expected} elements, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// A NaN or infinite value was found in an input tensor.
    #[error("non-finite value in {context} at flat index {index}")]
    NonFiniteValue { context: &'static str, index: usize },
    /// The detector received the wrong number of scales.
    #[error("expected {expected} scales, got {got}")]
    ScaleCountMismatch { expected: usize, got: usize },
    /// The batch dimension differs between tensors.
    #[error("batch size mismatch at scale {scale}: expected {expected}, got {got}")]
    BatchMismatch {
        scale: usize,
        expected: usize,
        got: usize,
    },
    /// Decoding produced a box with non-finite or inverted coordinates.
    #[error("degenerate box decoded at scale {scale} (row {row}, col {col})")]
    DegenerateBox { scale: usize, row: usize, col: usize },
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// An index was outside the valid range.
    #[error("index {index} out of bounds for {context} (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// Image decoding or file access failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
