use thiserror::Error;

use crate::dtype::DType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: [usize; 2],
        got: [usize; 2],
    },
    #[error("row stride {row_stride} is smaller than column count {cols}")]
    StrideTooSmall { row_stride: usize, cols: usize },
    #[error("buffer of {len} elements cannot hold layout requiring {required}")]
    BufferTooSmall { len: usize, required: usize },
    #[error("unsupported dtype: {0}")]
    UnsupportedDType(DType),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
