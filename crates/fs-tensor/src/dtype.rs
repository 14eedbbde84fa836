use std::fmt;

use crate::error::{Result, TensorError};

/// Precision tag carried alongside a matrix handle.
///
/// Only `F32` is computed on. The half-precision tags exist so callers can
/// describe their buffers and get a clean rejection instead of garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point.
    F32,
    /// 16-bit IEEE 754 half precision.
    F16,
    /// 16-bit brain floating point.
    BF16,
}

impl DType {
    /// Returns the size in bytes of a single element.
    pub const fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 | DType::BF16 => 2,
        }
    }

    /// Returns true if softmax kernels accept data of this precision.
    pub fn is_supported(&self) -> bool {
        matches!(self, DType::F32)
    }

    /// Rejects precisions the kernels do not compute on.
    pub fn ensure_supported(self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(TensorError::UnsupportedDType(self))
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
            DType::BF16 => write!(f, "bf16"),
        }
    }
}
