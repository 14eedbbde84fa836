use std::fmt;
use std::ops::Range;

use crate::error::{Result, TensorError};

/// Shape and row stride of a row-major matrix.
///
/// The stride is explicit rather than inferred: row `i` starts at element
/// `i * row_stride`, and only its first `cols` elements belong to the matrix.
/// Anything between `cols` and `row_stride` is padding owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixLayout {
    rows: usize,
    cols: usize,
    row_stride: usize,
}

impl MatrixLayout {
    /// Create a layout with an explicit row stride.
    ///
    /// # Errors
    /// Returns `StrideTooSmall` if `row_stride < cols`, since rows would overlap.
    pub fn new(rows: usize, cols: usize, row_stride: usize) -> Result<Self> {
        if row_stride < cols {
            return Err(TensorError::StrideTooSmall { row_stride, cols });
        }
        Ok(MatrixLayout {
            rows,
            cols,
            row_stride,
        })
    }

    /// Create a densely packed layout (`row_stride == cols`).
    pub fn contiguous(rows: usize, cols: usize) -> Self {
        MatrixLayout {
            rows,
            cols,
            row_stride: cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Returns `[rows, cols]`.
    pub fn dims(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Number of logical elements (rows * cols), excluding stride padding.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_contiguous(&self) -> bool {
        self.row_stride == self.cols
    }

    /// Minimum buffer length able to hold this layout.
    ///
    /// The last row does not need its trailing padding, so this is
    /// `(rows - 1) * row_stride + cols`. Saturates instead of overflowing so
    /// that absurd layouts fail `check_buffer` rather than wrap.
    pub fn required_len(&self) -> usize {
        if self.rows == 0 {
            return 0;
        }
        (self.rows - 1)
            .saturating_mul(self.row_stride)
            .saturating_add(self.cols)
    }

    /// Element range of row `i` within the backing buffer.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row_range(&self, i: usize) -> Range<usize> {
        assert!(i < self.rows, "row {} out of range for {} rows", i, self.rows);
        let start = i * self.row_stride;
        start..start + self.cols
    }

    /// Checks that a buffer of `len` elements can back this layout.
    pub fn check_buffer(&self, len: usize) -> Result<()> {
        let required = self.required_len();
        if len < required {
            return Err(TensorError::BufferTooSmall { len, required });
        }
        Ok(())
    }

    /// Checks that `other` has the same logical shape. Strides may differ.
    pub fn ensure_same_shape(&self, other: &MatrixLayout) -> Result<()> {
        if self.dims() != other.dims() {
            return Err(TensorError::ShapeMismatch {
                expected: self.dims(),
                got: other.dims(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MatrixLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)?;
        if !self.is_contiguous() {
            write!(f, " (stride {})", self.row_stride)?;
        }
        Ok(())
    }
}
