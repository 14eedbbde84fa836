use std::fmt::Debug;

use crate::error::Result;
use crate::layout::MatrixLayout;
use crate::matrix::Matrix;

/// Trait for pluggable row-wise softmax implementations.
///
/// Backends read `x` and write `y` through explicit layouts, so strided
/// buffers and caller-owned outputs work without copies. Only the logical
/// elements of each output row are written; stride padding is left as-is.
pub trait SoftmaxBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "reference", "fused").
    fn name(&self) -> &str;

    /// Row-wise softmax of `x` into `y`.
    ///
    /// For each row: y[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
    ///
    /// - `x`, `x_layout`: input buffer and its shape/stride
    /// - `y`, `y_layout`: output buffer, same shape as `x`, any valid stride
    fn softmax_into(
        &self,
        x: &[f32],
        x_layout: &MatrixLayout,
        y: &mut [f32],
        y_layout: &MatrixLayout,
    ) -> Result<()>;

    /// Row-wise softmax into a freshly allocated matrix with `x`'s layout.
    fn softmax(&self, x: &Matrix) -> Result<Matrix> {
        x.dtype().ensure_supported()?;
        let mut y = x.zeros_like();
        let y_layout = *y.layout();
        self.softmax_into(x.as_slice(), x.layout(), y.as_mut_slice(), &y_layout)?;
        Ok(y)
    }
}

/// Validates an input/output pair before any row is touched.
pub fn check_operands(
    x: &[f32],
    x_layout: &MatrixLayout,
    y: &[f32],
    y_layout: &MatrixLayout,
) -> Result<()> {
    x_layout.ensure_same_shape(y_layout)?;
    x_layout.check_buffer(x.len())?;
    y_layout.check_buffer(y.len())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TensorError;

    #[test]
    fn test_check_operands_shape() {
        let x = MatrixLayout::contiguous(2, 3);
        let y = MatrixLayout::contiguous(3, 2);
        let err = check_operands(&[0.0; 6], &x, &[0.0; 6], &y).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_check_operands_short_output() {
        let x = MatrixLayout::contiguous(2, 3);
        let y = MatrixLayout::new(2, 3, 4).unwrap();
        assert!(check_operands(&[0.0; 6], &x, &[0.0; 7], &y).is_ok());
        assert!(check_operands(&[0.0; 6], &x, &[0.0; 6], &y).is_err());
    }
}
