use crate::backend::{check_operands, SoftmaxBackend};
use crate::error::Result;
use crate::layout::MatrixLayout;

/// Unfused reference softmax.
///
/// Makes three full passes over every row (max, exp + sum, normalize) with
/// straightforward loops. Kept as the ground truth that tiled kernels are
/// compared against, not as a fast path.
#[derive(Debug, Clone)]
pub struct ReferenceBackend;

impl ReferenceBackend {
    pub fn new() -> Self {
        ReferenceBackend
    }
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftmaxBackend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn softmax_into(
        &self,
        x: &[f32],
        x_layout: &MatrixLayout,
        y: &mut [f32],
        y_layout: &MatrixLayout,
    ) -> Result<()> {
        check_operands(x, x_layout, y, y_layout)?;

        for row in 0..x_layout.rows() {
            let src = &x[x_layout.row_range(row)];
            let dst = &mut y[y_layout.row_range(row)];
            softmax_row(src, dst);
        }

        Ok(())
    }
}

/// Three-pass softmax of one row. A row with no finite maximum (empty or
/// all `-inf`) is written as zeros.
pub fn softmax_row(src: &[f32], dst: &mut [f32]) {
    debug_assert_eq!(src.len(), dst.len());

    // Find max for numerical stability
    let max_val = src.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max_val == f32::NEG_INFINITY {
        dst.fill(0.0);
        return;
    }

    // Compute exp(x - max) and sum
    let mut sum = 0.0f32;
    for (d, &s) in dst.iter_mut().zip(src) {
        let e = (s - max_val).exp();
        *d = e;
        sum += e;
    }

    // Normalize
    for d in dst.iter_mut() {
        *d /= sum;
    }
}
