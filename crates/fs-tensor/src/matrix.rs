use crate::backend::SoftmaxBackend;
use crate::dtype::DType;
use crate::error::Result;
use crate::layout::MatrixLayout;

/// A row-major f32 matrix with an explicit row stride.
///
/// The backing buffer may be longer than `rows * cols`: bytes between the end
/// of a row and the start of the next are padding and are never read or
/// written by softmax backends.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    layout: MatrixLayout,
}

impl Matrix {
    /// Create a densely packed matrix from row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "data length {} does not match shape [{}, {}]",
            data.len(),
            rows,
            cols
        );
        Matrix {
            data,
            layout: MatrixLayout::contiguous(rows, cols),
        }
    }

    /// Wrap an existing buffer described by `layout`.
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if `data` cannot hold the layout.
    pub fn from_strided(data: Vec<f32>, layout: MatrixLayout) -> Result<Self> {
        layout.check_buffer(data.len())?;
        Ok(Matrix { data, layout })
    }

    /// Create a zero-filled, densely packed matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            layout: MatrixLayout::contiguous(rows, cols),
        }
    }

    /// Create a matrix of `value` with the given layout, padding included.
    pub fn filled(layout: MatrixLayout, value: f32) -> Self {
        Matrix {
            data: vec![value; layout.required_len()],
            layout,
        }
    }

    /// Zero-filled matrix with the same layout (stride included) as `self`.
    pub fn zeros_like(&self) -> Self {
        Matrix::filled(self.layout, 0.0)
    }

    pub fn layout(&self) -> &MatrixLayout {
        &self.layout
    }

    pub fn rows(&self) -> usize {
        self.layout.rows()
    }

    pub fn cols(&self) -> usize {
        self.layout.cols()
    }

    /// Always `DType::F32`; the tag exists for symmetry with raw handles.
    pub fn dtype(&self) -> DType {
        DType::F32
    }

    /// The full backing buffer, stride padding included.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// The `cols` logical elements of row `i`.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[self.layout.row_range(i)]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        let range = self.layout.row_range(i);
        &mut self.data[range]
    }

    /// Iterate over the logical rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.rows()).map(move |i| self.row(i))
    }

    /// Copy the logical elements into a densely packed row-major vector.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.layout.numel());
        for row in self.iter_rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Row-wise softmax using the given backend.
    pub fn softmax(&self, backend: &dyn SoftmaxBackend) -> Result<Matrix> {
        backend.softmax(self)
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::ReferenceBackend;
    use crate::error::TensorError;

    #[test]
    fn test_new_matrix() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.dtype(), DType::F32);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic]
    fn test_new_shape_mismatch_panics() {
        let _m = Matrix::new(vec![1.0, 2.0], 1, 3);
    }

    #[test]
    fn test_strided_rows_skip_padding() {
        let layout = MatrixLayout::new(2, 2, 4).unwrap();
        let m = Matrix::from_strided(vec![1.0, 2.0, 99.0, 99.0, 3.0, 4.0], layout).unwrap();
        assert_eq!(m.row(0), &[1.0, 2.0]);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.to_dense(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_from_strided_short_buffer() {
        let layout = MatrixLayout::new(2, 2, 4).unwrap();
        let err = Matrix::from_strided(vec![0.0; 5], layout).unwrap_err();
        assert_eq!(
            err,
            TensorError::BufferTooSmall {
                len: 5,
                required: 6
            }
        );
    }

    #[test]
    fn test_zeros_like_keeps_stride() {
        let layout = MatrixLayout::new(3, 2, 5).unwrap();
        let m = Matrix::filled(layout, 7.0);
        let z = m.zeros_like();
        assert_eq!(z.layout(), &layout);
        assert_eq!(z.as_slice().len(), 12);
        assert!(z.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_row_mut() {
        let mut m = Matrix::zeros(2, 2);
        m.row_mut(1)[0] = 5.0;
        assert_eq!(m.to_dense(), vec![0.0, 0.0, 5.0, 0.0]);
    }

    #[test]
    fn test_softmax_dispatch() {
        let m = Matrix::new(vec![0.0, 0.0, 1.0, 1.0], 2, 2);
        let y = m.softmax(&ReferenceBackend::new()).unwrap();
        assert_eq!(y.to_dense(), vec![0.5, 0.5, 0.5, 0.5]);
    }
}
