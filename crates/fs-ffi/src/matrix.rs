use std::mem::align_of;

use fs_kernel::{KernelError, Result};
use fs_tensor::{DType, MatrixLayout, TensorError};

use crate::types::{FsMatrix, FsMatrixMut};

/// A matrix handle whose layout and address range have been checked.
/// Element width of every buffer crossing the boundary.
const ELEM_BYTES: usize = DType::F32.size_in_bytes();

pub(crate) struct RawMatrix {
    ptr: *const f32,
    len: usize,
    pub layout: MatrixLayout,
}

impl RawMatrix {
    fn new(ptr: *const f32, rows: usize, cols: usize, row_stride: usize) -> Result<Self> {
        let layout = MatrixLayout::new(rows, cols, row_stride)?;
        let len = layout.required_len();

        if len > isize::MAX as usize / ELEM_BYTES {
            return Err(invalid(format!("matrix {} is too large to address", layout)));
        }
        if len > 0 && ptr.is_null() {
            return Err(invalid("null data pointer".to_string()));
        }
        if len > 0 && (ptr as usize) % align_of::<f32>() != 0 {
            return Err(invalid("data pointer is not aligned for f32".to_string()));
        }

        Ok(RawMatrix { ptr, len, layout })
    }

    /// True if the two element ranges share any byte.
    pub fn overlaps(&self, other: &RawMatrix) -> bool {
        if self.len == 0 || other.len == 0 {
            return false;
        }
        let a = self.ptr as usize;
        let b = other.ptr as usize;
        let a_end = a + self.len * ELEM_BYTES;
        let b_end = b + other.len * ELEM_BYTES;
        a < b_end && b < a_end
    }

    /// # Safety
    /// The handle's buffer must be readable for `len` elements for `'a`.
    pub unsafe fn as_slice<'a>(&self) -> &'a [f32] {
        if self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.ptr, self.len)
    }

    /// # Safety
    /// The handle must come from an `FsMatrixMut` whose buffer is writable for
    /// `len` elements for `'a` and not aliased by any other live reference.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [f32] {
        if self.len == 0 {
            return Default::default();
        }
        std::slice::from_raw_parts_mut(self.ptr as *mut f32, self.len)
    }
}

impl FsMatrix {
    pub(crate) fn validate(&self) -> Result<RawMatrix> {
        RawMatrix::new(self.data, self.rows, self.cols, self.row_stride)
    }
}

impl FsMatrixMut {
    pub(crate) fn validate(&self) -> Result<RawMatrix> {
        RawMatrix::new(self.data as *const f32, self.rows, self.cols, self.row_stride)
    }
}

fn invalid(msg: String) -> KernelError {
    KernelError::Tensor(TensorError::Other(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(data: &[f32], rows: usize, cols: usize, row_stride: usize) -> FsMatrix {
        FsMatrix {
            data: data.as_ptr(),
            rows,
            cols,
            row_stride,
        }
    }

    #[test]
    fn test_null_pointer_rejected_unless_empty() {
        let null = FsMatrix {
            data: std::ptr::null(),
            rows: 2,
            cols: 3,
            row_stride: 3,
        };
        assert!(null.validate().is_err());

        let empty = FsMatrix { rows: 0, ..null };
        let raw = empty.validate().unwrap();
        assert!(unsafe { raw.as_slice() }.is_empty());
    }

    #[test]
    fn test_stride_smaller_than_cols_rejected() {
        let data = [0.0f32; 8];
        let err = handle(&data, 2, 4, 3).validate().err().unwrap();
        assert!(matches!(
            err,
            KernelError::Tensor(TensorError::StrideTooSmall { .. })
        ));
    }

    #[test]
    fn test_overlap_detection() {
        let data = [0.0f32; 16];
        let a = handle(&data[..8], 2, 4, 4).validate().unwrap();
        let b = handle(&data[8..], 2, 4, 4).validate().unwrap();
        let c = handle(&data[4..], 2, 4, 4).validate().unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_unaddressable_size_rejected() {
        let data = [0.0f32; 4];
        let huge = handle(&data, 1, isize::MAX as usize / ELEM_BYTES + 1, usize::MAX);
        let err = huge.validate().err().unwrap();
        assert!(matches!(err, KernelError::Tensor(TensorError::Other(_))));

        let largest = isize::MAX as usize / ELEM_BYTES;
        assert!(handle(&data, 1, largest, largest).validate().is_ok());
    }

    #[test]
    fn test_slice_covers_required_len() {
        let data = [1.0f32; 10];
        let raw = handle(&data, 2, 3, 7).validate().unwrap();
        assert_eq!(unsafe { raw.as_slice() }.len(), 10);
    }
}
