use std::cell::RefCell;
use std::ffi::CString;

use fs_kernel::KernelError;
use fs_tensor::TensorError;

use crate::types::FsStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `fs_last_error`.
pub fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Status code reported for a kernel error.
pub fn status_for(err: &KernelError) -> FsStatus {
    match err {
        KernelError::InvalidConfig(_)
        | KernelError::InvalidBlockSize(_)
        | KernelError::BlockSizeTooLarge { .. } => FsStatus::ErrorInvalidConfig,
        KernelError::TileCapacityExceeded { .. } => FsStatus::ErrorTileCapacity,
        KernelError::Tensor(TensorError::UnsupportedDType(_)) => FsStatus::ErrorUnsupportedDType,
        KernelError::Tensor(_) => FsStatus::ErrorInvalidArgument,
    }
}

/// Record `err` as the last error and return its status code.
pub fn fail(err: KernelError) -> FsStatus {
    let status = status_for(&err);
    set_last_error(err.to_string());
    status
}
