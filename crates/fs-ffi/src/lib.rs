mod context;
mod error;
mod matrix;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::CString;
use std::os::raw::c_char;

use fs_kernel::{FusedSoftmax, KernelError, SoftmaxConfig};
use fs_tensor::DType;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Execute a closure that returns an `FsStatus`, catching any panics
/// and converting them into `FsStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> FsStatus + std::panic::UnwindSafe>(f: F) -> FsStatus {
    match std::panic::catch_unwind(f) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            FsStatus::ErrorInternal
        }
    }
}

/// Validate both handles, then run the kernel over them.
///
/// # Safety
/// `input` and `output` must describe buffers valid for their layouts.
unsafe fn forward_raw(
    kernel: &FusedSoftmax,
    input: &FsMatrix,
    output: &FsMatrixMut,
    dtype: FsDType,
) -> fs_kernel::Result<()> {
    DType::from(dtype).ensure_supported()?;

    let x = input.validate()?;
    let y = output.validate()?;
    if x.overlaps(&y) {
        return Err(KernelError::Tensor(fs_tensor::TensorError::Other(
            "input and output buffers overlap".to_string(),
        )));
    }

    let plan = kernel.forward_slices(x.as_slice(), &x.layout, y.as_mut_slice(), &y.layout)?;
    debug!(
        rows = x.layout.rows(),
        cols = x.layout.cols(),
        block_size = plan.block_size,
        n_tiles = plan.n_tiles,
        "ffi forward"
    );
    Ok(())
}

/// Default launch parameters.
#[no_mangle]
pub extern "C" fn fs_softmax_params_default() -> FsSoftmaxParams {
    FsSoftmaxParams::default()
}

/// Create a kernel handle.
///
/// A null `params` selects the defaults. On success, writes a heap-allocated
/// `FsKernel` pointer into `*kernel_out`; free it with `fs_kernel_destroy`.
#[no_mangle]
pub unsafe extern "C" fn fs_kernel_create(
    params: *const FsSoftmaxParams,
    kernel_out: *mut *mut FsKernel,
) -> FsStatus {
    catch_panic(|| {
        if kernel_out.is_null() {
            set_last_error("kernel_out is null".to_string());
            return FsStatus::ErrorInvalidArgument;
        }
        let config = if params.is_null() {
            SoftmaxConfig::default()
        } else {
            SoftmaxConfig::from(unsafe { *params })
        };
        match FsKernel::new(config) {
            Ok(kernel) => {
                unsafe {
                    *kernel_out = Box::into_raw(Box::new(kernel));
                }
                FsStatus::Ok
            }
            Err(e) => fail(e),
        }
    })
}

/// Destroy a kernel previously created by `fs_kernel_create`.
///
/// Passing a null pointer is a no-op and returns `FsStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn fs_kernel_destroy(kernel: *mut FsKernel) -> FsStatus {
    if kernel.is_null() {
        return FsStatus::Ok;
    }
    drop(Box::from_raw(kernel));
    FsStatus::Ok
}

/// Report the plan the kernel would use for rows of `n_cols` elements.
#[no_mangle]
pub unsafe extern "C" fn fs_kernel_plan_row(
    kernel: *const FsKernel,
    n_cols: usize,
    plan_out: *mut FsLaunchPlan,
) -> FsStatus {
    catch_panic(|| {
        if kernel.is_null() || plan_out.is_null() {
            set_last_error("null argument".to_string());
            return FsStatus::ErrorInvalidArgument;
        }
        let kernel = unsafe { &*kernel };
        let plan = kernel.kernel.plan(n_cols);
        unsafe {
            *plan_out = plan.into();
        }
        FsStatus::Ok
    })
}

/// Row-wise softmax of `input` into the caller-allocated `output`.
///
/// Both handles must describe the same shape and must not share memory.
/// Nothing is written to `output` unless the call returns `FsStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn fs_kernel_forward(
    kernel: *const FsKernel,
    input: *const FsMatrix,
    output: *const FsMatrixMut,
    dtype: FsDType,
) -> FsStatus {
    catch_panic(|| {
        if kernel.is_null() || input.is_null() || output.is_null() {
            set_last_error("null argument".to_string());
            return FsStatus::ErrorInvalidArgument;
        }
        let kernel = unsafe { &*kernel };
        match unsafe { forward_raw(&kernel.kernel, &*input, &*output, dtype) } {
            Ok(()) => FsStatus::Ok,
            Err(e) => fail(e),
        }
    })
}

/// One-shot softmax without a kernel handle. A null `params` selects the
/// defaults.
#[no_mangle]
pub unsafe extern "C" fn fs_softmax_forward(
    input: *const FsMatrix,
    output: *const FsMatrixMut,
    dtype: FsDType,
    params: *const FsSoftmaxParams,
) -> FsStatus {
    catch_panic(|| {
        if input.is_null() || output.is_null() {
            set_last_error("null argument".to_string());
            return FsStatus::ErrorInvalidArgument;
        }
        let config = if params.is_null() {
            SoftmaxConfig::default()
        } else {
            SoftmaxConfig::from(unsafe { *params })
        };
        let kernel = match FusedSoftmax::new(config) {
            Ok(k) => k,
            Err(e) => return fail(e),
        };
        match unsafe { forward_raw(&kernel, &*input, &*output, dtype) } {
            Ok(()) => FsStatus::Ok,
            Err(e) => fail(e),
        }
    })
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `ErrorAlreadyInitialized` if a global subscriber is already set.
#[no_mangle]
pub extern "C" fn fs_tracing_init() -> FsStatus {
    catch_panic(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        match tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
        {
            Ok(()) => FsStatus::Ok,
            Err(e) => {
                set_last_error(format!("tracing init failed: {}", e));
                FsStatus::ErrorAlreadyInitialized
            }
        }
    })
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error on this
/// thread, or null if there is none. Free it with `fs_free_string`.
#[no_mangle]
pub extern "C" fn fs_last_error() -> *mut c_char {
    match take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `fs_last_error`.
#[no_mangle]
pub unsafe extern "C" fn fs_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
