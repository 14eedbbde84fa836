//! `fs-tensor` - Strided matrices and the softmax backend seam for fused-softmax.
//!
//! This crate provides:
//! - A `Matrix` type owning row-major f32 data with an explicit row stride
//! - `MatrixLayout`, the shape/stride description shared with raw buffers
//! - A `SoftmaxBackend` trait for pluggable row-wise softmax implementations
//! - A reference `ReferenceBackend` that runs the unfused three-pass softmax
//! - The `DType` precision tag (only F32 is computed on)

pub mod backend;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod matrix;

// Re-export primary types at the crate root for convenience.
pub use backend::SoftmaxBackend;
pub use cpu::ReferenceBackend;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use layout::MatrixLayout;
pub use matrix::Matrix;
