use fs_kernel::{FusedSoftmax, SoftmaxConfig};

/// Opaque handle owning a configured softmax kernel.
#[derive(Debug)]
pub struct FsKernel {
    pub kernel: FusedSoftmax,
}

impl FsKernel {
    pub fn new(config: SoftmaxConfig) -> fs_kernel::Result<Self> {
        Ok(Self {
            kernel: FusedSoftmax::new(config)?,
        })
    }
}
