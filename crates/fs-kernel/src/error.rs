use fs_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("block size {0} is not a power of two")]
    InvalidBlockSize(usize),
    #[error("block size {block_size} exceeds the tile budget of {max}")]
    BlockSizeTooLarge { block_size: usize, max: usize },
    #[error("tile capacity exceeded: row has {required} columns but the plan covers {capacity}")]
    TileCapacityExceeded { required: usize, capacity: usize },
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

pub type Result<T> = std::result::Result<T, KernelError>;
