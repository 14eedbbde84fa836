use fs_kernel::{LaunchPlan, MultiTileStrategy, Path, SoftmaxConfig};
use fs_tensor::DType;

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorUnsupportedDType = 2,
    ErrorInvalidConfig = 3,
    ErrorTileCapacity = 4,
    ErrorAlreadyInitialized = 5,
    ErrorInternal = 6,
}

/// Precision tag of a matrix buffer. Only `F32` is computed on.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsDType {
    F32 = 0,
    F16 = 1,
    BF16 = 2,
}

impl From<FsDType> for DType {
    fn from(dtype: FsDType) -> Self {
        match dtype {
            FsDType::F32 => DType::F32,
            FsDType::F16 => DType::F16,
            FsDType::BF16 => DType::BF16,
        }
    }
}

/// Reduction order for rows spanning several tiles.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsMultiTileStrategy {
    Streaming = 0,
    ThreePhase = 1,
}

impl From<FsMultiTileStrategy> for MultiTileStrategy {
    fn from(strategy: FsMultiTileStrategy) -> Self {
        match strategy {
            FsMultiTileStrategy::Streaming => MultiTileStrategy::Streaming,
            FsMultiTileStrategy::ThreePhase => MultiTileStrategy::ThreePhase,
        }
    }
}

impl From<MultiTileStrategy> for FsMultiTileStrategy {
    fn from(strategy: MultiTileStrategy) -> Self {
        match strategy {
            MultiTileStrategy::Streaming => FsMultiTileStrategy::Streaming,
            MultiTileStrategy::ThreePhase => FsMultiTileStrategy::ThreePhase,
        }
    }
}

/// Parameters controlling kernel launches.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FsSoftmaxParams {
    pub max_block_size: usize,
    pub large_row_threshold: usize,
    pub min_tiles: usize,
    pub multi_tile: FsMultiTileStrategy,
    pub parallel: bool,
}

impl Default for FsSoftmaxParams {
    fn default() -> Self {
        let config = SoftmaxConfig::default();
        Self {
            max_block_size: config.max_block_size,
            large_row_threshold: config.large_row_threshold,
            min_tiles: config.min_tiles,
            multi_tile: config.multi_tile.into(),
            parallel: config.parallel,
        }
    }
}

impl From<FsSoftmaxParams> for SoftmaxConfig {
    fn from(params: FsSoftmaxParams) -> Self {
        SoftmaxConfig {
            max_block_size: params.max_block_size,
            large_row_threshold: params.large_row_threshold,
            min_tiles: params.min_tiles,
            multi_tile: params.multi_tile.into(),
            parallel: params.parallel,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsPath {
    SingleTile = 0,
    MultiTile = 1,
}

/// The dispatcher's decision for one row width.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsLaunchPlan {
    pub path: FsPath,
    pub block_size: usize,
    pub n_tiles: usize,
    pub lanes: usize,
}

impl From<LaunchPlan> for FsLaunchPlan {
    fn from(plan: LaunchPlan) -> Self {
        Self {
            path: match plan.path {
                Path::SingleTile => FsPath::SingleTile,
                Path::MultiTile => FsPath::MultiTile,
            },
            block_size: plan.block_size,
            n_tiles: plan.n_tiles,
            lanes: plan.lanes,
        }
    }
}

/// Read-only matrix handle: row `i` starts at `data + i * row_stride`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FsMatrix {
    pub data: *const f32,
    pub rows: usize,
    pub cols: usize,
    pub row_stride: usize,
}

/// Writable matrix handle, allocated by the caller.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FsMatrixMut {
    pub data: *mut f32,
    pub rows: usize,
    pub cols: usize,
    pub row_stride: usize,
}
