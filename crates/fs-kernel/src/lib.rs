//! `fs-kernel` - Fused, tiled row-wise softmax.
//!
//! Each row is softmaxed through a fixed-capacity tile buffer:
//! - rows that fit one tile take a single load and a single store
//! - wider rows are reduced across tiles with an online max/sum, reusing the
//!   buffered tile between passes so no row is read three times
//!
//! `FusedSoftmax` is the entry point and also implements
//! `fs_tensor::SoftmaxBackend`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod launch;
mod multi;
pub mod reduce;
mod single;
pub mod tile;

pub use config::{MultiTileStrategy, SoftmaxConfig};
pub use dispatch::{lanes_for, plan_row, LaunchPlan, Path};
pub use error::{KernelError, Result};
pub use launch::{run_row, FusedSoftmax};
pub use tile::{LoadCounter, LoadObserver, Tile, MASK_SENTINEL};
