//! Row dispatcher: picks the execution path and tile geometry for a row width.

use crate::config::SoftmaxConfig;
use crate::error::{KernelError, Result};

/// Which per-row algorithm processes a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    /// The padded row fits in one tile.
    SingleTile,
    /// The row is reduced across several tiles.
    MultiTile,
}

/// Tile geometry and path for every row of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPlan {
    pub path: Path,
    /// Tile capacity in elements, a power of two.
    pub block_size: usize,
    /// Tiles per row. Always 1 on the single-tile path.
    pub n_tiles: usize,
    /// Parallelism hint: independent accumulators per reduction.
    pub lanes: usize,
}

impl LaunchPlan {
    pub fn single_tile(block_size: usize) -> Self {
        LaunchPlan {
            path: Path::SingleTile,
            block_size,
            n_tiles: 1,
            lanes: lanes_for(block_size),
        }
    }

    pub fn multi_tile(block_size: usize, n_tiles: usize) -> Self {
        LaunchPlan {
            path: Path::MultiTile,
            block_size,
            n_tiles,
            lanes: lanes_for(block_size),
        }
    }

    /// Number of columns the plan's tiles cover.
    pub fn capacity(&self) -> usize {
        self.block_size.saturating_mul(self.n_tiles)
    }

    /// Checks the plan against a row width and tile budget before launch.
    ///
    /// The tiles must cover the row, and every tile past the first must hold
    /// at least one column of it.
    pub fn validate(&self, n_cols: usize, max_block_size: usize) -> Result<()> {
        if !self.block_size.is_power_of_two() {
            return Err(KernelError::InvalidBlockSize(self.block_size));
        }
        if self.block_size > max_block_size {
            return Err(KernelError::BlockSizeTooLarge {
                block_size: self.block_size,
                max: max_block_size,
            });
        }
        if self.path == Path::SingleTile && self.n_tiles != 1 {
            return Err(KernelError::InvalidConfig(format!(
                "single-tile plan with {} tiles",
                self.n_tiles
            )));
        }
        if self.capacity() < n_cols {
            return Err(KernelError::TileCapacityExceeded {
                required: n_cols,
                capacity: self.capacity(),
            });
        }
        let needed = n_cols.div_ceil(self.block_size).max(1);
        if self.n_tiles > needed {
            return Err(KernelError::InvalidConfig(format!(
                "plan has {} tiles, a row of {} needs at most {}",
                self.n_tiles, n_cols, needed
            )));
        }
        Ok(())
    }
}

/// Parallelism hint as a step function of tile size.
///
/// Monotone: a larger tile never gets fewer lanes.
pub fn lanes_for(block_size: usize) -> usize {
    if block_size >= 8096 {
        32
    } else if block_size >= 4096 {
        16
    } else if block_size >= 2048 {
        8
    } else {
        4
    }
}

/// Choose the path and tile geometry for rows of `n_cols` elements.
///
/// Rows are padded to the next power of two. If that fits the tile budget and
/// stays under the large-row threshold, the row is one tile. Otherwise it is
/// split into power-of-two tiles of at most `padded / min_tiles` elements,
/// capped by the budget, with as many tiles as the true width needs.
pub fn plan_row(n_cols: usize, config: &SoftmaxConfig) -> LaunchPlan {
    let padded = n_cols.max(1).next_power_of_two();

    if padded < config.large_row_threshold && padded <= config.max_block_size {
        return LaunchPlan::single_tile(padded);
    }

    let per_tile = (padded / config.min_tiles.max(1)).max(1);
    let block_size = prev_power_of_two(per_tile).min(config.max_block_size);
    LaunchPlan::multi_tile(block_size, n_cols.div_ceil(block_size))
}

fn prev_power_of_two(x: usize) -> usize {
    debug_assert!(x > 0);
    1 << (usize::BITS - 1 - x.leading_zeros())
}
