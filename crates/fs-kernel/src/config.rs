use crate::error::{KernelError, Result};

/// Default tile budget: the largest number of elements one tile may hold.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 64 * 1024;
/// Default padded row width at which rows switch to the multi-tile path.
pub const DEFAULT_LARGE_ROW_THRESHOLD: usize = 64 * 1024;
/// Default minimum number of tiles a large row is split into.
pub const DEFAULT_MIN_TILES: usize = 2;

/// How rows spanning several tiles are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiTileStrategy {
    /// Online max/sum in one forward pass, then a reverse output pass that
    /// reuses the last tile. Every tile is loaded at most twice for any count.
    #[default]
    Streaming,
    /// Separate max, sum and output phases, caching the boundary tile between
    /// phases. Used for rows of one or two tiles; wider rows fall back to
    /// `Streaming`, which keeps the two-load bound.
    ThreePhase,
}

/// Launch configuration for the fused softmax kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftmaxConfig {
    /// Tile budget in elements. Must be a power of two.
    pub max_block_size: usize,
    /// Padded row width at or above which the multi-tile path is used.
    pub large_row_threshold: usize,
    /// Minimum number of tiles a multi-tile row is split into.
    pub min_tiles: usize,
    /// Reduction order for multi-tile rows.
    pub multi_tile: MultiTileStrategy,
    /// Process rows on the rayon pool instead of the calling thread.
    pub parallel: bool,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            large_row_threshold: DEFAULT_LARGE_ROW_THRESHOLD,
            min_tiles: DEFAULT_MIN_TILES,
            multi_tile: MultiTileStrategy::default(),
            parallel: true,
        }
    }
}

impl SoftmaxConfig {
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn with_large_row_threshold(mut self, threshold: usize) -> Self {
        self.large_row_threshold = threshold;
        self
    }

    pub fn with_min_tiles(mut self, min_tiles: usize) -> Self {
        self.min_tiles = min_tiles;
        self
    }

    pub fn with_multi_tile(mut self, strategy: MultiTileStrategy) -> Self {
        self.multi_tile = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the configuration before it is used for any launch.
    pub fn validate(&self) -> Result<()> {
        if !self.max_block_size.is_power_of_two() {
            return Err(KernelError::InvalidBlockSize(self.max_block_size));
        }
        if self.large_row_threshold == 0 {
            return Err(KernelError::InvalidConfig(
                "large_row_threshold must be > 0".to_string(),
            ));
        }
        if self.min_tiles == 0 {
            return Err(KernelError::InvalidConfig(
                "min_tiles must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = SoftmaxConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_block_size, 65536);
        assert_eq!(cfg.multi_tile, MultiTileStrategy::Streaming);
        assert!(cfg.parallel);
    }

    #[test]
    fn test_builder() {
        let cfg = SoftmaxConfig::default()
            .with_max_block_size(256)
            .with_large_row_threshold(128)
            .with_min_tiles(4)
            .with_multi_tile(MultiTileStrategy::ThreePhase)
            .with_parallel(false);
        assert_eq!(cfg.max_block_size, 256);
        assert_eq!(cfg.large_row_threshold, 128);
        assert_eq!(cfg.min_tiles, 4);
        assert_eq!(cfg.multi_tile, MultiTileStrategy::ThreePhase);
        assert!(!cfg.parallel);
    }

    #[test]
    fn test_rejects_non_power_of_two_budget() {
        let cfg = SoftmaxConfig::default().with_max_block_size(1000);
        assert_eq!(cfg.validate(), Err(KernelError::InvalidBlockSize(1000)));
        let cfg = SoftmaxConfig::default().with_max_block_size(0);
        assert_eq!(cfg.validate(), Err(KernelError::InvalidBlockSize(0)));
    }

    #[test]
    fn test_rejects_zero_threshold_and_tiles() {
        let cfg = SoftmaxConfig::default().with_large_row_threshold(0);
        assert!(matches!(cfg.validate(), Err(KernelError::InvalidConfig(_))));
        let cfg = SoftmaxConfig::default().with_min_tiles(0);
        assert!(matches!(cfg.validate(), Err(KernelError::InvalidConfig(_))));
    }
}
