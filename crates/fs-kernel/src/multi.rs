//! Multi-tile path: rows too wide for one tile.
//!
//! Both strategies keep the most recently loaded tile in the buffer between
//! phases and start the next phase from it, so that tile is not read again.

use crate::config::MultiTileStrategy;
use crate::reduce;
use crate::tile::{LoadObserver, Tile};

/// Running maximum and sum of `exp(x - max)` across tiles.
///
/// When a tile raises the maximum, the sum accumulated so far is rescaled by
/// `exp(old_max - new_max)` before the tile's own contribution is added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStats {
    pub max: f32,
    pub sum: f32,
}

impl RunningStats {
    pub fn new() -> Self {
        RunningStats {
            max: f32::NEG_INFINITY,
            sum: 0.0,
        }
    }

    /// Fold one tile's values into the running max and sum.
    pub fn absorb(&mut self, values: &[f32], lanes: usize) {
        let new_max = self.max.max(reduce::max(values, lanes));
        if new_max == f32::NEG_INFINITY {
            // nothing finite seen yet
            return;
        }
        let rescale = (self.max - new_max).exp();
        self.sum = self.sum * rescale + reduce::sum_exp(values, new_max, lanes);
        self.max = new_max;
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Softmax of one row spanning `n_tiles` tiles of `tile.block_size()`.
///
/// `ThreePhase` applies only up to two tiles. Wider rows take the streaming
/// order so that no tile is loaded more than twice.
pub fn softmax_row<O: LoadObserver>(
    src: &[f32],
    dst: &mut [f32],
    tile: &mut Tile,
    n_tiles: usize,
    lanes: usize,
    strategy: MultiTileStrategy,
    observer: &mut O,
) {
    debug_assert!(tile.block_size().saturating_mul(n_tiles) >= src.len());
    debug_assert_eq!(src.len(), dst.len());

    match strategy {
        MultiTileStrategy::Streaming => streaming_row(src, dst, tile, n_tiles, lanes, observer),
        MultiTileStrategy::ThreePhase if n_tiles <= 2 => {
            three_phase_row(src, dst, tile, n_tiles, lanes, observer)
        }
        MultiTileStrategy::ThreePhase => streaming_row(src, dst, tile, n_tiles, lanes, observer),
    }
}

/// Online reduction in one forward pass, then output in reverse tile order.
///
/// The output pass starts from the last tile, which is still in the buffer,
/// so the last tile is loaded once and every other tile twice.
pub fn streaming_row<O: LoadObserver>(
    src: &[f32],
    dst: &mut [f32],
    tile: &mut Tile,
    n_tiles: usize,
    lanes: usize,
    observer: &mut O,
) {
    if n_tiles == 0 {
        return;
    }

    let mut stats = RunningStats::new();
    for index in 0..n_tiles {
        tile.load(src, index, observer);
        stats.absorb(tile.values(), lanes);
    }

    let shift = reduce::stable_shift(stats.max);
    emit(tile, dst, shift, stats.sum, observer);

    for index in (0..n_tiles - 1).rev() {
        tile.load(src, index, observer);
        emit(tile, dst, shift, stats.sum, observer);
    }
}

/// Separate max, sum and output phases.
///
/// - max: tiles `0..K`, leaving tile `K-1` in the buffer
/// - sum: tile `K-1` from the buffer, then tiles `K-2..=0`, leaving tile 0
/// - output: tile 0 from the buffer, then tiles `1..K`
///
/// That is `3K - 2` loads, at most two per tile while `K <= 2`. Interior tiles
/// of wider rows would be read three times, so `softmax_row` never routes
/// those here.
pub fn three_phase_row<O: LoadObserver>(
    src: &[f32],
    dst: &mut [f32],
    tile: &mut Tile,
    n_tiles: usize,
    lanes: usize,
    observer: &mut O,
) {
    if n_tiles == 0 {
        return;
    }

    let mut max = f32::NEG_INFINITY;
    for index in 0..n_tiles {
        tile.load(src, index, observer);
        max = max.max(reduce::max(tile.values(), lanes));
    }
    let shift = reduce::stable_shift(max);

    let mut sum = reduce::sum_exp(tile.values(), shift, lanes);
    for index in (0..n_tiles - 1).rev() {
        tile.load(src, index, observer);
        sum += reduce::sum_exp(tile.values(), shift, lanes);
    }

    emit(tile, dst, shift, sum, observer);
    for index in 1..n_tiles {
        tile.load(src, index, observer);
        emit(tile, dst, shift, sum, observer);
    }
}

fn emit<O: LoadObserver>(tile: &mut Tile, dst: &mut [f32], shift: f32, sum: f32, observer: &mut O) {
    reduce::exp_shift_in_place(tile.values_mut(), shift);
    reduce::normalize_in_place(tile.values_mut(), sum);
    tile.store(dst, observer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::LoadCounter;
    use approx::assert_relative_eq;
    use fs_tensor::cpu::softmax_row as reference_row;

    const STRATEGIES: [MultiTileStrategy; 2] =
        [MultiTileStrategy::Streaming, MultiTileStrategy::ThreePhase];

    fn wavy_row(n: usize) -> Vec<f32> {
        (0..n).map(|i| ((i * 7919) % 113) as f32 * 0.05 - 2.0).collect()
    }

    fn run(src: &[f32], block: usize, n_tiles: usize, strategy: MultiTileStrategy) -> (Vec<f32>, LoadCounter) {
        let mut dst = vec![0.0; src.len()];
        let mut tile = Tile::new(block);
        let mut counter = LoadCounter::new();
        softmax_row(src, &mut dst, &mut tile, n_tiles, 4, strategy, &mut counter);
        (dst, counter)
    }

    fn assert_matches_reference(src: &[f32], out: &[f32]) {
        let mut expected = vec![0.0; src.len()];
        reference_row(src, &mut expected);
        for (a, e) in out.iter().zip(&expected) {
            assert_relative_eq!(a, e, epsilon = 1e-9, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_running_stats_rescales_on_new_max() {
        let mut stats = RunningStats::new();
        stats.absorb(&[0.0, 0.0], 2);
        assert_eq!(stats.max, 0.0);
        assert_eq!(stats.sum, 2.0);

        stats.absorb(&[1.0, f32::NEG_INFINITY], 2);
        assert_eq!(stats.max, 1.0);
        let expected = 2.0 * (-1.0f32).exp() + 1.0;
        assert_relative_eq!(stats.sum, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_running_stats_skips_fully_masked_tiles() {
        let mut stats = RunningStats::new();
        stats.absorb(&[f32::NEG_INFINITY; 4], 4);
        assert_eq!(stats, RunningStats::new());
        stats.absorb(&[2.0], 1);
        stats.absorb(&[f32::NEG_INFINITY; 4], 4);
        assert_eq!(stats.max, 2.0);
        assert_eq!(stats.sum, 1.0);
    }

    #[test]
    fn test_two_tiles_match_reference() {
        let src = wavy_row(100);
        for strategy in STRATEGIES {
            let (out, _) = run(&src, 64, 2, strategy);
            assert_matches_reference(&src, &out);
        }
    }

    #[test]
    fn test_many_tiles_match_reference() {
        let src = wavy_row(1000);
        for strategy in STRATEGIES {
            for block in [8, 16, 128] {
                let (out, _) = run(&src, block, 1000usize.div_ceil(block), strategy);
                assert_matches_reference(&src, &out);
            }
        }
    }

    #[test]
    fn test_max_in_last_tile() {
        // forces a rescale of the running sum on the final tile
        let mut src = vec![0.0f32; 40];
        src[39] = 10.0;
        for strategy in STRATEGIES {
            let (out, _) = run(&src, 8, 5, strategy);
            assert_matches_reference(&src, &out);
        }
    }

    #[test]
    fn test_uniform_row_is_one_over_n() {
        let src = vec![-7.5f32; 1823];
        for strategy in STRATEGIES {
            let (out, _) = run(&src, 256, 8, strategy);
            assert!(out.iter().all(|&v| v == 1.0 / 1823.0));
        }
    }

    #[test]
    fn test_trailing_fully_masked_tiles() {
        let src = wavy_row(9);
        for strategy in STRATEGIES {
            let (out, counter) = run(&src, 4, 5, strategy);
            assert_matches_reference(&src, &out);
            // tiles 3 and 4 lie entirely past the row: stored, but nothing written
            assert_eq!(counter.stores(), &[1, 1, 1, 1, 1]);
        }
    }

    #[test]
    fn test_all_neg_inf_row_is_zero() {
        let src = vec![f32::NEG_INFINITY; 20];
        for strategy in STRATEGIES {
            let (out, _) = run(&src, 8, 3, strategy);
            assert_eq!(out, vec![0.0; 20]);
        }
    }

    #[test]
    fn test_zero_tiles_is_a_no_op() {
        for strategy in STRATEGIES {
            let (out, counter) = run(&[], 8, 0, strategy);
            assert!(out.is_empty());
            assert_eq!(counter.total_loads(), 0);
        }
    }

    #[test]
    fn test_streaming_reload_bound() {
        for block in [1usize, 2, 4, 16, 64] {
            for k in 1..=9usize {
                let n = (k - 1) * block + 1 + (block - 1) / 2;
                let (_, counter) = run(&wavy_row(n), block, k, MultiTileStrategy::Streaming);
                assert_eq!(counter.loads().len(), k);
                assert!(counter.max_loads_per_tile() <= 2, "block={block} k={k}");
                assert_eq!(counter.loads()[k - 1], 1);
                assert_eq!(counter.total_loads(), 2 * k as u32 - 1);
                assert!(counter.stores().iter().all(|&s| s == 1));
            }
        }
    }

    #[test]
    fn test_three_phase_reload_bound() {
        for block in [1usize, 2, 4, 16, 64] {
            for k in 1..=9usize {
                let n = (k - 1) * block + 1 + (block - 1) / 2;
                let (out, counter) = run(&wavy_row(n), block, k, MultiTileStrategy::ThreePhase);
                assert_matches_reference(&wavy_row(n), &out);
                assert!(counter.max_loads_per_tile() <= 2, "block={block} k={k}");
                assert!(counter.stores().iter().all(|&s| s == 1));
                let expected = if k <= 2 { 3 * k as u32 - 2 } else { 2 * k as u32 - 1 };
                assert_eq!(counter.total_loads(), expected, "block={block} k={k}");
            }
        }
    }

    #[test]
    fn test_three_phase_wide_row_never_reloads_three_times() {
        // 16 tiles, as planned for a 1_000_000 wide row at the default budget
        let block = 64;
        let k = 16;
        let src = wavy_row((k - 1) * block + 17);
        let (out, counter) = run(&src, block, k, MultiTileStrategy::ThreePhase);
        assert_matches_reference(&src, &out);
        assert_eq!(counter.loads().len(), k);
        assert_eq!(counter.max_loads_per_tile(), 2);
    }

    #[test]
    fn test_both_strategies_beat_three_full_passes() {
        let k = 6;
        let src = wavy_row(6 * 32);
        for strategy in STRATEGIES {
            let (_, counter) = run(&src, 32, k, strategy);
            assert!(counter.total_loads() < 3 * k as u32);
        }
    }
}
