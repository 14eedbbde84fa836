//! Single-tile path: the whole padded row lives in one tile.

use crate::reduce;
use crate::tile::{LoadObserver, Tile};

/// Softmax of one row held entirely in `tile`.
///
/// One masked load, max, exp of the shifted values, sum, divide, one masked
/// store. `tile.block_size()` must be at least `src.len()`.
pub fn softmax_row<O: LoadObserver>(
    src: &[f32],
    dst: &mut [f32],
    tile: &mut Tile,
    lanes: usize,
    observer: &mut O,
) {
    debug_assert!(tile.block_size() >= src.len());
    debug_assert_eq!(src.len(), dst.len());

    tile.load(src, 0, observer);

    let max = reduce::max(tile.values(), lanes);
    reduce::exp_shift_in_place(tile.values_mut(), reduce::stable_shift(max));
    let sum = reduce::sum(tile.values(), lanes);
    reduce::normalize_in_place(tile.values_mut(), sum);

    tile.store(dst, observer);
}
