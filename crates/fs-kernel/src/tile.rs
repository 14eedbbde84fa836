//! Tile buffers and the masked load/store between a matrix row and a tile.
//!
//! A tile covers columns `[index * block_size, (index + 1) * block_size)` of
//! one row. Columns at or past the row's length are masked: loads fill them
//! with `MASK_SENTINEL` and stores skip them.

/// Value substituted for masked columns on load.
///
/// `-inf` never wins a max-reduction and `exp(-inf - m) == 0`, so masked
/// positions drop out of the row maximum and sum without special cases.
pub const MASK_SENTINEL: f32 = f32::NEG_INFINITY;

/// Hook called on every tile load and store.
///
/// The unit type is the no-op observer used by the launcher.
pub trait LoadObserver {
    fn on_load(&mut self, tile_index: usize);

    fn on_store(&mut self, _tile_index: usize) {}
}

impl LoadObserver for () {
    #[inline]
    fn on_load(&mut self, _tile_index: usize) {}
}

/// Records how many times each tile of a row was loaded and stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadCounter {
    loads: Vec<u32>,
    stores: Vec<u32>,
}

impl LoadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-tile load counts, indexed by tile.
    pub fn loads(&self) -> &[u32] {
        &self.loads
    }

    /// Per-tile store counts, indexed by tile.
    pub fn stores(&self) -> &[u32] {
        &self.stores
    }

    pub fn total_loads(&self) -> u32 {
        self.loads.iter().sum()
    }

    /// Largest number of loads any single tile received.
    pub fn max_loads_per_tile(&self) -> u32 {
        self.loads.iter().copied().max().unwrap_or(0)
    }
}

impl LoadObserver for LoadCounter {
    fn on_load(&mut self, tile_index: usize) {
        bump(&mut self.loads, tile_index);
    }

    fn on_store(&mut self, tile_index: usize) {
        bump(&mut self.stores, tile_index);
    }
}

fn bump(counts: &mut Vec<u32>, index: usize) {
    if counts.len() <= index {
        counts.resize(index + 1, 0);
    }
    counts[index] += 1;
}

/// A fixed-capacity working buffer holding one slice of one row.
#[derive(Debug, Clone)]
pub struct Tile {
    buf: Vec<f32>,
    index: usize,
    valid: usize,
}

impl Tile {
    /// Allocate a tile of `block_size` elements, initially fully masked.
    pub fn new(block_size: usize) -> Self {
        Tile {
            buf: vec![MASK_SENTINEL; block_size],
            index: 0,
            valid: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.buf.len()
    }

    /// Index of the tile within its row, as of the last load.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of unmasked positions, as of the last load.
    pub fn valid(&self) -> usize {
        self.valid
    }

    pub fn values(&self) -> &[f32] {
        &self.buf
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.buf
    }

    /// Load tile `index` of `row`, masking columns at or past `row.len()`.
    ///
    /// The whole buffer is overwritten, so nothing from a previous row or
    /// tile survives.
    pub fn load<O: LoadObserver>(&mut self, row: &[f32], index: usize, observer: &mut O) {
        let block = self.block_size();
        let base = index * block;
        let valid = row.len().saturating_sub(base).min(block);

        if valid > 0 {
            self.buf[..valid].copy_from_slice(&row[base..base + valid]);
        }
        self.buf[valid..].fill(MASK_SENTINEL);

        self.index = index;
        self.valid = valid;
        observer.on_load(index);
    }

    /// Store the tile back to its columns of `dst`, dropping masked positions.
    pub fn store<O: LoadObserver>(&self, dst: &mut [f32], observer: &mut O) {
        debug_assert!(self.valid == 0 || self.index * self.block_size() + self.valid <= dst.len());
        if self.valid > 0 {
            let base = self.index * self.block_size();
            dst[base..base + self.valid].copy_from_slice(&self.buf[..self.valid]);
        }
        observer.on_store(self.index);
    }
}
