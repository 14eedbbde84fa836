use fs_tensor::backend::check_operands;
use fs_tensor::{Matrix, MatrixLayout, SoftmaxBackend, TensorError};
use rayon::prelude::*;
use tracing::{debug, debug_span, warn};

use crate::config::{MultiTileStrategy, SoftmaxConfig};
use crate::dispatch::{plan_row, LaunchPlan, Path};
use crate::error::{KernelError, Result};
use crate::multi;
use crate::single;
use crate::tile::{LoadObserver, Tile};

/// Fused, tiled row-wise softmax.
///
/// Every row is processed independently: one task per row, each writing
/// only its own output row. All validation (layouts, plan, tile capacity)
/// happens before the first row is touched, so a rejected launch leaves the
/// output exactly as it was.
#[derive(Debug, Clone)]
pub struct FusedSoftmax {
    config: SoftmaxConfig,
}

impl FusedSoftmax {
    /// Create a kernel with a validated configuration.
    pub fn new(config: SoftmaxConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected softmax config");
            return Err(e);
        }
        Ok(FusedSoftmax { config })
    }

    pub fn config(&self) -> &SoftmaxConfig {
        &self.config
    }

    /// The plan the dispatcher picks for rows of `n_cols` elements.
    pub fn plan(&self, n_cols: usize) -> LaunchPlan {
        plan_row(n_cols, &self.config)
    }

    /// Row-wise softmax into a new matrix with the input's layout.
    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        let mut y = x.zeros_like();
        self.forward_into(x, &mut y)?;
        Ok(y)
    }

    /// Row-wise softmax into a caller-allocated matrix of the same shape.
    pub fn forward_into(&self, x: &Matrix, y: &mut Matrix) -> Result<LaunchPlan> {
        let y_layout = *y.layout();
        self.forward_slices(x.as_slice(), x.layout(), y.as_mut_slice(), &y_layout)
    }

    /// Row-wise softmax over raw buffers, letting the dispatcher pick the plan.
    pub fn forward_slices(
        &self,
        x: &[f32],
        x_layout: &MatrixLayout,
        y: &mut [f32],
        y_layout: &MatrixLayout,
    ) -> Result<LaunchPlan> {
        let plan = self.plan(x_layout.cols());
        self.forward_with_plan(&plan, x, x_layout, y, y_layout)?;
        Ok(plan)
    }

    /// Row-wise softmax with an explicit plan.
    ///
    /// # Errors
    /// - layout errors if shapes differ or a buffer is too short
    /// - `InvalidBlockSize`, `BlockSizeTooLarge` or `TileCapacityExceeded`
    ///   if the plan cannot cover a row within the tile budget
    pub fn forward_with_plan(
        &self,
        plan: &LaunchPlan,
        x: &[f32],
        x_layout: &MatrixLayout,
        y: &mut [f32],
        y_layout: &MatrixLayout,
    ) -> Result<()> {
        let _span = debug_span!(
            "fused_softmax",
            rows = x_layout.rows(),
            cols = x_layout.cols()
        )
        .entered();

        check_operands(x, x_layout, y, y_layout)?;
        if let Err(e) = plan.validate(x_layout.cols(), self.config.max_block_size) {
            warn!(error = %e, ?plan, "rejected launch plan");
            return Err(e);
        }

        let rows = x_layout.rows();
        let cols = x_layout.cols();
        if rows == 0 || cols == 0 {
            debug!("empty matrix, nothing to do");
            return Ok(());
        }

        debug!(
            path = ?plan.path,
            block_size = plan.block_size,
            n_tiles = plan.n_tiles,
            lanes = plan.lanes,
            parallel = self.config.parallel,
            "launching rows"
        );

        let strategy = self.config.multi_tile;
        let stride = y_layout.row_stride();

        if self.config.parallel {
            y.par_chunks_mut(stride)
                .take(rows)
                .enumerate()
                .for_each_init(
                    || Tile::new(plan.block_size),
                    |tile, (i, dst)| {
                        let src = &x[x_layout.row_range(i)];
                        process_row(plan, strategy, src, &mut dst[..cols], tile, &mut ());
                    },
                );
        } else {
            let mut tile = Tile::new(plan.block_size);
            for (i, dst) in y.chunks_mut(stride).take(rows).enumerate() {
                let src = &x[x_layout.row_range(i)];
                process_row(plan, strategy, src, &mut dst[..cols], &mut tile, &mut ());
            }
        }

        Ok(())
    }
}

impl Default for FusedSoftmax {
    fn default() -> Self {
        FusedSoftmax {
            config: SoftmaxConfig::default(),
        }
    }
}

/// Process one row according to `plan`, reporting tile traffic to `observer`.
///
/// The plan, the tile and both row lengths are checked before anything is
/// loaded; on error `dst` is untouched.
pub fn run_row<O: LoadObserver>(
    plan: &LaunchPlan,
    strategy: MultiTileStrategy,
    src: &[f32],
    dst: &mut [f32],
    tile: &mut Tile,
    observer: &mut O,
) -> Result<()> {
    if src.len() != dst.len() {
        return Err(TensorError::ShapeMismatch {
            expected: [1, src.len()],
            got: [1, dst.len()],
        }
        .into());
    }
    plan.validate(src.len(), plan.block_size)?;
    if tile.block_size() != plan.block_size {
        return Err(KernelError::InvalidConfig(format!(
            "tile holds {} elements, plan expects {}",
            tile.block_size(),
            plan.block_size
        )));
    }
    process_row(plan, strategy, src, dst, tile, observer);
    Ok(())
}

/// Row body shared by the launcher and `run_row`, for an already validated plan.
fn process_row<O: LoadObserver>(
    plan: &LaunchPlan,
    strategy: MultiTileStrategy,
    src: &[f32],
    dst: &mut [f32],
    tile: &mut Tile,
    observer: &mut O,
) {
    match plan.path {
        Path::SingleTile => single::softmax_row(src, dst, tile, plan.lanes, observer),
        Path::MultiTile => multi::softmax_row(
            src,
            dst,
            tile,
            plan.n_tiles,
            plan.lanes,
            strategy,
            observer,
        ),
    }
}

impl SoftmaxBackend for FusedSoftmax {
    fn name(&self) -> &str {
        "fused"
    }

    fn softmax_into(
        &self,
        x: &[f32],
        x_layout: &MatrixLayout,
        y: &mut [f32],
        y_layout: &MatrixLayout,
    ) -> fs_tensor::Result<()> {
        match self.forward_slices(x, x_layout, y, y_layout) {
            Ok(_) => Ok(()),
            Err(KernelError::Tensor(e)) => Err(e),
            Err(e) => Err(TensorError::Other(format!("fused softmax: {}", e))),
        }
    }
}
