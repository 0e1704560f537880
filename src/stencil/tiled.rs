use crate::error::*;
use crate::grid::*;
use crate::stencil::*;
use crate::util::*;
use rayon::prelude::*;
use sync_ptr::SyncMutPtr;

/// Splits the grid into square tiles and updates them on the rayon pool.
#[derive(Copy, Clone, Debug)]
pub struct TiledStepper {
    tile_size: usize,
}

impl TiledStepper {
    pub fn new(tile_size: usize) -> Result<Self> {
        if tile_size == 0 {
            return Err(StencilError::ZeroTileSize);
        }
        Ok(TiledStepper { tile_size })
    }

    /// Fails when the tiles can't cover an `n x n` grid exactly.
    pub fn layout(&self, n: usize) -> Result<TileLayout> {
        TileLayout::new(n, self.tile_size)
    }
}

impl StencilStepper for TiledStepper {
    fn name(&self) -> &'static str {
        "tiled"
    }

    fn step(&self, input: &GridBuffer, output: &mut GridBuffer) -> Result<()> {
        profiling::scope!("tiled_stepper");
        check_same_side(input, output)?;
        let layout = self.layout(input.n())?;
        par_apply_tiles(
            input.buffer(),
            output.buffer_mut(),
            layout.n(),
            &layout.tiles(),
        );
        Ok(())
    }
}

/// Runs one update pass as a grid of `grid_dim` blocks,
/// each covering `block_dim` cells.
/// Cells outside the `n x n` grid are skipped, cells not covered by
/// any block are left untouched.
/// Returns once every block has finished.
pub fn par_apply_blocks(
    input: &[Cell],
    output: &mut [Cell],
    n: usize,
    grid_dim: &Coord,
    block_dim: &Coord,
) {
    let tiles: Vec<Tile> = (0..grid_dim[0] * grid_dim[1])
        .filter_map(|block| {
            let block_index = vector![block % grid_dim[0], block / grid_dim[0]];
            Tile::from_block(&block_index, block_dim, n)
        })
        .collect();
    par_apply_tiles(input, output, n, &tiles);
}

/// Updates the interior cells of every tile in parallel.
/// `tiles` must lie inside the grid and must not overlap.
/// Returns once every tile has finished.
fn par_apply_tiles(
    input: &[Cell],
    output: &mut [Cell],
    n: usize,
    tiles: &[Tile],
) {
    let size = grid_buffer_size(n);
    assert_eq!(input.len(), size);
    assert_eq!(output.len(), size);

    // Tiles are disjoint, so each cell has at most one writer
    let output_ptr = unsafe { SyncMutPtr::new(output.as_mut_ptr()) };
    tiles.par_iter().for_each(|tile| {
        unsafe { apply_tile(input, &output_ptr, n, tile) };
    });
}

/// # Safety
/// `output` must point to `n * n` cells that do not overlap `input`,
/// and no other thread may access the cells of `tile` concurrently.
unsafe fn apply_tile(
    input: &[Cell],
    output: &SyncMutPtr<Cell>,
    n: usize,
    tile: &Tile,
) {
    profiling::scope!("tiled_stepper: Tile Callback");
    for coord in tile.coord_iter() {
        if is_boundary(&coord, n) {
            continue;
        }
        let id = coord_to_linear(&coord, n);
        output.inner().add(id).write(stencil5p(input, id, n));
    }
}
