use crate::error::*;
use crate::util::*;

/// Square-ish region of the grid processed as one unit of parallel work.
/// Each instance is inclusive of both corners.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct Tile {
    pub bounds: Bounds,
}

impl Tile {
    /// Create tile from corners.
    pub fn from_mm(min: Coord, max: Coord) -> Self {
        let result = Tile {
            bounds: Bounds::from_columns(&[min, max]),
        };
        debug_assert!(result.check_validity());
        result
    }

    /// The cells covered by thread block `block_index` of size `block_dim`,
    /// clipped to an `n x n` grid.
    /// Returns `None` when the block lies completely outside the grid.
    pub fn from_block(
        block_index: &Coord,
        block_dim: &Coord,
        n: usize,
    ) -> Option<Self> {
        if block_dim[0] == 0 || block_dim[1] == 0 {
            return None;
        }
        let min = block_index.component_mul(block_dim);
        if min[0] >= n || min[1] >= n {
            return None;
        }
        let max = vector![
            (min[0] + block_dim[0]).min(n) - 1,
            (min[1] + block_dim[1]).min(n) - 1
        ];
        Some(Tile::from_mm(min, max))
    }

    /// Check that max >= min
    pub fn check_validity(&self) -> bool {
        self.bounds[(0, 0)] <= self.bounds[(0, 1)]
            && self.bounds[(1, 0)] <= self.bounds[(1, 1)]
    }

    /// Return iterator over contained coords, rows first.
    pub fn coord_iter(&self) -> impl Iterator<Item = Coord> + '_ {
        let (x0, x1) = (self.bounds[(0, 0)], self.bounds[(0, 1)]);
        let (y0, y1) = (self.bounds[(1, 0)], self.bounds[(1, 1)]);
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| vector![x, y]))
    }
}

/// Exact partition of an `n x n` grid into `tile_size x tile_size` tiles.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TileLayout {
    n: usize,
    tile_size: usize,
}

impl TileLayout {
    /// Fails when the tiles cannot cover the grid exactly.
    pub fn new(n: usize, tile_size: usize) -> Result<Self> {
        if tile_size == 0 {
            return Err(StencilError::ZeroTileSize);
        }
        if n == 0 {
            return Err(StencilError::EmptyGrid);
        }
        if n % tile_size != 0 {
            return Err(StencilError::TileMismatch { n, tile_size });
        }
        Ok(TileLayout { n, tile_size })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of tiles along one side.
    pub fn tiles_per_side(&self) -> usize {
        self.n / self.tile_size
    }

    /// Launch grid dimensions, one block per tile.
    pub fn grid_dim(&self) -> Coord {
        vector![self.tiles_per_side(), self.tiles_per_side()]
    }

    /// Launch block dimensions, one thread per cell of a tile.
    pub fn block_dim(&self) -> Coord {
        vector![self.tile_size, self.tile_size]
    }

    pub fn tile(&self, block_index: &Coord) -> Tile {
        let min = block_index * self.tile_size;
        Tile::from_mm(min, min.add_scalar(self.tile_size - 1))
    }

    /// Every tile, in block order.
    pub fn tiles(&self) -> Vec<Tile> {
        let side = self.tiles_per_side();
        (0..side * side)
            .map(|i| self.tile(&linear_to_coord(i, side)))
            .collect()
    }
}
