//! Square grids of cells and their initial conditions.
//! Cells are stored row-major with `x` moving fastest,
//! so `(x, y)` lives at `x + y * N`.

mod seed;

pub use seed::*;

use crate::error::*;
use crate::par_slice;
use crate::util::*;

pub type Cell = f32;

pub const CELL_MIN: Cell = 0.0;
pub const CELL_MAX: Cell = 127.0;

/// Cells further apart than this count as different.
pub const DIFF_TOLERANCE: Cell = 1e-6;

/// Work split for the parallel slice helpers.
pub const CHUNK_SIZE: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
pub struct GridBuffer {
    n: usize,
    buffer: Vec<Cell>,
}

impl GridBuffer {
    /// Allocate a zeroed `n x n` grid.
    /// Host allocation failure is reported instead of aborting.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(StencilError::EmptyGrid);
        }
        // An overflowing side fails in try_reserve_exact below
        let size = n.checked_mul(n).unwrap_or(usize::MAX);
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).map_err(|source| {
            StencilError::Allocation {
                bytes: size.saturating_mul(std::mem::size_of::<Cell>()),
                source,
            }
        })?;
        buffer.resize(size, CELL_MIN);
        Ok(GridBuffer { n, buffer })
    }

    /// Allocate and seed a grid.
    pub fn with_initial_condition(
        n: usize,
        initial_condition: &InitialCondition,
    ) -> Result<Self> {
        let mut result = Self::new(n)?;
        initial_condition.apply(&mut result);
        Ok(result)
    }

    /// Deep copy with a fallible allocation.
    pub fn try_clone(&self) -> Result<Self> {
        let mut result = Self::new(self.n)?;
        result.buffer.copy_from_slice(&self.buffer);
        Ok(result)
    }

    /// Side length.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.buffer.len() * std::mem::size_of::<Cell>()
    }

    pub fn buffer(&self) -> &[Cell] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [Cell] {
        &mut self.buffer
    }

    #[track_caller]
    pub fn view(&self, coord: &Coord) -> Cell {
        self.buffer[coord_to_linear(coord, self.n)]
    }

    #[track_caller]
    pub fn set_coord(&mut self, coord: &Coord, value: Cell) {
        let index = coord_to_linear(coord, self.n);
        self.buffer[index] = value;
    }

    pub fn is_boundary(&self, coord: &Coord) -> bool {
        is_boundary(coord, self.n)
    }

    pub fn fill(&mut self, value: Cell) {
        par_slice::set_value(&mut self.buffer, value, CHUNK_SIZE);
    }

    /// Fraction of cells, in `[0, 1]`, that differ by more than
    /// `DIFF_TOLERANCE`.
    pub fn relative_difference(&self, other: &GridBuffer) -> Result<f64> {
        if self.n != other.n {
            return Err(StencilError::DimensionMismatch {
                left: self.n,
                right: other.n,
            });
        }
        let count = par_slice::count_differences(
            &self.buffer,
            &other.buffer,
            DIFF_TOLERANCE,
            CHUNK_SIZE,
        );
        Ok(count as f64 / self.buffer.len() as f64)
    }

    /// Row-major rows of the grid.
    pub fn rows(&self) -> std::slice::Chunks<'_, Cell> {
        self.buffer.chunks(self.n)
    }
}

impl std::ops::Index<usize> for GridBuffer {
    type Output = Cell;

    fn index(&self, index: usize) -> &Cell {
        &self.buffer[index]
    }
}

impl std::ops::IndexMut<usize> for GridBuffer {
    fn index_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.buffer[index]
    }
}
