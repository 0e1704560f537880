use crate::util::*;

/// Number of cells in a square grid with side `n`.
pub fn grid_buffer_size(n: usize) -> usize {
    n * n
}

/// `x` is the fastest moving dimension: `id = x + y * n`.
pub fn coord_to_linear(coord: &Coord, n: usize) -> usize {
    debug_assert!(coord[0] < n && coord[1] < n);
    coord[0] + coord[1] * n
}

pub fn linear_to_coord(linear_index: usize, n: usize) -> Coord {
    vector![linear_index % n, linear_index / n]
}

/// Whether a coordinate lies on the fixed boundary of an `n x n` grid.
pub fn is_boundary(coord: &Coord, n: usize) -> bool {
    coord[0] == 0 || coord[1] == 0 || coord[0] + 1 == n || coord[1] + 1 == n
}
