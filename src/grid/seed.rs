use crate::grid::*;
use clap::ValueEnum;

/// Where the bottom heat source lands relative to the top band.
#[derive(Copy, Clone, Debug, ValueEnum, Default, Eq, PartialEq)]
pub enum BottomMirror {
    /// Seed cell `N*N - i` for each band index `i`.
    /// This is the last row with columns reflected as `N - x`.
    #[default]
    Linear,

    /// Seed cell `(N - 1 - x, N - 1)` for each band cell `(x, 0)`.
    Row,
}

impl BottomMirror {
    /// Mirror of band index `i` in an `n x n` grid.
    pub fn mirror(&self, i: usize, n: usize) -> usize {
        debug_assert!(i > 0 && i < n);
        match self {
            BottomMirror::Linear => n * n - i,
            BottomMirror::Row => coord_to_linear(&vector![n - 1 - i, n - 1], n),
        }
    }
}

/// Heat sources written into a fresh grid.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InitialCondition {
    pub bottom_source: bool,
    pub bottom_mirror: BottomMirror,
}

impl InitialCondition {
    pub fn top_only() -> Self {
        InitialCondition::default()
    }

    pub fn with_bottom(bottom_mirror: BottomMirror) -> Self {
        InitialCondition {
            bottom_source: true,
            bottom_mirror,
        }
    }

    /// Linear indices seeded by the top source.
    pub fn band(n: usize) -> impl Iterator<Item = usize> {
        let lo = 0.25 * n as f64;
        let hi = 0.75 * n as f64;
        (0..n).filter(move |i| {
            let f = *i as f64;
            f >= lo && f <= hi
        })
    }

    /// Every linear index that starts at `CELL_MAX`.
    pub fn seeded_indices(&self, n: usize) -> Vec<usize> {
        let mut result: Vec<usize> = Self::band(n).collect();
        if self.bottom_source {
            let mirrored: Vec<usize> = result
                .iter()
                .map(|i| self.bottom_mirror.mirror(*i, n))
                .collect();
            result.extend(mirrored);
        }
        result
    }

    pub fn apply(&self, grid: &mut GridBuffer) {
        let n = grid.n();
        grid.fill(CELL_MIN);
        for i in self.seeded_indices(n) {
            grid[i] = CELL_MAX;
        }
    }
}
