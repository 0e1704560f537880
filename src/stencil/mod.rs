//! The five point update and the steppers that apply it to a whole grid.
//!
//! Every stepper reads only from its input and writes only interior cells
//! of its output, so boundary cells keep whatever value they were
//! initialized with.

mod sequential;
mod tiled;

pub use sequential::*;
pub use tiled::*;

use crate::error::*;
use crate::grid::*;

/// Scales the discrete laplacian.
pub const DIFFUSION_WEIGHT: Cell = 0.24;

/// Weight of the center cell inside the laplacian.
pub const CENTER_WEIGHT: Cell = -4.0;

/// New value of interior cell `id` of an `n x n` grid.
///
/// The accumulation order is north, south, west, east, center.
/// Float addition does not associate, so every implementation that should
/// agree with this one must sum in the same order.
#[inline]
pub fn stencil5p(input: &[Cell], id: usize, n: usize) -> Cell {
    let mut res = input[id - n];
    res += input[id + n];
    res += input[id - 1];
    res += input[id + 1];
    res += CENTER_WEIGHT * input[id];
    res *= DIFFUSION_WEIGHT;
    res += input[id];
    res.clamp(CELL_MIN, CELL_MAX)
}

/// One full update pass from `input` into `output`.
pub trait StencilStepper: Sync {
    fn name(&self) -> &'static str;

    /// When this returns every interior cell of `output` holds the
    /// updated value; boundary cells are untouched.
    fn step(&self, input: &GridBuffer, output: &mut GridBuffer) -> Result<()>;
}

fn check_same_side(input: &GridBuffer, output: &GridBuffer) -> Result<()> {
    if input.n() != output.n() {
        return Err(StencilError::DimensionMismatch {
            left: input.n(),
            right: output.n(),
        });
    }
    Ok(())
}
