pub use nalgebra::vector;
pub use num_traits::{Float, Num};

/// Element types the parallel slice helpers operate on.
pub trait NumTrait: Num + Copy + Send + Sync {}
impl<T: Num + Copy + Send + Sync> NumTrait for T {}

pub mod indexing;
mod tile;
pub use indexing::*;
pub use tile::*;

/// Grid coordinate `(x, y)`.
pub type Coord = nalgebra::Vector2<usize>;

/// Inclusive corners, column 0 is min, column 1 is max.
pub type Bounds = nalgebra::Matrix2<usize>;
