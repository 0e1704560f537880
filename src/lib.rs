pub mod build_info;
pub mod device;
pub mod driver;
pub mod error;
pub mod grid;
pub mod par_slice;
pub mod simulation;
pub mod stencil;
pub mod timing;
pub mod util;
pub mod verify;
