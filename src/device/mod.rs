//! The accelerator runtime seen by the driver.
//!
//! A device owns buffers addressed by handles, copies whole buffers to and
//! from the host, and runs named kernels over a 2D grid of thread blocks.
//! Launches are queued and only guaranteed complete after `synchronize`.

mod host;
mod module;

pub use host::*;
pub use module::*;

use crate::error::*;
use crate::grid::*;
use crate::util::*;

/// Handle to a device resident allocation.
/// Not `Clone`, freeing consumes the handle.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct DeviceBuffer {
    slot: usize,
    bytes: usize,
}

impl DeviceBuffer {
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub name: String,
    pub compute_units: usize,
    pub max_threads_per_block: usize,
    pub total_memory: usize,
}

/// Blocks per grid and threads per block, `x` then `y`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LaunchConfig {
    pub grid_dim: Coord,
    pub block_dim: Coord,
}

impl LaunchConfig {
    /// One block per tile, one thread per cell.
    pub fn for_layout(layout: &TileLayout) -> Self {
        LaunchConfig {
            grid_dim: layout.grid_dim(),
            block_dim: layout.block_dim(),
        }
    }

    pub fn threads_per_block(&self) -> usize {
        self.block_dim[0] * self.block_dim[1]
    }

    pub fn blocks(&self) -> usize {
        self.grid_dim[0] * self.grid_dim[1]
    }
}

impl std::fmt::Display for LaunchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "grid {{{}, {}, 1}}, block {{{}, {}, 1}}",
            self.grid_dim[0],
            self.grid_dim[1],
            self.block_dim[0],
            self.block_dim[1]
        )
    }
}

/// Parameters of the stencil kernel: source, destination and grid side.
#[derive(Copy, Clone, Debug)]
pub struct KernelArgs<'a> {
    pub input: &'a DeviceBuffer,
    pub output: &'a DeviceBuffer,
    pub n: usize,
}

pub trait Device {
    fn info(&self) -> &DeviceInfo;

    #[track_caller]
    fn load_module(&self, name: &str) -> Result<Module>;

    #[track_caller]
    fn alloc(&mut self, bytes: usize) -> Result<DeviceBuffer>;

    #[track_caller]
    fn free(&mut self, buffer: DeviceBuffer) -> Result<()>;

    /// Blocking, waits for queued launches first.
    #[track_caller]
    fn copy_htod(&mut self, dst: &DeviceBuffer, src: &[Cell]) -> Result<()>;

    /// Blocking, waits for queued launches first.
    #[track_caller]
    fn copy_dtoh(&mut self, dst: &mut [Cell], src: &DeviceBuffer) -> Result<()>;

    /// Queue a kernel launch. Arguments are checked now,
    /// the kernel runs by the next `synchronize`.
    #[track_caller]
    fn launch(
        &mut self,
        kernel: &Kernel,
        config: &LaunchConfig,
        args: &KernelArgs,
    ) -> Result<()>;

    /// Blocks until every queued launch has completed.
    #[track_caller]
    fn synchronize(&mut self) -> Result<()>;
}
