//! Error types for the stencil benchmark.

use std::collections::TryReserveError;
use std::panic::Location;
use thiserror::Error;

/// Result type for stencil operations.
pub type Result<T> = std::result::Result<T, StencilError>;

/// Failure codes reported by the accelerator runtime.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceErrorCode {
    InvalidValue,
    OutOfMemory,
    InvalidHandle,
    NotFound,
    LaunchFailed,
    NotInitialized,
}

impl DeviceErrorCode {
    /// Stable name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceErrorCode::InvalidValue => "DEVICE_ERROR_INVALID_VALUE",
            DeviceErrorCode::OutOfMemory => "DEVICE_ERROR_OUT_OF_MEMORY",
            DeviceErrorCode::InvalidHandle => "DEVICE_ERROR_INVALID_HANDLE",
            DeviceErrorCode::NotFound => "DEVICE_ERROR_NOT_FOUND",
            DeviceErrorCode::LaunchFailed => "DEVICE_ERROR_LAUNCH_FAILED",
            DeviceErrorCode::NotInitialized => "DEVICE_ERROR_NOT_INITIALIZED",
        }
    }

    /// Numeric code, mirrors the order of the variants starting at 1.
    pub fn code(&self) -> i32 {
        *self as i32 + 1
    }
}

impl std::fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.code(), self.name())
    }
}

/// Errors that can occur while setting up or running a simulation.
#[derive(Error, Debug)]
pub enum StencilError {
    /// The tiles cannot cover the grid exactly.
    #[error(
        "grid side N = {n} is not a multiple of the tile size {tile_size}"
    )]
    TileMismatch { n: usize, tile_size: usize },

    #[error("tile size must be positive")]
    ZeroTileSize,

    #[error("grid side N must be positive")]
    EmptyGrid,

    /// Two grids that must match have different sides.
    #[error("grid side mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// Host allocation failure.
    #[error("can't allocate {bytes} bytes in host memory: {source}")]
    Allocation {
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    /// Any failing accelerator runtime call.
    #[error(
        "device error = {} from file <{}>, line {}: {}",
        .code,
        .location.file(),
        .location.line(),
        .message
    )]
    Device {
        code: DeviceErrorCode,
        message: String,
        location: &'static Location<'static>,
    },

    #[error("function {function} not found in module {module}")]
    KernelNotFound { module: String, function: String },

    /// Raised only when the mismatch policy asks for it.
    #[error("verification failed: {percent} % of cells differ")]
    VerificationFailed { percent: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl StencilError {
    /// Create a device error located at the caller.
    #[track_caller]
    pub fn device(code: DeviceErrorCode, message: impl Into<String>) -> Self {
        StencilError::Device {
            code,
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Create a device error located at an already captured call site.
    pub fn device_at(
        code: DeviceErrorCode,
        message: impl Into<String>,
        location: &'static Location<'static>,
    ) -> Self {
        StencilError::Device {
            code,
            message: message.into(),
            location,
        }
    }

    /// Errors caused by the configuration rather than the run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StencilError::TileMismatch { .. }
                | StencilError::ZeroTileSize
                | StencilError::EmptyGrid
        )
    }
}
