use crate::device::*;
use crate::error::*;
use crate::grid::*;
use std::panic::Location;
use tracing::{debug, info};

/// Largest block the host device accepts, matches common GPU limits.
pub const MAX_THREADS_PER_BLOCK: usize = 1024;

#[derive(Debug)]
struct PendingLaunch {
    kernel: Kernel,
    config: LaunchConfig,
    input: usize,
    output: usize,
    n: usize,
}

/// Device backed by host memory and a dedicated rayon pool.
/// Launches are queued on a single stream and run in order on
/// `synchronize`, each launch finishing before the next one starts.
pub struct HostDevice {
    info: DeviceInfo,
    pool: rayon::ThreadPool,
    memory: Vec<Option<Vec<Cell>>>,
    allocated: usize,
    stream: Vec<PendingLaunch>,
}

impl HostDevice {
    /// `threads == 0` lets rayon pick one thread per core.
    #[track_caller]
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_memory_limit(threads, usize::MAX)
    }

    /// Device that refuses allocations beyond `total_memory` bytes.
    #[track_caller]
    pub fn with_memory_limit(threads: usize, total_memory: usize) -> Result<Self> {
        let location = Location::caller();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("device_thread_{}", i))
            .build()
            .map_err(|e| {
                StencilError::device_at(
                    DeviceErrorCode::NotInitialized,
                    e.to_string(),
                    location,
                )
            })?;
        let compute_units = pool.current_num_threads();
        let info = DeviceInfo {
            name: format!("host ({} threads)", compute_units),
            compute_units,
            max_threads_per_block: MAX_THREADS_PER_BLOCK,
            total_memory,
        };
        info!("Initialized device: {}", info.name);
        Ok(HostDevice {
            info,
            pool,
            memory: Vec::new(),
            allocated: 0,
            stream: Vec::new(),
        })
    }

    /// Bytes currently allocated.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Number of launches waiting for `synchronize`.
    pub fn pending_launches(&self) -> usize {
        self.stream.len()
    }

    fn slot(
        &self,
        buffer: &DeviceBuffer,
        location: &'static Location<'static>,
    ) -> Result<&Vec<Cell>> {
        match self.memory.get(buffer.slot) {
            Some(Some(memory)) => Ok(memory),
            _ => Err(invalid_handle(buffer, location)),
        }
    }

    fn slot_mut(
        &mut self,
        buffer: &DeviceBuffer,
        location: &'static Location<'static>,
    ) -> Result<&mut Vec<Cell>> {
        match self.memory.get_mut(buffer.slot) {
            Some(Some(memory)) => Ok(memory),
            _ => Err(invalid_handle(buffer, location)),
        }
    }

    fn flush(&mut self, location: &'static Location<'static>) -> Result<()> {
        if self.stream.is_empty() {
            return Ok(());
        }
        profiling::scope!("host_device: synchronize");
        for launch in std::mem::take(&mut self.stream) {
            // Take the output out so input and output can be borrowed
            // at the same time, they are distinct slots.
            let mut output = self
                .memory
                .get_mut(launch.output)
                .and_then(Option::take)
                .ok_or_else(|| launch_failed(&launch, location))?;
            let result = match self.memory.get(launch.input) {
                Some(Some(input)) => {
                    let entry = launch.kernel.entry();
                    self.pool.install(|| {
                        entry(input, &mut output, launch.n, &launch.config)
                    });
                    Ok(())
                }
                _ => Err(launch_failed(&launch, location)),
            };
            self.memory[launch.output] = Some(output);
            result?;
        }
        Ok(())
    }
}

fn invalid_handle(
    buffer: &DeviceBuffer,
    location: &'static Location<'static>,
) -> StencilError {
    StencilError::device_at(
        DeviceErrorCode::InvalidHandle,
        format!("no allocation behind {:?}", buffer),
        location,
    )
}

fn invalid_value(
    message: impl Into<String>,
    location: &'static Location<'static>,
) -> StencilError {
    StencilError::device_at(DeviceErrorCode::InvalidValue, message, location)
}

fn launch_failed(
    launch: &PendingLaunch,
    location: &'static Location<'static>,
) -> StencilError {
    StencilError::device_at(
        DeviceErrorCode::LaunchFailed,
        format!("{} lost one of its buffers", launch.kernel.name()),
        location,
    )
}

impl Device for HostDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    #[track_caller]
    fn load_module(&self, name: &str) -> Result<Module> {
        let location = Location::caller();
        debug!("Loading module {}", name);
        Module::builtin(name).ok_or_else(|| {
            StencilError::device_at(
                DeviceErrorCode::NotFound,
                format!("no module named {}", name),
                location,
            )
        })
    }

    #[track_caller]
    fn alloc(&mut self, bytes: usize) -> Result<DeviceBuffer> {
        let location = Location::caller();
        let cell_size = std::mem::size_of::<Cell>();
        if bytes == 0 || bytes % cell_size != 0 {
            return Err(invalid_value(
                format!("can't allocate {} bytes", bytes),
                location,
            ));
        }
        let out_of_memory = || {
            StencilError::device_at(
                DeviceErrorCode::OutOfMemory,
                format!("can't allocate {} bytes", bytes),
                location,
            )
        };
        if bytes > self.info.total_memory - self.allocated {
            return Err(out_of_memory());
        }
        let cells = bytes / cell_size;
        let mut memory = Vec::new();
        memory
            .try_reserve_exact(cells)
            .map_err(|_| out_of_memory())?;
        memory.resize(cells, 0.0);

        let slot = match self.memory.iter().position(Option::is_none) {
            Some(free_slot) => {
                self.memory[free_slot] = Some(memory);
                free_slot
            }
            None => {
                self.memory.push(Some(memory));
                self.memory.len() - 1
            }
        };
        self.allocated += bytes;
        debug!("Allocated {} bytes in slot {}", bytes, slot);
        Ok(DeviceBuffer { slot, bytes })
    }

    #[track_caller]
    fn free(&mut self, buffer: DeviceBuffer) -> Result<()> {
        let location = Location::caller();
        self.flush(location)?;
        self.slot(&buffer, location)?;
        self.memory[buffer.slot] = None;
        self.allocated -= buffer.bytes;
        debug!("Freed slot {}", buffer.slot);
        Ok(())
    }

    #[track_caller]
    fn copy_htod(&mut self, dst: &DeviceBuffer, src: &[Cell]) -> Result<()> {
        let location = Location::caller();
        self.flush(location)?;
        profiling::scope!("host_device: copy_htod");
        let src_bytes: &[u8] = bytemuck::cast_slice(src);
        let memory = self.slot_mut(dst, location)?;
        let dst_bytes: &mut [u8] = bytemuck::cast_slice_mut(memory.as_mut_slice());
        if src_bytes.len() > dst_bytes.len() {
            return Err(invalid_value(
                format!(
                    "copy of {} bytes into {} byte buffer",
                    src_bytes.len(),
                    dst_bytes.len()
                ),
                location,
            ));
        }
        dst_bytes[..src_bytes.len()].copy_from_slice(src_bytes);
        Ok(())
    }

    #[track_caller]
    fn copy_dtoh(&mut self, dst: &mut [Cell], src: &DeviceBuffer) -> Result<()> {
        let location = Location::caller();
        self.flush(location)?;
        profiling::scope!("host_device: copy_dtoh");
        let memory = self.slot(src, location)?;
        let src_bytes: &[u8] = bytemuck::cast_slice(memory.as_slice());
        let dst_bytes: &mut [u8] = bytemuck::cast_slice_mut(dst);
        if dst_bytes.len() > src_bytes.len() {
            return Err(invalid_value(
                format!(
                    "copy of {} bytes out of {} byte buffer",
                    dst_bytes.len(),
                    src_bytes.len()
                ),
                location,
            ));
        }
        dst_bytes.copy_from_slice(&src_bytes[..dst_bytes.len()]);
        Ok(())
    }

    #[track_caller]
    fn launch(
        &mut self,
        kernel: &Kernel,
        config: &LaunchConfig,
        args: &KernelArgs,
    ) -> Result<()> {
        let location = Location::caller();
        if config.blocks() == 0 || config.threads_per_block() == 0 {
            return Err(invalid_value(
                format!("empty launch {}", config),
                location,
            ));
        }
        if config.threads_per_block() > self.info.max_threads_per_block {
            return Err(invalid_value(
                format!(
                    "{} threads per block, limit is {}",
                    config.threads_per_block(),
                    self.info.max_threads_per_block
                ),
                location,
            ));
        }
        if args.input.slot == args.output.slot {
            return Err(invalid_value(
                "input and output must be distinct buffers",
                location,
            ));
        }
        let bytes = args
            .n
            .checked_mul(args.n)
            .and_then(|cells| cells.checked_mul(std::mem::size_of::<Cell>()))
            .ok_or_else(|| invalid_value("grid side overflows", location))?;
        for buffer in [args.input, args.output] {
            let memory = self.slot(buffer, location)?;
            if std::mem::size_of_val(memory.as_slice()) != bytes {
                return Err(invalid_value(
                    format!(
                        "{} byte buffer for a {} x {} grid",
                        buffer.bytes, args.n, args.n
                    ),
                    location,
                ));
            }
        }
        self.stream.push(PendingLaunch {
            kernel: *kernel,
            config: *config,
            input: args.input.slot,
            output: args.output.slot,
            n: args.n,
        });
        Ok(())
    }

    #[track_caller]
    fn synchronize(&mut self) -> Result<()> {
        self.flush(Location::caller())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::stencil::*;
    use crate::util::*;

    fn stencil_kernel(device: &HostDevice) -> Kernel {
        device
            .load_module(STENCIL_MODULE)
            .unwrap()
            .function(STENCIL_KERNEL)
            .unwrap()
    }

    #[test]
    fn copy_round_trip() {
        let mut device = HostDevice::new(2).unwrap();
        let buffer = device.alloc(16 * 4).unwrap();
        assert_eq!(device.allocated(), 64);
        let host: Vec<f32> = (0..16).map(|i| i as f32).collect();
        device.copy_htod(&buffer, &host).unwrap();
        let mut back = vec![0.0; 16];
        device.copy_dtoh(&mut back, &buffer).unwrap();
        assert_eq!(host, back);
        device.free(buffer).unwrap();
        assert_eq!(device.allocated(), 0);
    }

    #[test]
    fn slots_are_reused() {
        let mut device = HostDevice::new(1).unwrap();
        let a = device.alloc(4).unwrap();
        let b = device.alloc(8).unwrap();
        let a_slot = a.slot;
        device.free(a).unwrap();
        let c = device.alloc(12).unwrap();
        assert_eq!(c.slot, a_slot);
        assert_ne!(b.slot, c.slot);
    }

    #[test]
    fn bad_allocations() {
        let mut device = HostDevice::with_memory_limit(1, 64).unwrap();
        for bytes in [0, 3] {
            match device.alloc(bytes) {
                Err(StencilError::Device { code, .. }) => {
                    assert_eq!(code, DeviceErrorCode::InvalidValue)
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        let a = device.alloc(64).unwrap();
        match device.alloc(4) {
            Err(StencilError::Device { code, .. }) => {
                assert_eq!(code, DeviceErrorCode::OutOfMemory)
            }
            other => panic!("unexpected {:?}", other),
        }
        device.free(a).unwrap();
        assert!(device.alloc(4).is_ok());
    }

    #[test]
    fn double_free() {
        let mut device = HostDevice::new(1).unwrap();
        let a = device.alloc(4).unwrap();
        let stale = DeviceBuffer {
            slot: a.slot,
            bytes: a.bytes,
        };
        device.free(a).unwrap();
        let line = line!() + 1;
        match device.free(stale) {
            Err(StencilError::Device { code, location, .. }) => {
                assert_eq!(code, DeviceErrorCode::InvalidHandle);
                assert_eq!(location.line(), line);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_copy() {
        let mut device = HostDevice::new(1).unwrap();
        let a = device.alloc(8).unwrap();
        assert!(device.copy_htod(&a, &[1.0, 2.0, 3.0]).is_err());
        let mut host = vec![0.0; 3];
        assert!(device.copy_dtoh(&mut host, &a).is_err());
    }

    #[test]
    fn missing_module() {
        let device = HostDevice::new(1).unwrap();
        match device.load_module("missing") {
            Err(StencilError::Device { code, message, .. }) => {
                assert_eq!(code, DeviceErrorCode::NotFound);
                assert!(message.contains("missing"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn launch_is_deferred_until_synchronize() {
        let n = 8;
        let mut device = HostDevice::new(2).unwrap();
        let kernel = stencil_kernel(&device);
        let layout = TileLayout::new(n, 4).unwrap();
        let config = LaunchConfig::for_layout(&layout);

        let initial =
            GridBuffer::with_initial_condition(n, &InitialCondition::top_only())
                .unwrap();
        let input = device.alloc(initial.size_bytes()).unwrap();
        let output = device.alloc(initial.size_bytes()).unwrap();
        device.copy_htod(&input, initial.buffer()).unwrap();
        device.copy_htod(&output, initial.buffer()).unwrap();

        let args = KernelArgs {
            input: &input,
            output: &output,
            n,
        };
        device.launch(&kernel, &config, &args).unwrap();
        assert_eq!(device.pending_launches(), 1);
        device.synchronize().unwrap();
        assert_eq!(device.pending_launches(), 0);

        let mut result = GridBuffer::new(n).unwrap();
        device.copy_dtoh(result.buffer_mut(), &output).unwrap();

        let mut expected = initial.try_clone().unwrap();
        SequentialStepper.step(&initial, &mut expected).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn launch_validation() {
        let n = 4;
        let mut device = HostDevice::new(1).unwrap();
        let kernel = stencil_kernel(&device);
        let a = device.alloc(n * n * 4).unwrap();
        let b = device.alloc(n * n * 4).unwrap();
        let small = device.alloc(4).unwrap();
        let config = LaunchConfig {
            grid_dim: vector![2, 2],
            block_dim: vector![2, 2],
        };

        let aliased = KernelArgs {
            input: &a,
            output: &a,
            n,
        };
        assert!(device.launch(&kernel, &config, &aliased).is_err());

        let wrong_size = KernelArgs {
            input: &a,
            output: &small,
            n,
        };
        assert!(device.launch(&kernel, &config, &wrong_size).is_err());

        let huge_block = LaunchConfig {
            grid_dim: vector![1, 1],
            block_dim: vector![64, 64],
        };
        let ok_args = KernelArgs {
            input: &a,
            output: &b,
            n,
        };
        assert!(device.launch(&kernel, &huge_block, &ok_args).is_err());
        assert_eq!(device.pending_launches(), 0);

        assert!(device.launch(&kernel, &config, &ok_args).is_ok());
        assert_eq!(device.pending_launches(), 1);
    }
}
