use stencil5p::device::*;
use stencil5p::driver::*;
use stencil5p::error::*;
use stencil5p::grid::*;
use stencil5p::verify::*;

/// What goes wrong on a `FaultyDevice`.
#[derive(Copy, Clone, Debug)]
enum Fault {
    /// The read back is off by one in a single cell.
    CorruptReadback,

    /// The `k`-th synchronize, counting from 1, reports a failed launch.
    FailSynchronize(usize),

    /// No module can be loaded.
    MissingModule,

    /// The stencil module loads but holds no kernels.
    EmptyModule,
}

/// Host device with one injected fault.
struct FaultyDevice {
    inner: HostDevice,
    fault: Fault,
    synchronized: usize,
}

impl FaultyDevice {
    fn new(fault: Fault) -> Self {
        FaultyDevice {
            inner: HostDevice::new(1).unwrap(),
            fault,
            synchronized: 0,
        }
    }
}

impl Device for FaultyDevice {
    fn info(&self) -> &DeviceInfo {
        self.inner.info()
    }

    fn load_module(&self, name: &str) -> Result<Module> {
        match self.fault {
            Fault::MissingModule => Err(StencilError::device(
                DeviceErrorCode::NotFound,
                format!("no module named {}", name),
            )),
            Fault::EmptyModule => Ok(Module::new(name, Vec::new())),
            _ => self.inner.load_module(name),
        }
    }

    fn alloc(&mut self, bytes: usize) -> Result<DeviceBuffer> {
        self.inner.alloc(bytes)
    }

    fn free(&mut self, buffer: DeviceBuffer) -> Result<()> {
        self.inner.free(buffer)
    }

    fn copy_htod(&mut self, dst: &DeviceBuffer, src: &[Cell]) -> Result<()> {
        self.inner.copy_htod(dst, src)
    }

    fn copy_dtoh(&mut self, dst: &mut [Cell], src: &DeviceBuffer) -> Result<()> {
        self.inner.copy_dtoh(dst, src)?;
        if let Fault::CorruptReadback = self.fault {
            dst[0] += 1.0;
        }
        Ok(())
    }

    fn launch(
        &mut self,
        kernel: &Kernel,
        config: &LaunchConfig,
        args: &KernelArgs,
    ) -> Result<()> {
        self.inner.launch(kernel, config, args)
    }

    fn synchronize(&mut self) -> Result<()> {
        self.synchronized += 1;
        match self.fault {
            Fault::FailSynchronize(k) if k == self.synchronized => Err(
                StencilError::device(DeviceErrorCode::LaunchFailed, "boom"),
            ),
            _ => self.inner.synchronize(),
        }
    }
}

fn small_config() -> Config {
    Config {
        n: 32,
        steps: 4,
        check: true,
        tile_size: 8,
        ..Default::default()
    }
}

fn argv(s: &str) -> Vec<String> {
    std::iter::once("stencil5p")
        .chain(s.split_whitespace())
        .map(String::from)
        .collect()
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("stencil5p_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn command_line_run() {
    let dir = scratch_dir("cli");
    let fname = dir.join("out.txt");
    let args = Args::parse_legacy(argv(&format!(
        "-N 64 -T 5 -check -b --tile-size 16 --threads 2 -fname {}",
        fname.display()
    )))
    .unwrap();
    let config = Config::from(args);
    let output = execute(&config).unwrap();

    assert_eq!(output.reference.as_ref(), Some(&output.result));
    assert!(output.report.verification.unwrap().is_exact());

    let content = std::fs::read_to_string(&fname).unwrap();
    let rows: Vec<Vec<f32>> = content
        .lines()
        .map(|l| l.split(' ').map(|v| v.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 64);
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), 64);
        for (x, v) in row.iter().enumerate() {
            assert_eq!(*v, output.result[x + y * 64]);
        }
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn image_output() {
    let dir = scratch_dir("image");
    let png = dir.join("grid.png");
    let config = Config {
        n: 32,
        steps: 4,
        tile_size: 8,
        image: Some(png.clone()),
        ..Default::default()
    };
    run(&config).unwrap();
    let img = image::open(&png).unwrap();
    assert_eq!((img.width(), img.height()), (32, 32));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn configuration_errors_come_first() {
    for (n, tile_size) in [(1000, 32), (0, 32), (64, 0)] {
        let config = Config {
            n,
            tile_size,
            ..Default::default()
        };
        let e = execute(&config).unwrap_err();
        assert!(e.is_configuration(), "{}", e);
    }
}

#[test]
fn mismatch_is_reported() {
    let config = Config {
        n: 32,
        steps: 2,
        check: true,
        tile_size: 8,
        ..Default::default()
    };
    let mut device = FaultyDevice::new(Fault::CorruptReadback);
    let output = run_with_device(&config, &mut device).unwrap();
    let verification = output.report.verification.unwrap();
    assert!(!verification.is_exact());
    assert_eq!(verification.fraction, 1.0 / (32.0 * 32.0));

    assert!(verification.enforce(MismatchPolicy::Warn).is_ok());
    assert!(matches!(
        verification.enforce(MismatchPolicy::Fail),
        Err(StencilError::VerificationFailed { .. })
    ));
}

#[test]
fn bottom_source_reaches_the_last_row() {
    let config = Config {
        n: 16,
        steps: 0,
        tile_size: 4,
        initial_condition: InitialCondition::with_bottom(BottomMirror::Linear),
        ..Default::default()
    };
    let output = run(&config).unwrap();
    let last_row = output.result.rows().last().unwrap();
    assert!(last_row.iter().any(|v| *v == CELL_MAX));
}

#[test]
fn failed_launch_aborts_the_run() {
    let config = small_config();
    let mut device = FaultyDevice::new(Fault::FailSynchronize(2));
    match run_with_device(&config, &mut device) {
        Err(StencilError::Device {
            code,
            message,
            location,
        }) => {
            assert_eq!(code, DeviceErrorCode::LaunchFailed);
            assert_eq!(message, "boom");
            // Located at the call inside the driver loop
            assert!(
                location.file().ends_with("driver/mod.rs"),
                "{}",
                location.file()
            );
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(device.synchronized, 2);
    assert_eq!(device.inner.allocated(), 0);

    let e = run_with_device(&config, &mut FaultyDevice::new(Fault::FailSynchronize(1)))
        .unwrap_err();
    let msg = e.to_string();
    assert!(msg.contains("DEVICE_ERROR_LAUNCH_FAILED"), "{}", msg);
    assert!(!e.is_configuration());
}

#[test]
fn missing_module_fails_at_startup() {
    let config = small_config();
    let mut device = FaultyDevice::new(Fault::MissingModule);
    match run_with_device(&config, &mut device) {
        Err(StencilError::Device { code, location, .. }) => {
            assert_eq!(code, DeviceErrorCode::NotFound);
            assert!(location.file().ends_with("driver/mod.rs"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(device.synchronized, 0);
    assert_eq!(device.inner.allocated(), 0);
}

#[test]
fn missing_kernel_fails_at_startup() {
    let config = small_config();
    let mut device = FaultyDevice::new(Fault::EmptyModule);
    match run_with_device(&config, &mut device) {
        Err(StencilError::KernelNotFound { module, function }) => {
            assert_eq!(module, STENCIL_MODULE);
            assert_eq!(function, STENCIL_KERNEL);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(device.synchronized, 0);
    assert_eq!(device.inner.allocated(), 0);
}
