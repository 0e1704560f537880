//! End to end benchmark run: the accelerated loop on a device, the
//! optional host reference, verification and output.

mod args;
mod output;

pub use args::*;
pub use output::*;

use crate::device::*;
use crate::error::*;
use crate::grid::*;
use crate::simulation::*;
use crate::stencil::*;
use crate::timing::*;
use crate::util::*;
use crate::verify::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything a run needs, filled once from the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub n: usize,
    pub steps: usize,
    pub check: bool,
    pub verbose: bool,
    pub initial_condition: InitialCondition,
    pub fname: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub tile_size: usize,
    pub threads: usize,
    pub mismatch_policy: MismatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            n: 1024,
            steps: 10,
            check: false,
            verbose: false,
            initial_condition: InitialCondition::top_only(),
            fname: None,
            image: None,
            tile_size: 32,
            threads: 0,
            mismatch_policy: MismatchPolicy::Warn,
        }
    }
}

impl Config {
    /// Rejects grids the tiled kernel can't cover.
    pub fn validate(&self) -> Result<TileLayout> {
        TileLayout::new(self.n, self.tile_size)
    }

    /// Bytes of one grid.
    pub fn grid_bytes(&self) -> f64 {
        self.n as f64 * self.n as f64 * std::mem::size_of::<Cell>() as f64
    }
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub device_name: String,
    pub launch: LaunchConfig,
    pub grid_bytes: usize,
    pub timings: Timings,
    pub verification: Option<Verification>,
}

#[derive(Debug)]
pub struct RunOutput {
    /// Final grid of the accelerated loop.
    pub result: GridBuffer,

    /// Final grid of the host loop, present with `check`.
    pub reference: Option<GridBuffer>,

    pub report: RunReport,
}

pub fn print_banner(config: &Config) {
    let fname = config
        .fname
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<no output specified>".to_string());
    println!("***");
    println!("*** Starting Stencil Computation...");
    println!("***");
    println!();
    println!("** Input Arguments:");
    println!("*  N    = {:<28}(N*N points in total)", config.n);
    println!("*  T    = {:<28}(number of iterations)", config.steps);
    println!(
        "*  size = {:<28}(MBytes for one stencil array)",
        config.grid_bytes() * 1e-6
    );
    println!(
        "*  checkResult = {:<18} (verify with cpu calculation)",
        config.check
    );
    println!(
        "*  bottomSource = {}",
        config.initial_condition.bottom_source
    );
    println!("*  fname = {:<24} (output file)", fname);
}

pub fn print_report(report: &RunReport) {
    println!("*** Report:");
    println!(
        "**  host to device copy time = {} s ({} Bytes)",
        report.timings.seconds(Phase::HostToDevice),
        2 * report.grid_bytes
    );
    println!(
        "**  device to host copy time = {} s ({} Bytes)",
        report.timings.seconds(Phase::DeviceToHost),
        report.grid_bytes
    );
    println!(
        "**  kernel time = {} s",
        report.timings.seconds(Phase::Kernel)
    );
    if report.timings.contains(Phase::Reference) {
        println!(
            "**  reference time = {} s",
            report.timings.seconds(Phase::Reference)
        );
    }
}

/// Run on a fresh `HostDevice`.
pub fn run(config: &Config) -> Result<RunOutput> {
    config.validate()?;
    let mut device = HostDevice::new(config.threads)?;
    run_with_device(config, &mut device)
}

/// Device buffers are released on every path, including failures.
pub fn run_with_device<D: Device>(
    config: &Config,
    device: &mut D,
) -> Result<RunOutput> {
    let layout = config.validate()?;
    let n = layout.n();

    let initial =
        GridBuffer::with_initial_condition(n, &config.initial_condition)?;
    let result = GridBuffer::new(n)?;

    info!(
        "Using device {} with {} compute units",
        device.info().name,
        device.info().compute_units
    );
    let module = device.load_module(STENCIL_MODULE)?;
    let kernel = module.function(STENCIL_KERNEL)?;

    info!("Allocating device memory");
    let buffer_a = device.alloc(initial.size_bytes())?;
    let buffer_b = match device.alloc(initial.size_bytes()) {
        Ok(buffer) => buffer,
        Err(e) => {
            if let Err(free_error) = release(device, [buffer_a]) {
                warn!("Releasing device memory failed: {}", free_error);
            }
            return Err(e);
        }
    };

    let mut pair = PingPong::new(buffer_a, buffer_b);
    let outcome = run_on_buffers(
        config, device, &kernel, &layout, &initial, result, &mut pair,
    );
    let released = release(device, pair.into_buffers());
    match (outcome, released) {
        (Ok(output), Ok(())) => Ok(output),
        (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
        (Err(e), Err(free_error)) => {
            warn!("Releasing device memory failed: {}", free_error);
            Err(e)
        }
    }
}

/// Free every buffer, the first failure is returned.
fn release<D: Device, I: IntoIterator<Item = DeviceBuffer>>(
    device: &mut D,
    buffers: I,
) -> Result<()> {
    let mut released = Ok(());
    for buffer in buffers {
        if let Err(e) = device.free(buffer) {
            if released.is_ok() {
                released = Err(e);
            }
        }
    }
    released
}

fn run_on_buffers<D: Device>(
    config: &Config,
    device: &mut D,
    kernel: &Kernel,
    layout: &TileLayout,
    initial: &GridBuffer,
    mut result: GridBuffer,
    pair: &mut PingPong<DeviceBuffer>,
) -> Result<RunOutput> {
    let n = layout.n();
    let mut timings = Timings::new();

    info!("Copy from host to device");
    timings.time(Phase::HostToDevice, || -> Result<()> {
        device.copy_htod(pair.current(), initial.buffer())?;
        device.copy_htod(pair.target(), initial.buffer())
    })?;

    let reference = if config.check {
        info!("Execute host reference calculation");
        let simulation = SimulationLoop::new(SequentialStepper, config.steps);
        Some(timings.time(Phase::Reference, || simulation.run_from(initial))?)
    } else {
        None
    };

    let launch = LaunchConfig::for_layout(layout);
    info!("Launching {} with {}", kernel.name(), launch);
    timings.time(Phase::Kernel, || -> Result<()> {
        for _ in 0..config.steps {
            profiling::scope!("time step");
            pair.step_with(|input, output| {
                let args = KernelArgs { input, output, n };
                device.launch(kernel, &launch, &args)?;
                device.synchronize()
            })?;
            profiling::finish_frame!();
        }
        Ok(())
    })?;

    info!("Copy from device to host");
    timings.time(Phase::DeviceToHost, || {
        device.copy_dtoh(result.buffer_mut(), pair.current())
    })?;

    let verification = match &reference {
        Some(reference) => {
            let verification = verify(reference, &result)?;
            println!(
                "** Verifying accelerated results with host results: error = {} %",
                verification.percent()
            );
            Some(verification)
        }
        None => None,
    };

    if config.verbose {
        if let Some(reference) = &reference {
            println!("** CPU GRID:");
            print!("{}", format_grid(reference));
        }
        println!();
        println!("** GPU GRID:");
        print!("{}", format_grid(&result));
        println!();
    }

    if let Some(fname) = &config.fname {
        info!("Writing {}", fname.display());
        write_text_file(&result, fname)?;
    }
    if let Some(image) = &config.image {
        info!("Writing {}", image.display());
        write_image(&result, image)?;
    }

    Ok(RunOutput {
        result,
        reference,
        report: RunReport {
            device_name: device.info().name.clone(),
            launch,
            grid_bytes: initial.size_bytes(),
            timings,
            verification,
        },
    })
}

/// The whole benchmark: banner, run, report and mismatch policy.
pub fn execute(config: &Config) -> Result<RunOutput> {
    print_banner(config);
    let output = run(config)?;
    print_report(&output.report);
    if let Some(verification) = &output.report.verification {
        verification.enforce(config.mismatch_policy)?;
    }
    Ok(output)
}
