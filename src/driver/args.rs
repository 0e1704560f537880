use crate::driver::Config;
use crate::grid::*;
use crate::verify::MismatchPolicy;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

/// Five point stencil benchmark, tiled accelerator against a sequential
/// host reference.
///
/// The kernel stencil5p_2D is resolved from the module stencil-kernel.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of grid points along one side of the square grid,
    /// N*N points in total.
    #[arg(short = 'N', default_value = "1024")]
    pub n: usize,

    /// Time steps to calculate the stencil.
    #[arg(short = 'T', default_value = "10")]
    pub steps: usize,

    /// Verify the accelerated results with the host calculation
    /// and report the error rate. Also accepted as -check.
    #[arg(long)]
    pub check: bool,

    /// Print the grids after the calculation.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Also place a heat source at the bottom of the grid.
    #[arg(short = 'b', long)]
    pub bottom_source: bool,

    /// Where the bottom heat source is mirrored to.
    #[arg(long, value_enum, default_value_t = BottomMirror::Linear)]
    pub bottom_mirror: BottomMirror,

    /// Write the grid of the last time step to this file, one row per line.
    /// Also accepted as -fname.
    #[arg(long)]
    pub fname: Option<PathBuf>,

    /// Render the grid of the last time step as a PNG image.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Side length of the square tiles, N must be a multiple of it.
    #[arg(long, default_value = "32")]
    pub tile_size: usize,

    /// The number of device threads, 0 uses one per core.
    #[arg(long, default_value = "0")]
    pub threads: usize,

    /// Exit with an error when the verification finds any mismatch.
    #[arg(long, requires = "check")]
    pub fail_on_mismatch: bool,

    /// Print build information and quit
    #[arg(long)]
    pub build_info: bool,
}

/// Flags followed by a value.
const VALUE_FLAGS: &[&str] = &[
    "-N",
    "-T",
    "--fname",
    "--image",
    "--tile-size",
    "--threads",
    "--bottom-mirror",
];

/// Flags without a value.
const SWITCH_FLAGS: &[&str] = &[
    "--check",
    "-v",
    "--verbose",
    "-b",
    "--bottom-source",
    "--fail-on-mismatch",
    "--build-info",
    "-h",
    "--help",
    "-V",
    "--version",
];

/// Single dash spellings accepted for compatibility.
fn legacy_alias(token: String) -> String {
    match token.as_str() {
        "-check" => "--check".to_string(),
        "-fname" => "--fname".to_string(),
        _ => token,
    }
}

/// Short spellings of long switches, so repeats are caught across both.
const SHORT_SWITCHES: &[(&str, &str)] = &[
    ("-v", "--verbose"),
    ("-b", "--bottom-source"),
    ("-h", "--help"),
    ("-V", "--version"),
];

fn canonical(flag: &str) -> &str {
    SHORT_SWITCHES
        .iter()
        .find(|(short, _)| *short == flag)
        .map_or(flag, |(_, long)| *long)
}

/// Rewrite legacy flags into their clap form and drop anything
/// unrecognized. The first element is the program name and is kept.
/// A value flag always takes the next token as its value.
///
/// Help anywhere on the line wins over everything else, and for a
/// repeated flag only the first occurrence counts.
pub fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    let mut iter = args.into_iter();
    let mut result: Vec<String> = iter.next().into_iter().collect();
    let tokens: Vec<String> = iter.map(legacy_alias).collect();
    if tokens.iter().any(|t| t == "-h" || t == "--help") {
        result.push("--help".to_string());
        return result;
    }

    let mut seen: Vec<String> = Vec::new();
    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        let inline_value = token.starts_with("--") && token.contains('=');
        let flag = canonical(token.split('=').next().unwrap_or_default());
        let repeated = seen.iter().any(|s| s == flag);
        if VALUE_FLAGS.contains(&flag) {
            let value = if inline_value { None } else { tokens.next() };
            if repeated {
                debug!("Ignoring repeated {}", flag);
                continue;
            }
            seen.push(flag.to_string());
            result.push(token);
            result.extend(value);
        } else if SWITCH_FLAGS.contains(&token.as_str()) {
            if repeated {
                debug!("Ignoring repeated {}", flag);
                continue;
            }
            seen.push(flag.to_string());
            result.push(token);
        } else {
            debug!("Ignoring argument {}", token);
        }
    }
    result
}

impl Args {
    /// Parse a full argument list, program name first.
    pub fn parse_legacy<I: IntoIterator<Item = String>>(
        args: I,
    ) -> Result<Self, clap::Error> {
        Args::try_parse_from(normalize_args(args))
    }

    pub fn initial_condition(&self) -> InitialCondition {
        InitialCondition {
            bottom_source: self.bottom_source,
            bottom_mirror: self.bottom_mirror,
        }
    }

    pub fn mismatch_policy(&self) -> MismatchPolicy {
        if self.fail_on_mismatch {
            MismatchPolicy::Fail
        } else {
            MismatchPolicy::Warn
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let initial_condition = args.initial_condition();
        let mismatch_policy = args.mismatch_policy();
        let non_empty = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());
        Config {
            n: args.n,
            steps: args.steps,
            check: args.check,
            verbose: args.verbose,
            initial_condition,
            fname: non_empty(args.fname),
            image: non_empty(args.image),
            tile_size: args.tile_size,
            threads: args.threads,
            mismatch_policy,
        }
    }
}
