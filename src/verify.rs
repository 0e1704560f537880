use crate::error::*;
use crate::grid::*;

/// What to do when the accelerated result disagrees with the reference.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MismatchPolicy {
    /// Report the disagreement and carry on
    #[default]
    Warn,

    /// Turn any disagreement into an error
    Fail,
}

/// Disagreement between a reference and an accelerated grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Verification {
    /// Fraction of differing cells, in `[0, 1]`.
    pub fraction: f64,
}

impl Verification {
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }

    pub fn is_exact(&self) -> bool {
        self.fraction == 0.0
    }

    pub fn enforce(&self, policy: MismatchPolicy) -> Result<()> {
        match policy {
            MismatchPolicy::Fail if !self.is_exact() => {
                Err(StencilError::VerificationFailed {
                    percent: self.percent(),
                })
            }
            _ => Ok(()),
        }
    }
}

pub fn verify(
    reference: &GridBuffer,
    accelerated: &GridBuffer,
) -> Result<Verification> {
    profiling::scope!("verify");
    let fraction = reference.relative_difference(accelerated)?;
    if fraction > 0.0 {
        tracing::warn!(
            percent = fraction * 100.0,
            "accelerated result differs from reference"
        );
    }
    Ok(Verification { fraction })
}
