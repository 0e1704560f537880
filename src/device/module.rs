use crate::device::*;
use crate::error::*;
use crate::grid::*;
use crate::stencil;

/// Module holding the stencil kernel.
pub const STENCIL_MODULE: &str = "stencil-kernel";

/// Name of the five point kernel inside `STENCIL_MODULE`.
pub const STENCIL_KERNEL: &str = "stencil5p_2D";

/// Kernel body: input, output, grid side and launch geometry.
pub type KernelEntry = fn(&[Cell], &mut [Cell], usize, &LaunchConfig);

#[derive(Copy, Clone)]
pub struct Kernel {
    name: &'static str,
    entry: KernelEntry,
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel").field("name", &self.name).finish()
    }
}

impl Kernel {
    pub fn new(name: &'static str, entry: KernelEntry) -> Self {
        Kernel { name, entry }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entry(&self) -> KernelEntry {
        self.entry
    }
}

/// A named collection of kernels.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    functions: Vec<Kernel>,
}

impl Module {
    pub fn new(name: &str, functions: Vec<Kernel>) -> Self {
        Module {
            name: name.to_string(),
            functions,
        }
    }

    /// Modules every device ships with.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            STENCIL_MODULE => Some(Module::new(
                STENCIL_MODULE,
                vec![Kernel::new(STENCIL_KERNEL, stencil5p_2d)],
            )),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self, name: &str) -> Result<Kernel> {
        self.functions
            .iter()
            .find(|k| k.name == name)
            .copied()
            .ok_or_else(|| StencilError::KernelNotFound {
                module: self.name.clone(),
                function: name.to_string(),
            })
    }
}

fn stencil5p_2d(
    input: &[Cell],
    output: &mut [Cell],
    n: usize,
    config: &LaunchConfig,
) {
    stencil::par_apply_blocks(
        input,
        output,
        n,
        &config.grid_dim,
        &config.block_dim,
    );
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        let module = Module::builtin(STENCIL_MODULE).unwrap();
        assert_eq!(module.name(), STENCIL_MODULE);
        let kernel = module.function(STENCIL_KERNEL).unwrap();
        assert_eq!(kernel.name(), STENCIL_KERNEL);

        assert!(Module::builtin("stencil-kernel.ptx").is_none());
        assert!(matches!(
            module.function("stencil9p_2D"),
            Err(StencilError::KernelNotFound { .. })
        ));
    }
}
