//! Time stepping with two buffers that trade source and destination roles.

use crate::error::*;
use crate::grid::*;
use crate::stencil::*;

/// Two buffers of the same shape, one of them holds the latest state.
/// Works for host grids as well as device buffer handles.
#[derive(Debug)]
pub struct PingPong<B> {
    buffers: [B; 2],
    current: usize,
}

impl<B> PingPong<B> {
    /// `current` holds the starting state, `target` is written first.
    pub fn new(current: B, target: B) -> Self {
        PingPong {
            buffers: [current, target],
            current: 0,
        }
    }

    /// Index of the buffer holding the latest state,
    /// 0 being the one passed as `current` to `new`.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &B {
        &self.buffers[self.current]
    }

    pub fn target(&self) -> &B {
        &self.buffers[1 - self.current]
    }

    /// Borrow the current buffer for reading and the other for writing.
    pub fn split(&mut self) -> (&B, &mut B) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Run `f(current, target)` and make the target current if it succeeds.
    /// On failure the roles are left unchanged.
    pub fn step_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&B, &mut B) -> Result<()>,
    {
        let (input, output) = self.split();
        f(input, output)?;
        self.swap();
        Ok(())
    }

    pub fn into_current(self) -> B {
        let [a, b] = self.buffers;
        if self.current == 0 {
            a
        } else {
            b
        }
    }

    /// Both buffers, in the order they were passed to `new`.
    pub fn into_buffers(self) -> [B; 2] {
        self.buffers
    }
}

impl PingPong<GridBuffer> {
    /// Both buffers start as copies of `initial`, so boundary cells are
    /// correct in whichever buffer ends up current.
    pub fn from_initial(initial: &GridBuffer) -> Result<Self> {
        Ok(PingPong::new(initial.try_clone()?, initial.try_clone()?))
    }
}

/// Index the latest state lands in after `steps` steps.
pub fn final_index(steps: usize) -> usize {
    steps % 2
}

/// Applies a stepper a fixed number of times.
pub struct SimulationLoop<StepperType: StencilStepper> {
    stepper: StepperType,
    steps: usize,
}

impl<StepperType: StencilStepper> SimulationLoop<StepperType> {
    pub fn new(stepper: StepperType, steps: usize) -> Self {
        SimulationLoop { stepper, steps }
    }

    /// Advance `pair` by `steps` steps. Each step completes before the
    /// next one starts reading.
    pub fn run(&self, pair: &mut PingPong<GridBuffer>) -> Result<()> {
        profiling::scope!("simulation_loop");
        for t in 0..self.steps {
            tracing::trace!(stepper = self.stepper.name(), t, "step");
            pair.step_with(|input, output| self.stepper.step(input, output))?;
        }
        Ok(())
    }

    /// Run from a copy of `initial` and return the final state.
    pub fn run_from(&self, initial: &GridBuffer) -> Result<GridBuffer> {
        let mut pair = PingPong::from_initial(initial)?;
        self.run(&mut pair)?;
        debug_assert_eq!(pair.current_index(), final_index(self.steps));
        Ok(pair.into_current())
    }
}
