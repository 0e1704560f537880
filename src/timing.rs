use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Parts of a run that get their own wall clock measurement.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Phase {
    HostToDevice,
    Reference,
    Kernel,
    DeviceToHost,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::HostToDevice => "host to device copy",
            Phase::Reference => "reference",
            Phase::Kernel => "kernel",
            Phase::DeviceToHost => "device to host copy",
        };
        write!(f, "{}", name)
    }
}

/// Accumulated wall clock time per phase.
#[derive(Clone, Debug, Default)]
pub struct Timings {
    elapsed: BTreeMap<Phase, Duration>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` and add its duration to `phase`.
    pub fn time<T, F: FnOnce() -> T>(&mut self, phase: Phase, f: F) -> T {
        let begin = Instant::now();
        let result = f();
        self.add(phase, begin.elapsed());
        result
    }

    pub fn add(&mut self, phase: Phase, duration: Duration) {
        *self.elapsed.entry(phase).or_default() += duration;
    }

    /// Zero for phases that never ran.
    pub fn get(&self, phase: Phase) -> Duration {
        self.elapsed.get(&phase).copied().unwrap_or_default()
    }

    pub fn seconds(&self, phase: Phase) -> f64 {
        self.get(phase).as_secs_f64()
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.elapsed.contains_key(&phase)
    }
}
