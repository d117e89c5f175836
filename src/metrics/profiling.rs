use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::ProfilingSample;

/// How many profiling samples we hold between fetches
const MAX_PROFILING_SAMPLES: usize = 1000;

/// Opt-in buffer for profiling samples pushed by an external profiler.
/// Samples arriving while disabled are discarded.
pub struct ProfilingBuffer {
    enabled: AtomicBool,
    samples: Mutex<VecDeque<ProfilingSample>>,
}

impl ProfilingBuffer {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turning profiling off also drops anything still buffered.
    ///
    /// The flag only changes under the sample lock, so a concurrent `push`
    /// either lands before the clear or sees the buffer disabled.
    pub fn set_enabled(&self, enabled: bool) {
        let mut samples = self.samples.lock();
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            samples.clear();
        }
    }

    pub fn push(&self, sample: ProfilingSample) {
        let mut samples = self.samples.lock();
        if !self.is_enabled() {
            return;
        }
        samples.push_back(sample);
        if samples.len() > MAX_PROFILING_SAMPLES {
            samples.pop_front();
        }
    }

    /// Take everything buffered so far, oldest first.
    pub fn drain(&self) -> Vec<ProfilingSample> {
        self.samples.lock().drain(..).collect()
    }
}

impl Default for ProfilingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
