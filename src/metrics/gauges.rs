use super::{CpuSample, LoopSample, MemorySample};

/// Latest value of every point-in-time metric.
///
/// CPU and memory start at zero so they always render; loop stats stay
/// absent until a producer reports them.
#[derive(Debug, Default, Clone)]
pub struct GaugeCache {
    cpu: CpuSample,
    memory: MemorySample,
    event_loop: Option<LoopSample>,
}

impl GaugeCache {
    pub fn observe_cpu(&mut self, sample: CpuSample) {
        self.cpu = sample;
    }

    pub fn observe_memory(&mut self, sample: MemorySample) {
        self.memory = sample;
    }

    pub fn observe_loop(&mut self, sample: LoopSample) {
        self.event_loop = Some(sample);
    }

    pub fn cpu(&self) -> CpuSample {
        self.cpu
    }

    pub fn memory(&self) -> MemorySample {
        self.memory
    }

    pub fn event_loop(&self) -> Option<LoopSample> {
        self.event_loop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero_and_loop_absent() {
        let cache = GaugeCache::default();
        assert_eq!(cache.cpu(), CpuSample::default());
        assert_eq!(cache.memory().physical, 0);
        assert!(cache.event_loop().is_none());
    }

    #[test]
    fn observe_overwrites_whole_sample() {
        let mut cache = GaugeCache::default();
        cache.observe_cpu(CpuSample {
            process: 0.5,
            system: 0.9,
        });
        cache.observe_cpu(CpuSample {
            process: 0.1,
            system: 0.2,
        });
        assert_eq!(
            cache.cpu(),
            CpuSample {
                process: 0.1,
                system: 0.2
            }
        );
    }
}
