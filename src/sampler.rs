//! Built-in telemetry producer for the hosting process.
//!
//! Samples host/process CPU and memory through `sysinfo`, and measures how
//! late the tokio scheduler fires a fast periodic timer. That lateness is
//! reported as `loop` tick statistics, one window per sampling period.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::{CpuExt, Pid, ProcessExt, System, SystemExt};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::config::ExporterConfig;
use crate::metrics::{CpuSample, Event, LoopSample, MemorySample, MetricsRegistry};

// ─── Public entry point ──────────────────────────────────────────

pub struct Sampler {
    metrics: Arc<MetricsRegistry>,
    sample_every: Duration,
    probe_every: Duration,
}

impl Sampler {
    pub fn new(metrics: Arc<MetricsRegistry>, config: &ExporterConfig) -> Self {
        Self {
            metrics,
            sample_every: Duration::from_millis(config.sample_interval_ms.max(1)),
            probe_every: Duration::from_millis(config.loop_probe_interval_ms.max(1)),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!(
            sample_ms = self.sample_every.as_millis() as u64,
            probe_ms = self.probe_every.as_millis() as u64,
            "telemetry sampler started"
        );

        let mut samples = IntervalStream::new(interval(self.sample_every));
        let mut probe = interval(self.probe_every);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut host = HostProbe::new();
        let mut window = TickWindow::default();

        loop {
            tokio::select! {
                scheduled = probe.tick() => {
                    window.observe(scheduled.elapsed().as_secs_f64() * 1000.0);
                }
                tick = samples.next() => {
                    if tick.is_none() {
                        break;
                    }
                    let (cpu, memory) = host.sample();
                    self.metrics.record(Event::Cpu(cpu));
                    self.metrics.record(Event::Memory(memory));
                    if let Some(lp) = window.take(cpu.process) {
                        self.metrics.record(Event::Loop(lp));
                    }
                }
            }
        }
    }
}

// ─── Host / process probe ────────────────────────────────────────

struct HostProbe {
    sys: System,
    pid: Option<Pid>,
}

impl HostProbe {
    fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                warn!(%err, "process statistics unavailable");
                None
            }
        };
        Self {
            sys: System::new(),
            pid,
        }
    }

    fn sample(&mut self) -> (CpuSample, MemorySample) {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();

        let cores = self.sys.cpus().len().max(1) as f64;
        let mut cpu = CpuSample {
            process: 0.0,
            system: percent_to_ratio(self.sys.global_cpu_info().cpu_usage() as f64, 1.0),
        };
        let mut memory = MemorySample {
            physical_total: self.sys.total_memory(),
            physical_used: self.sys.used_memory(),
            physical_free: self.sys.free_memory(),
            ..MemorySample::default()
        };

        if let Some(pid) = self.pid {
            if self.sys.refresh_process(pid) {
                if let Some(process) = self.sys.process(pid) {
                    cpu.process = percent_to_ratio(process.cpu_usage() as f64, cores);
                    memory.physical = process.memory();
                    // sysinfo has no private/shared split; resident is the closest.
                    memory.private = process.memory();
                    memory.virtual_bytes = process.virtual_memory();
                }
            }
        }

        (cpu, memory)
    }
}

/// sysinfo reports per-core percentages; a busy process can exceed 100.
fn percent_to_ratio(percent: f64, cores: f64) -> f64 {
    if !percent.is_finite() {
        return 0.0;
    }
    (percent / 100.0 / cores).clamp(0.0, 1.0)
}

// ─── Scheduler lag window ────────────────────────────────────────

/// Running min/max/mean of timer lateness (ms) since the last `take`.
#[derive(Debug, Default)]
struct TickWindow {
    minimum: f64,
    maximum: f64,
    sum: f64,
    count: u64,
}

impl TickWindow {
    fn observe(&mut self, lag_ms: f64) {
        if self.count == 0 {
            self.minimum = lag_ms;
            self.maximum = lag_ms;
        } else {
            self.minimum = self.minimum.min(lag_ms);
            self.maximum = self.maximum.max(lag_ms);
        }
        self.sum += lag_ms;
        self.count += 1;
    }

    /// Close the window. `cpu_ratio` is attributed to user time since
    /// sysinfo does not split user and kernel CPU.
    fn take(&mut self, cpu_ratio: f64) -> Option<LoopSample> {
        let w = std::mem::take(self);
        if w.count == 0 {
            return None;
        }
        Some(LoopSample {
            minimum: w.minimum,
            maximum: w.maximum,
            average: w.sum / w.count as f64,
            count: w.count,
            cpu_user: cpu_ratio,
            cpu_system: 0.0,
        })
    }
}
