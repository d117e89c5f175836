//! Running statistics that combine many samples of the same kind.
//!
//! [`AggregateCounter`]s are snapshot-scoped: the renderer takes them and
//! leaves empty ones behind. [`GcSummary`] accumulates for the process
//! lifetime.

use super::{GcSample, TrafficClass};

/// Request statistics for one traffic class since the last scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateCounter {
    pub total: u64,
    /// Exact running mean of durations (ms)
    pub average: f64,
    /// Largest duration seen (ms)
    pub longest: f64,
    /// URL of the first request that reached `longest`
    pub longest_key: String,
    pub last_timestamp_ms: Option<i64>,
}

impl AggregateCounter {
    pub fn record(&mut self, duration: f64, url: &str, timestamp_ms: i64) {
        self.average = incremental_mean(self.average, self.total, duration);
        self.total += 1;
        if self.total == 1 || duration > self.longest {
            self.longest = duration;
            self.longest_key = url.to_owned();
        }
        self.last_timestamp_ms = Some(timestamp_ms);
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// `(mean * n + x) / (n + 1)`, the running mean after one more value.
pub(crate) fn incremental_mean(mean: f64, n: u64, x: f64) -> f64 {
    (mean * n as f64 + x) / (n as f64 + 1.0)
}

// ─── Per-class counters ──────────────────────────────────────────

/// One [`AggregateCounter`] per [`TrafficClass`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotCounters {
    counters: [AggregateCounter; 4],
}

impl SnapshotCounters {
    pub fn record(&mut self, class: TrafficClass, duration: f64, url: &str, timestamp_ms: i64) {
        self.counters[class.index()].record(duration, url, timestamp_ms);
    }

    pub fn get(&self, class: TrafficClass) -> &AggregateCounter {
        &self.counters[class.index()]
    }

    /// Hand back the counter for `class` and start a fresh epoch.
    pub fn snapshot_and_reset(&mut self, class: TrafficClass) -> AggregateCounter {
        std::mem::take(&mut self.counters[class.index()])
    }
}

// ─── GC totals ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct GcSummary {
    /// Sum of all cycle durations (ms)
    pub duration_total: f64,
    pub max_heap_used: u64,
    pub last: Option<GcSample>,
}

impl GcSummary {
    pub fn record(&mut self, sample: GcSample) {
        self.duration_total += sample.duration;
        self.max_heap_used = self.max_heap_used.max(sample.used);
        self.last = Some(sample);
    }

    /// Share of wall time spent collecting. Zero before any uptime.
    pub fn time_ratio(&self, uptime_ms: f64) -> f64 {
        if uptime_ms > 0.0 {
            self.duration_total / uptime_ms
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn average_is_exact_mean() {
        let durations = [12.5, 3.0, 100.25, 0.0, 7.75, 41.0];
        let mut counter = AggregateCounter::default();
        for d in durations {
            counter.record(d, "/x", 1);
        }
        let mean = durations.iter().sum::<f64>() / durations.len() as f64;
        assert_eq!(counter.total, durations.len() as u64);
        assert!(approx(counter.average, mean), "{} != {}", counter.average, mean);
    }

    #[test]
    fn longest_keeps_first_url_on_ties() {
        let mut counter = AggregateCounter::default();
        counter.record(10.0, "/a", 1);
        counter.record(50.0, "/b", 2);
        counter.record(50.0, "/c", 3);
        counter.record(20.0, "/d", 4);
        assert_eq!(counter.longest, 50.0);
        assert_eq!(counter.longest_key, "/b");
        assert_eq!(counter.last_timestamp_ms, Some(4));
    }

    #[test]
    fn zero_duration_first_sample_still_sets_key() {
        let mut counter = AggregateCounter::default();
        counter.record(0.0, "/fast", 1);
        assert_eq!(counter.longest_key, "/fast");
    }

    #[test]
    fn snapshot_resets_class_only() {
        let mut counters = SnapshotCounters::default();
        counters.record(TrafficClass::Http, 100.0, "/x", 1);
        counters.record(TrafficClass::Http, 300.0, "/y", 2);
        counters.record(TrafficClass::HttpOutbound, 5.0, "http://up", 3);

        let taken = counters.snapshot_and_reset(TrafficClass::Http);
        assert_eq!(taken.total, 2);
        assert!(approx(taken.average, 200.0));
        assert!(counters.get(TrafficClass::Http).is_empty());
        assert_eq!(counters.get(TrafficClass::HttpOutbound).total, 1);

        counters.record(TrafficClass::Http, 42.0, "/z", 4);
        let after = counters.get(TrafficClass::Http);
        assert_eq!(after.total, 1);
        assert_eq!(after.average, 42.0);
        assert_eq!(after.longest, 42.0);
    }

    #[test]
    fn gc_summary_accumulates() {
        let mut gc = GcSummary::default();
        gc.record(GcSample {
            size: 1000,
            used: 800,
            duration: 2.0,
        });
        gc.record(GcSample {
            size: 1000,
            used: 300,
            duration: 3.0,
        });
        assert_eq!(gc.duration_total, 5.0);
        assert_eq!(gc.max_heap_used, 800);
        assert_eq!(gc.last.map(|s| s.used), Some(300));
        assert!(approx(gc.time_ratio(1000.0), 0.005));
        assert_eq!(gc.time_ratio(0.0), 0.0);
    }
}
