use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::aggregate::{AggregateCounter, GcSummary, SnapshotCounters};
use super::collections::{Collection, CollectionSet};
use super::exposition::{self, ScrapeState};
use super::gauges::GaugeCache;
use super::profiling::ProfilingBuffer;
use super::routes::{RouteRecord, RouteTable};
use super::{Event, TrafficClass};
use crate::error::IngestError;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe aggregation engine.
/// Producers call `record()`, the scrape handler calls `render()`.
///
/// Every component has its own lock so a CPU sample never waits on a
/// scrape walking the route table.
pub struct MetricsRegistry {
    gauges: Mutex<GaugeCache>,
    gc: Mutex<GcSummary>,
    snapshots: Mutex<SnapshotCounters>,
    routes: Mutex<RouteTable>,
    collections: Mutex<CollectionSet>,
    profiling: ProfilingBuffer,

    // Wall-clock anchors for uptime
    started: Instant,
    started_at: DateTime<Utc>,
}

// ─── MetricsRegistry impl ────────────────────────────────────────

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            gauges: Mutex::new(GaugeCache::default()),
            gc: Mutex::new(GcSummary::default()),
            snapshots: Mutex::new(SnapshotCounters::default()),
            routes: Mutex::new(RouteTable::default()),
            collections: Mutex::new(CollectionSet::default()),
            profiling: ProfilingBuffer::new(),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Validate and fold one event into the aggregate state.
    pub fn ingest(&self, event: Event) -> Result<(), IngestError> {
        event.validate()?;

        match event {
            Event::Cpu(sample) => {
                self.gauges.lock().observe_cpu(sample);
                self.collections.lock().observe_cpu(sample);
            }
            Event::Memory(sample) => {
                self.gauges.lock().observe_memory(sample);
                self.collections.lock().observe_memory(sample);
            }
            Event::Loop(sample) => self.gauges.lock().observe_loop(sample),
            Event::Gc(sample) => {
                self.gc.lock().record(sample);
                self.collections.lock().observe_gc(sample);
            }
            Event::Http { class, sample } => {
                self.snapshots.lock().record(
                    class,
                    sample.duration,
                    &sample.url,
                    sample.timestamp_ms,
                );
                if class.is_inbound() {
                    self.routes.lock().record(
                        &sample.url,
                        &sample.method,
                        sample.status_code,
                        sample.duration,
                    );
                    self.collections.lock().observe_http(&sample);
                }
            }
            Event::Profiling(sample) => self.profiling.push(sample),
        }
        Ok(())
    }

    /// Fire-and-forget variant of [`ingest`](Self::ingest) for producers
    /// that have nobody to report a rejected event to.
    pub fn record(&self, event: Event) {
        let kind = event.kind();
        if let Err(err) = self.ingest(event) {
            warn!(kind, %err, "dropping telemetry event");
        }
    }

    /// Render the exposition text and start a new snapshot epoch.
    ///
    /// Snapshot counters are swapped out before formatting, so events that
    /// arrive mid-render land in the next scrape instead of being lost.
    pub fn render(&self) -> String {
        let t0 = Instant::now();

        let gauges = self.gauges.lock().clone();
        let gc = self.gc.lock().clone();
        let snapshots: Vec<(TrafficClass, AggregateCounter)> = {
            let mut counters = self.snapshots.lock();
            TrafficClass::ALL
                .iter()
                .map(|&class| (class, counters.snapshot_and_reset(class)))
                .collect()
        };

        let routes = self.routes.lock();
        let text = exposition::render(&ScrapeState {
            uptime: self.uptime(),
            cpu: gauges.cpu(),
            memory: gauges.memory(),
            event_loop: gauges.event_loop(),
            gc: &gc,
            routes: routes.all(),
            snapshots: &snapshots,
        });
        let route_count = routes.all().len();
        drop(routes);

        debug!(
            bytes = text.len(),
            routes = route_count,
            elapsed_us = t0.elapsed().as_micros() as u64,
            "rendered scrape"
        );
        text
    }

    /// Read the snapshot counter for `class` without resetting it.
    pub fn snapshot(&self, class: TrafficClass) -> AggregateCounter {
        self.snapshots.lock().get(class).clone()
    }

    /// Copy of the all-time route table.
    pub fn routes(&self) -> Vec<RouteRecord> {
        self.routes.lock().all().to_vec()
    }

    // ─── Collections ─────────────────────────────────────────────

    /// Open a new collection and return its URI.
    pub fn create_collection(&self) -> String {
        let mut set = self.collections.lock();
        let uri = set.create(now_ms()).uri();
        debug!(%uri, "collection opened");
        uri
    }

    pub fn collection_uris(&self) -> Vec<String> {
        self.collections.lock().uris()
    }

    pub fn collection(&self, id: u64) -> Option<Collection> {
        self.collections.lock().read(id, now_ms())
    }

    pub fn reset_collection(&self, id: u64) -> bool {
        self.collections.lock().reset(id, now_ms())
    }

    pub fn delete_collection(&self, id: u64) -> bool {
        self.collections.lock().remove(id)
    }

    pub fn profiling(&self) -> &ProfilingBuffer {
        &self.profiling
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CpuSample, GcSample, HttpSample, ProfilingSample};

    fn http(class: TrafficClass, url: &str, method: &str, status: u16, ms: f64) -> Event {
        Event::Http {
            class,
            sample: HttpSample {
                url: url.into(),
                method: method.into(),
                status_code: status,
                duration: ms,
                timestamp_ms: 1_700_000_000_000,
            },
        }
    }

    #[test]
    fn end_to_end_scrape() {
        let registry = MetricsRegistry::new();
        registry.ingest(http(TrafficClass::Http, "/x", "GET", 200, 100.0)).unwrap();
        registry.ingest(http(TrafficClass::Http, "/x", "GET", 200, 300.0)).unwrap();
        registry.ingest(http(TrafficClass::Http, "/y", "GET", 404, 50.0)).unwrap();

        let text = registry.render();
        assert!(text.contains("http_requests_alltime_total{handler=\"/x\",method=\"get\"} 2\n"));
        assert!(text.contains(
            "http_requests_alltime_duration_average_microseconds{handler=\"/x\",method=\"get\"} 200000\n"
        ));
        assert!(text.contains("http_requests_alltime_total{handler=\"/y\",method=\"get\"} 1\n"));
        assert!(text.contains("http_requests_total{code=\"404\",handler=\"/y\",method=\"get\"} 1\n"));
        assert!(text.contains("http_requests_snapshot_total 3\n"));
        assert!(text.contains("http_requests_duration_max_microseconds{handler=\"/x\"} 300000\n"));
    }

    #[test]
    fn second_render_drops_snapshot_but_keeps_alltime() {
        let registry = MetricsRegistry::new();
        registry.ingest(http(TrafficClass::Http, "/x", "GET", 200, 10.0)).unwrap();
        registry.ingest(http(TrafficClass::HttpOutbound, "http://db", "GET", 200, 4.0)).unwrap();

        let first = registry.render();
        assert!(first.contains("http_requests_snapshot_total 1\n"));
        assert!(first.contains("http_outbound_requests_snapshot_total 1\n"));

        let second = registry.render();
        assert!(!second.contains("_requests_snapshot_total"));
        assert!(second.contains("http_requests_alltime_total{handler=\"/x\",method=\"get\"} 1\n"));

        let routes = registry.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].hits, 1);
        assert_eq!(routes[0].average_duration, 10.0);
    }

    #[test]
    fn outbound_traffic_skips_route_table() {
        let registry = MetricsRegistry::new();
        registry.ingest(http(TrafficClass::HttpsOutbound, "https://api", "POST", 201, 9.0)).unwrap();
        assert!(registry.routes().is_empty());
        assert_eq!(registry.snapshot(TrafficClass::HttpsOutbound).total, 1);
    }

    #[test]
    fn https_inbound_shares_route_table() {
        let registry = MetricsRegistry::new();
        registry.ingest(http(TrafficClass::Http, "/a", "GET", 200, 1.0)).unwrap();
        registry.ingest(http(TrafficClass::Https, "/a", "GET", 200, 3.0)).unwrap();
        let routes = registry.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].hits, 2);
        assert_eq!(registry.snapshot(TrafficClass::Http).total, 1);
        assert_eq!(registry.snapshot(TrafficClass::Https).total, 1);
    }

    #[test]
    fn snapshot_restarts_after_render() {
        let registry = MetricsRegistry::new();
        registry.ingest(http(TrafficClass::Http, "/x", "GET", 200, 80.0)).unwrap();
        registry.render();
        registry.ingest(http(TrafficClass::Http, "/x", "GET", 200, 20.0)).unwrap();
        let counter = registry.snapshot(TrafficClass::Http);
        assert_eq!(counter.total, 1);
        assert_eq!(counter.average, 20.0);
    }

    #[test]
    fn rejected_event_leaves_state_untouched() {
        let registry = MetricsRegistry::new();
        let err = registry
            .ingest(http(TrafficClass::Http, "/x", "GET", 200, -3.0))
            .unwrap_err();
        assert!(matches!(err, IngestError::NegativeDuration { .. }));
        assert!(registry.routes().is_empty());
        assert!(registry.snapshot(TrafficClass::Http).is_empty());

        registry.record(Event::Gc(GcSample {
            size: 1,
            used: 1,
            duration: f64::INFINITY,
        }));
        assert!(!registry.render().contains("gc_cycle_duration_total_milliseconds"));
    }

    #[test]
    fn empty_registry_renders_gauges_only() {
        let registry = MetricsRegistry::new();
        let text = registry.render();
        assert!(text.contains("os_cpu_used_ratio 0\n"));
        assert!(text.contains("process_resident_memory_bytes 0\n"));
        assert!(text.contains("process_uptime_count_seconds "));
        assert!(!text.contains("http_request"));
        assert!(!text.contains("event_loop_tick"));
        assert!(!text.contains("heap_size_bytes"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn cpu_gauge_tracks_latest() {
        let registry = MetricsRegistry::new();
        registry.record(Event::Cpu(CpuSample {
            process: 0.25,
            system: 0.5,
        }));
        let text = registry.render();
        assert!(text.contains("process_cpu_used_ratio 0.25\n"));
        assert!(text.contains("os_cpu_used_ratio 0.5\n"));
    }

    #[test]
    fn collections_see_inbound_traffic_only() {
        let registry = MetricsRegistry::new();
        registry.ingest(http(TrafficClass::Http, "/early", "GET", 200, 1.0)).unwrap();
        assert_eq!(registry.create_collection(), "collections/1");

        registry.ingest(http(TrafficClass::Https, "/a", "GET", 200, 4.0)).unwrap();
        registry.ingest(http(TrafficClass::HttpOutbound, "http://db", "GET", 200, 9.0)).unwrap();
        registry.record(Event::Cpu(CpuSample {
            process: 0.5,
            system: 0.25,
        }));

        let c = registry.collection(1).unwrap();
        assert_eq!(c.http_urls.len(), 1);
        assert_eq!(c.http_urls[0].url, "/a");
        assert_eq!(c.cpu.process_peak, 0.5);

        // Scraping leaves collections alone
        registry.render();
        assert_eq!(registry.collection(1).unwrap().http_urls[0].hits, 1);

        assert!(registry.reset_collection(1));
        assert!(registry.collection(1).unwrap().http_urls.is_empty());
        assert!(registry.delete_collection(1));
        assert!(registry.collection_uris().is_empty());
    }

    #[test]
    fn profiling_events_route_to_buffer() {
        let registry = MetricsRegistry::new();
        let sample = ProfilingSample {
            timestamp_ms: 1,
            payload: serde_json::json!([]),
        };
        registry.record(Event::Profiling(sample.clone()));
        assert!(registry.profiling().drain().is_empty());

        registry.profiling().set_enabled(true);
        registry.record(Event::Profiling(sample));
        assert_eq!(registry.profiling().drain().len(), 1);
    }
}
