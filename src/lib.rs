//! In-process Prometheus exporter.
//!
//! Telemetry producers push [`metrics::Event`]s into a shared
//! [`metrics::MetricsRegistry`]; a scrape renders the aggregate state as
//! Prometheus text and closes the current snapshot epoch.
//!
//! ```text
//! sampler ──┐
//!           ├─► MetricsRegistry::ingest ─► gauges / snapshot counters / routes
//! timing ───┘            │                       │
//!                        └─► open collections    │
//!                      GET /metrics ◄── render ◄─┘ (resets snapshot counters)
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod sampler;
pub mod server;
pub mod state;

pub use state::AppState;
