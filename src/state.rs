use std::sync::Arc;

use crate::config::ExporterConfig;
use crate::metrics::MetricsRegistry;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Aggregation engine: sampler and middleware push events, scrapes render.
    pub metrics: Arc<MetricsRegistry>,

    pub config: Arc<ExporterConfig>,
}
