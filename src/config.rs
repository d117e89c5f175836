//! Layered configuration: built-in defaults, then `./config.yaml` if it
//! exists, then `APPMETRICS_*` environment variables.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ExporterConfig {
    pub bind_address: String,
    /// Mount point of the scrape endpoint; side endpoints live below it.
    pub metrics_path: String,
    /// CPU and memory sampling period
    pub sample_interval_ms: u64,
    /// Scheduler tick probe period
    pub loop_probe_interval_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            metrics_path: "/metrics".into(),
            sample_interval_ms: 2000,
            loop_probe_interval_ms: 10,
            logging: LoggingConfig::default(),
        }
    }
}

/// LoggingConfig controls how we initialize tracing.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,  // e.g. "info", "debug", "warn"
    pub format: String, // "json" or "console"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
        }
    }
}

/// Nested keys use a double underscore, e.g. `APPMETRICS_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "APPMETRICS_";

pub fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ExporterConfig::default()))
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load_config() -> Result<ExporterConfig, figment::Error> {
    figment().extract()
}
