use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use sysinfo::{System, SystemExt};

use crate::AppState;

/// Static facts about the host and this process.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    pub exporter_version: &'static str,
    pub pid: u32,
    pub command_line: Vec<String>,
    pub os: &'static str,
    pub arch: &'static str,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub hostname: Option<String>,
    pub available_parallelism: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

// ─── GET /metrics/environment ────────────────────────────────────

pub async fn get_environment(State(state): State<Arc<AppState>>) -> Json<EnvironmentInfo> {
    // No refresh needed: only static host identifiers are read.
    let sys = System::new();

    Json(EnvironmentInfo {
        exporter_version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
        command_line: std::env::args().collect(),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        os_name: sys.name(),
        os_version: sys.os_version(),
        kernel_version: sys.kernel_version(),
        hostname: sys.host_name(),
        available_parallelism: std::thread::available_parallelism()
            .ok()
            .map(|n| n.get()),
        started_at: state.metrics.started_at(),
        uptime_secs: state.metrics.uptime().as_secs(),
    })
}
