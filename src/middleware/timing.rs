use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::metrics::{Event, HttpSample, TrafficClass};
use crate::AppState;

/// Tower-compatible middleware that turns every served request into an
/// `http` (or `https`) event and adds two response headers:
///
///   X-Response-Time-Us  — total handler wall time in microseconds
///   Server-Timing       — same value in the standard Server-Timing format
///
/// Requests to the exporter's own endpoints are timed but not recorded.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    let class = inbound_class(&req);

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing =
        format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    let status = response.status().as_u16();
    debug!(status, %method, %path, us = us as u64, "request served");

    if is_exporter_path(&path, &state.config.metrics_path) {
        return response;
    }

    state.metrics.record(Event::Http {
        class,
        sample: HttpSample {
            url: path,
            method,
            status_code: status,
            duration: elapsed.as_secs_f64() * 1000.0,
            timestamp_ms: Utc::now().timestamp_millis(),
        },
    });

    response
}

/// Servers only see origin-form URIs, so TLS is known from a terminating
/// proxy's `X-Forwarded-Proto` (first hop wins) or an absolute-form URI.
fn inbound_class(req: &Request) -> TrafficClass {
    let forwarded = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let scheme = forwarded.or_else(|| req.uri().scheme_str());

    match scheme {
        Some(s) if s.eq_ignore_ascii_case("https") => TrafficClass::Https,
        _ => TrafficClass::Http,
    }
}

/// The scrape path itself or anything mounted below it. A trailing `/` on
/// the configured path is ignored, matching how the routes are mounted.
fn is_exporter_path(path: &str, metrics_path: &str) -> bool {
    let base = metrics_path.trim_end_matches('/');
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_paths() {
        assert!(is_exporter_path("/metrics", "/metrics"));
        assert!(is_exporter_path("/metrics/profiling/on", "/metrics"));
        assert!(!is_exporter_path("/metricsfoo", "/metrics"));
        assert!(!is_exporter_path("/api/metrics", "/metrics"));
    }

    #[test]
    fn trailing_slash_in_config_is_ignored() {
        assert!(is_exporter_path("/metrics", "/metrics/"));
        assert!(is_exporter_path("/metrics/collections/1", "/metrics/"));
        assert!(!is_exporter_path("/metricsfoo", "/metrics/"));
        // Mounted at the root: everything belongs to the exporter
        assert!(is_exporter_path("/anything", "/"));
    }

    fn with_header(proto: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/a");
        if let Some(p) = proto {
            builder = builder.header("x-forwarded-proto", p);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[test]
    fn forwarded_proto_selects_class() {
        assert_eq!(inbound_class(&with_header(None)), TrafficClass::Http);
        assert_eq!(inbound_class(&with_header(Some("http"))), TrafficClass::Http);
        assert_eq!(inbound_class(&with_header(Some("HTTPS"))), TrafficClass::Https);
        assert_eq!(inbound_class(&with_header(Some("https, http"))), TrafficClass::Https);
    }
}
