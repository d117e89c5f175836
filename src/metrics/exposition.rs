//! Prometheus text exposition (format 0.0.4).
//!
//! Pure formatting over a [`ScrapeState`]; resetting snapshot counters is
//! the registry's job. Groups with no backing data produce no lines at all.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::time::Duration;

use super::aggregate::{AggregateCounter, GcSummary};
use super::percentiles::QuantileSummary;
use super::routes::RouteRecord;
use super::{CpuSample, LoopSample, MemorySample, TrafficClass};

/// Incoming durations are milliseconds; `_microseconds` families scale up.
const MS_TO_US: f64 = 1000.0;

/// Everything one scrape needs, borrowed from the registry.
pub struct ScrapeState<'a> {
    pub uptime: Duration,
    pub cpu: CpuSample,
    pub memory: MemorySample,
    pub event_loop: Option<LoopSample>,
    pub gc: &'a GcSummary,
    pub routes: &'a [RouteRecord],
    pub snapshots: &'a [(TrafficClass, AggregateCounter)],
}

pub fn render(state: &ScrapeState<'_>) -> String {
    let mut out = String::with_capacity(4096 + state.routes.len() * 1024);

    render_cpu(&mut out, state.cpu);
    render_memory(&mut out, state.memory);

    family(
        &mut out,
        "process_uptime_count_seconds",
        "Process uptime in seconds.",
        "counter",
    );
    line(&mut out, "process_uptime_count_seconds", &[], state.uptime.as_secs());

    if let Some(lp) = state.event_loop {
        render_loop(&mut out, lp);
    }
    if state.gc.last.is_some() {
        render_gc(&mut out, state.gc, state.uptime);
    }
    if !state.routes.is_empty() {
        render_route_totals(&mut out, state.routes);
        render_route_summaries(&mut out, state.routes);
    }
    for (class, counter) in state.snapshots {
        if !counter.is_empty() {
            render_snapshot(&mut out, *class, counter);
        }
    }
    if !state.routes.is_empty() {
        render_alltime(&mut out, state.routes);
    }

    out
}

// ─── Gauge groups ────────────────────────────────────────────────

fn render_cpu(out: &mut String, cpu: CpuSample) {
    family(out, "os_cpu_used_ratio", "The ratio of the system's CPU that is currently used (values are 0-1).", "gauge");
    line(out, "os_cpu_used_ratio", &[], float(cpu.system));
    family(out, "process_cpu_used_ratio", "The ratio of the process CPU that is currently used (values are 0-1).", "gauge");
    line(out, "process_cpu_used_ratio", &[], float(cpu.process));
}

fn render_memory(out: &mut String, mem: MemorySample) {
    let gauges = [
        ("os_resident_memory_bytes", "OS memory size in bytes.", mem.physical_total),
        ("os_resident_memory_bytes_used", "OS memory used in bytes.", mem.physical_used),
        ("os_resident_memory_bytes_free", "OS memory free in bytes.", mem.physical_free),
        ("process_resident_memory_bytes", "Resident memory size in bytes.", mem.physical),
        ("process_virtual_memory_bytes", "Virtual memory size in bytes.", mem.virtual_bytes),
        ("process_private_memory_bytes", "Private memory size in bytes.", mem.private),
    ];
    for (name, help, value) in gauges {
        family(out, name, help, "gauge");
        line(out, name, &[], value);
    }
}

fn render_loop(out: &mut String, lp: LoopSample) {
    let gauges = [
        ("event_loop_tick_min_milliseconds", "Minimum scheduler tick time in the last interval.", float(lp.minimum)),
        ("event_loop_tick_max_milliseconds", "Maximum scheduler tick time in the last interval.", float(lp.maximum)),
        ("event_loop_tick_average_milliseconds", "Average scheduler tick time in the last interval.", float(lp.average)),
        ("event_loop_tick_count", "Number of scheduler ticks in the last interval.", lp.count.to_string()),
        ("event_loop_cpu_user", "User CPU ratio used by the scheduler in the last interval.", float(lp.cpu_user)),
        ("event_loop_cpu_system", "System CPU ratio used by the scheduler in the last interval.", float(lp.cpu_system)),
    ];
    for (name, help, value) in gauges {
        family(out, name, help, "gauge");
        line(out, name, &[], value);
    }
}

fn render_gc(out: &mut String, gc: &GcSummary, uptime: Duration) {
    let Some(last) = gc.last else {
        return;
    };

    family(out, "heap_size_bytes", "Heap size in bytes after the last GC cycle.", "gauge");
    line(out, "heap_size_bytes", &[], last.size);
    family(out, "heap_memory_used_bytes", "Heap memory used in bytes after the last GC cycle.", "gauge");
    line(out, "heap_memory_used_bytes", &[], last.used);
    family(out, "heap_memory_used_max_bytes", "Maximum heap memory used in bytes after any GC cycle.", "gauge");
    line(out, "heap_memory_used_max_bytes", &[], gc.max_heap_used);
    family(out, "gc_cycle_duration_milliseconds", "Duration of the last GC cycle in milliseconds.", "gauge");
    line(out, "gc_cycle_duration_milliseconds", &[], float(last.duration));
    family(out, "gc_cycle_duration_total_milliseconds", "Total time spent in GC in milliseconds.", "counter");
    line(out, "gc_cycle_duration_total_milliseconds", &[], float(gc.duration_total));
    family(out, "gc_cycle_time_ratio", "Ratio of process uptime spent in GC.", "gauge");
    line(
        out,
        "gc_cycle_time_ratio",
        &[],
        float(gc.time_ratio(uptime.as_secs_f64() * 1000.0)),
    );
}

// ─── Route groups ────────────────────────────────────────────────

fn render_route_totals(out: &mut String, routes: &[RouteRecord]) {
    family(out, "http_requests_total", "Total number of HTTP requests made.", "counter");
    for r in routes {
        let code = r.status_code.to_string();
        let method = r.method.to_lowercase();
        line(
            out,
            "http_requests_total",
            &[("code", code.as_str()), ("handler", r.url.as_str()), ("method", method.as_str())],
            r.hits,
        );
    }
}

fn render_route_summaries(out: &mut String, routes: &[RouteRecord]) {
    const NAME: &str = "http_request_duration_microseconds";

    family(out, NAME, "The HTTP request latencies in microseconds.", "summary");
    for r in merge_routes(routes, |r| r.url.as_str()) {
        // Scale before ranking; multiplication keeps the order.
        let scaled: Vec<f64> = r.duration_samples.iter().map(|d| d * MS_TO_US).collect();
        let Some(summary) = QuantileSummary::from_sorted(&scaled) else {
            continue;
        };
        for (q, value) in &summary.quantiles {
            let q = q.to_string();
            line(out, NAME, &[("handler", r.url), ("quantile", q.as_str())], float(*value));
        }
        line(out, "http_request_duration_microseconds_sum", &[("handler", r.url)], float(summary.sum));
        line(out, "http_request_duration_microseconds_count", &[("handler", r.url)], summary.count);
    }
}

fn render_alltime(out: &mut String, routes: &[RouteRecord]) {
    let merged = merge_routes(routes, |r| (r.url.as_str(), r.method.to_lowercase()));

    family(out, "http_requests_alltime_total", "Total number of requests to each handler since process start.", "counter");
    for r in &merged {
        line(out, "http_requests_alltime_total", &[("handler", r.url), ("method", r.method.as_str())], r.hits);
    }

    family(out, "http_requests_alltime_duration_average_microseconds", "Average request duration per handler since process start.", "gauge");
    for r in &merged {
        line(
            out,
            "http_requests_alltime_duration_average_microseconds",
            &[("handler", r.url), ("method", r.method.as_str())],
            float(r.average_duration * MS_TO_US),
        );
    }

    family(out, "http_requests_alltime_duration_max_microseconds", "Longest request duration per handler since process start.", "gauge");
    for r in &merged {
        line(
            out,
            "http_requests_alltime_duration_max_microseconds",
            &[("handler", r.url), ("method", r.method.as_str())],
            float(r.longest_duration * MS_TO_US),
        );
    }
}

/// Route records folded onto one label set.
struct MergedRoute<'a> {
    url: &'a str,
    /// Lowercased for labels
    method: String,
    hits: u64,
    average_duration: f64,
    longest_duration: f64,
    /// Ascending
    duration_samples: Vec<f64>,
}

/// Records are kept per `(url, status)` but most families carry no `code`
/// label. Fold records sharing `key` so every label set is emitted once:
/// hits add up, the mean is hit-weighted, the max is the max of maxima and
/// sample lists are combined. First-seen order is kept.
fn merge_routes<'a, K: PartialEq>(
    routes: &'a [RouteRecord],
    key: impl Fn(&'a RouteRecord) -> K,
) -> Vec<MergedRoute<'a>> {
    let mut keys: Vec<K> = Vec::new();
    let mut merged: Vec<MergedRoute<'a>> = Vec::new();

    for r in routes {
        let k = key(r);
        match keys.iter().position(|seen| *seen == k) {
            Some(i) => {
                let m = &mut merged[i];
                let hits = m.hits + r.hits;
                m.average_duration = (m.average_duration * m.hits as f64
                    + r.average_duration * r.hits as f64)
                    / hits as f64;
                m.hits = hits;
                m.longest_duration = m.longest_duration.max(r.longest_duration);
                m.duration_samples.extend_from_slice(&r.duration_samples);
            }
            None => {
                keys.push(k);
                merged.push(MergedRoute {
                    url: r.url.as_str(),
                    method: r.method.to_lowercase(),
                    hits: r.hits,
                    average_duration: r.average_duration,
                    longest_duration: r.longest_duration,
                    duration_samples: r.duration_samples.clone(),
                });
            }
        }
    }

    // Each input list is sorted; only merged groups need it again.
    for m in &mut merged {
        m.duration_samples.sort_by(f64::total_cmp);
    }
    merged
}

// ─── Snapshot group ──────────────────────────────────────────────

fn render_snapshot(out: &mut String, class: TrafficClass, counter: &AggregateCounter) {
    let prefix = class.prefix();
    let what = match class {
        TrafficClass::Http => "HTTP requests",
        TrafficClass::Https => "HTTPS requests",
        TrafficClass::HttpOutbound => "outbound HTTP requests",
        TrafficClass::HttpsOutbound => "outbound HTTPS requests",
    };

    let total = format!("{prefix}_requests_snapshot_total");
    family(out, &total, &format!("Total number of {what} since the last scrape."), "gauge");
    line(out, &total, &[], counter.total);

    let average = format!("{prefix}_requests_duration_average_microseconds");
    family(out, &average, &format!("Average duration of {what} since the last scrape."), "gauge");
    line(out, &average, &[], float(counter.average * MS_TO_US));

    let max = format!("{prefix}_requests_duration_max_microseconds");
    family(out, &max, &format!("Longest of the {what} since the last scrape."), "gauge");
    line(out, &max, &[("handler", counter.longest_key.as_str())], float(counter.longest * MS_TO_US));
}

// ─── Line helpers ────────────────────────────────────────────────

fn family(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn line(out: &mut String, name: &str, labels: &[(&str, &str)], value: impl std::fmt::Display) {
    out.push_str(name);
    if !labels.is_empty() {
        out.push('{');
        for (i, (key, val)) in labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{key}=\"{}\"", escape_label(val));
        }
        out.push('}');
    }
    let _ = writeln!(out, " {value}");
}

/// Shortest round-trip decimal; non-finite values use the Prometheus spelling.
fn float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v == f64::INFINITY {
        "+Inf".to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        v.to_string()
    }
}

fn escape_label(value: &str) -> Cow<'_, str> {
    if !value.contains(&['\\', '"', '\n'][..]) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
