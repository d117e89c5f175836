pub mod aggregate;
pub mod collections;
pub mod collector;
pub mod endpoint;
pub mod exposition;
pub mod gauges;
pub mod percentiles;
pub mod profiling;
pub mod routes;

pub use collector::MetricsRegistry;

use serde::Serialize;

use crate::error::IngestError;

// ─── Event payloads ──────────────────────────────────────────────

/// CPU utilisation as ratios in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuSample {
    pub process: f64,
    pub system: f64,
}

/// Host and process memory, all in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemorySample {
    pub physical_total: u64,
    pub physical_used: u64,
    pub physical_free: u64,
    /// Resident set of this process
    pub physical: u64,
    pub private: u64,
    pub virtual_bytes: u64,
}

/// One completed garbage-collection cycle of an embedded runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GcSample {
    /// Heap size after the cycle (bytes)
    pub size: u64,
    /// Heap in use after the cycle (bytes)
    pub used: u64,
    /// Cycle duration (ms)
    pub duration: f64,
}

/// Scheduler tick statistics for one sampling window (all times in ms).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopSample {
    pub minimum: f64,
    pub maximum: f64,
    pub average: f64,
    pub count: u64,
    pub cpu_user: f64,
    pub cpu_system: f64,
}

/// A completed inbound or outbound HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSample {
    pub url: String,
    pub method: String,
    pub status_code: u16,
    /// Wall time (ms)
    pub duration: f64,
    pub timestamp_ms: i64,
}

/// Opaque profiling payload, buffered and handed back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilingSample {
    pub timestamp_ms: i64,
    pub payload: serde_json::Value,
}

// ─── Traffic classes ─────────────────────────────────────────────

/// Each class keeps its own independent snapshot counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    Http,
    Https,
    HttpOutbound,
    HttpsOutbound,
}

impl TrafficClass {
    pub const ALL: [TrafficClass; 4] = [
        TrafficClass::Http,
        TrafficClass::Https,
        TrafficClass::HttpOutbound,
        TrafficClass::HttpsOutbound,
    ];

    /// Metric family prefix used in the exposition text.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::HttpOutbound => "http_outbound",
            Self::HttpsOutbound => "https_outbound",
        }
    }

    /// Inbound traffic also feeds the all-time route table.
    pub fn is_inbound(self) -> bool {
        matches!(self, Self::Http | Self::Https)
    }

    fn index(self) -> usize {
        match self {
            Self::Http => 0,
            Self::Https => 1,
            Self::HttpOutbound => 2,
            Self::HttpsOutbound => 3,
        }
    }
}

// ─── Event ───────────────────────────────────────────────────────

/// Everything a telemetry producer can push into the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Cpu(CpuSample),
    Memory(MemorySample),
    Gc(GcSample),
    Loop(LoopSample),
    Http {
        class: TrafficClass,
        sample: HttpSample,
    },
    Profiling(ProfilingSample),
}

impl Event {
    /// Short kind name, matching the producer-side event names.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cpu(_) => "cpu",
            Self::Memory(_) => "memory",
            Self::Gc(_) => "gc",
            Self::Loop(_) => "loop",
            Self::Http { class, .. } => match class {
                TrafficClass::Http => "http",
                TrafficClass::Https => "https",
                TrafficClass::HttpOutbound => "http-outbound",
                TrafficClass::HttpsOutbound => "https-outbound",
            },
            Self::Profiling(_) => "profiling",
        }
    }

    /// Reject payloads whose numbers would poison running means.
    /// Zero durations are fine; negative or non-finite ones are not.
    pub fn validate(&self) -> Result<(), IngestError> {
        let kind = self.kind();
        match self {
            Self::Cpu(s) => {
                finite(kind, "process", s.process)?;
                finite(kind, "system", s.system)
            }
            Self::Gc(s) => duration(kind, s.duration),
            Self::Loop(s) => {
                finite(kind, "minimum", s.minimum)?;
                finite(kind, "maximum", s.maximum)?;
                finite(kind, "average", s.average)?;
                finite(kind, "cpu_user", s.cpu_user)?;
                finite(kind, "cpu_system", s.cpu_system)
            }
            Self::Http { sample, .. } => duration(kind, sample.duration),
            Self::Memory(_) | Self::Profiling(_) => Ok(()),
        }
    }
}

fn finite(kind: &'static str, field: &'static str, value: f64) -> Result<(), IngestError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(IngestError::NonFinite { kind, field })
    }
}

fn duration(kind: &'static str, value: f64) -> Result<(), IngestError> {
    finite(kind, "duration", value)?;
    if value < 0.0 {
        return Err(IngestError::NegativeDuration { kind, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(duration: f64) -> Event {
        Event::Http {
            class: TrafficClass::HttpsOutbound,
            sample: HttpSample {
                url: "/a".into(),
                method: "GET".into(),
                status_code: 200,
                duration,
                timestamp_ms: 0,
            },
        }
    }

    #[test]
    fn zero_duration_is_accepted() {
        assert!(http(0.0).validate().is_ok());
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = http(-1.5).validate().unwrap_err();
        assert_eq!(
            err,
            IngestError::NegativeDuration {
                kind: "https-outbound",
                value: -1.5
            }
        );
    }

    #[test]
    fn nan_ratio_is_rejected() {
        let event = Event::Cpu(CpuSample {
            process: f64::NAN,
            system: 0.1,
        });
        assert_eq!(
            event.validate().unwrap_err(),
            IngestError::NonFinite {
                kind: "cpu",
                field: "process"
            }
        );
    }

    #[test]
    fn class_prefixes() {
        let prefixes: Vec<_> = TrafficClass::ALL.iter().map(|c| c.prefix()).collect();
        assert_eq!(prefixes, ["http", "https", "http_outbound", "https_outbound"]);
        assert!(TrafficClass::Https.is_inbound());
        assert!(!TrafficClass::HttpOutbound.is_inbound());
    }
}
