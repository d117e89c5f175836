//! All-time per-route statistics.
//!
//! Records are keyed by `(url, status_code)`. The method is carried for
//! display only, so a GET and a POST to the same URL with the same status
//! share one record and keep the first method seen.

use tracing::debug;

use super::aggregate::incremental_mean;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub url: String,
    pub method: String,
    pub status_code: u16,
    pub hits: u64,
    /// Mean duration since process start (ms)
    pub average_duration: f64,
    pub longest_duration: f64,
    /// Every duration seen, ascending. `len() == hits`.
    pub duration_samples: Vec<f64>,
}

impl RouteRecord {
    fn new(url: &str, method: &str, status_code: u16, duration: f64) -> Self {
        Self {
            url: url.to_owned(),
            method: method.to_owned(),
            status_code,
            hits: 1,
            average_duration: duration,
            longest_duration: duration,
            duration_samples: vec![duration],
        }
    }

    fn record(&mut self, duration: f64) {
        self.average_duration = incremental_mean(self.average_duration, self.hits, duration);
        self.hits += 1;

        // Ordered insert keeps the list sorted without a full re-sort.
        let at = self
            .duration_samples
            .partition_point(|&existing| existing <= duration);
        self.duration_samples.insert(at, duration);

        if let Some(&max) = self.duration_samples.last() {
            self.longest_duration = max;
        }
    }
}

/// Insertion-ordered route table. Never shrinks.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
}

impl RouteTable {
    pub fn record(&mut self, url: &str, method: &str, status_code: u16, duration: f64) {
        match self
            .records
            .iter_mut()
            .find(|r| r.url == url && r.status_code == status_code)
        {
            Some(existing) => existing.record(duration),
            None => {
                debug!(%url, %method, status_code, "tracking new route");
                self.records
                    .push(RouteRecord::new(url, method, status_code, duration));
            }
        }
    }

    pub fn all(&self) -> &[RouteRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
