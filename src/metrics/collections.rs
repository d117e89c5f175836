//! Client-owned collections.
//!
//! A collection is a resettable summary over the same event stream the
//! registry aggregates: CPU and memory means and peaks, GC totals and
//! per-URL request stats. Clients create one, read it whenever they like,
//! zero it and delete it. Collections never affect the scrape output.

use serde::Serialize;

use super::aggregate::incremental_mean;
use super::{CpuSample, GcSample, HttpSample, MemorySample};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CollectionTime {
    /// Epoch ms when the collection was created or last reset
    pub start: i64,
    /// Epoch ms of the last read
    pub end: i64,
}

/// Ratios in `[0, 1]`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CpuStats {
    pub samples: u64,
    pub process_mean: f64,
    pub process_peak: f64,
    pub system_mean: f64,
    pub system_peak: f64,
}

/// Process resident memory and host memory in use, in bytes.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MemoryStats {
    pub samples: u64,
    pub process_mean: f64,
    pub process_peak: u64,
    pub system_mean: f64,
    pub system_peak: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GcStats {
    pub cycles: u64,
    pub heap_size_peak: u64,
    pub heap_used_peak: u64,
    /// Sum of cycle durations (ms)
    pub duration_total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UrlStats {
    pub url: String,
    pub method: String,
    pub hits: u64,
    /// ms
    pub average_response_time: f64,
    /// ms
    pub longest_response_time: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Collection {
    pub id: u64,
    pub time: CollectionTime,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub gc: GcStats,
    /// First-seen order, keyed by `(url, method)`
    pub http_urls: Vec<UrlStats>,
}

impl Collection {
    fn new(id: u64, now_ms: i64) -> Self {
        Self {
            id,
            time: CollectionTime {
                start: now_ms,
                end: now_ms,
            },
            cpu: CpuStats::default(),
            memory: MemoryStats::default(),
            gc: GcStats::default(),
            http_urls: Vec::new(),
        }
    }

    /// Relative URI clients address this collection by.
    pub fn uri(&self) -> String {
        format!("collections/{}", self.id)
    }

    fn observe_cpu(&mut self, s: CpuSample) {
        let cpu = &mut self.cpu;
        cpu.process_mean = incremental_mean(cpu.process_mean, cpu.samples, s.process);
        cpu.system_mean = incremental_mean(cpu.system_mean, cpu.samples, s.system);
        cpu.process_peak = cpu.process_peak.max(s.process);
        cpu.system_peak = cpu.system_peak.max(s.system);
        cpu.samples += 1;
    }

    fn observe_memory(&mut self, s: MemorySample) {
        let mem = &mut self.memory;
        mem.process_mean = incremental_mean(mem.process_mean, mem.samples, s.physical as f64);
        mem.system_mean = incremental_mean(mem.system_mean, mem.samples, s.physical_used as f64);
        mem.process_peak = mem.process_peak.max(s.physical);
        mem.system_peak = mem.system_peak.max(s.physical_used);
        mem.samples += 1;
    }

    fn observe_gc(&mut self, s: GcSample) {
        let gc = &mut self.gc;
        gc.cycles += 1;
        gc.heap_size_peak = gc.heap_size_peak.max(s.size);
        gc.heap_used_peak = gc.heap_used_peak.max(s.used);
        gc.duration_total += s.duration;
    }

    fn observe_http(&mut self, s: &HttpSample) {
        match self
            .http_urls
            .iter_mut()
            .find(|u| u.url == s.url && u.method == s.method)
        {
            Some(u) => {
                u.average_response_time = incremental_mean(u.average_response_time, u.hits, s.duration);
                u.longest_response_time = u.longest_response_time.max(s.duration);
                u.hits += 1;
            }
            None => self.http_urls.push(UrlStats {
                url: s.url.clone(),
                method: s.method.clone(),
                hits: 1,
                average_response_time: s.duration,
                longest_response_time: s.duration,
            }),
        }
    }
}

/// Every open collection. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct CollectionSet {
    next_id: u64,
    open: Vec<Collection>,
}

impl CollectionSet {
    pub fn create(&mut self, now_ms: i64) -> &Collection {
        self.next_id += 1;
        self.open.push(Collection::new(self.next_id, now_ms));
        &self.open[self.open.len() - 1]
    }

    pub fn uris(&self) -> Vec<String> {
        self.open.iter().map(Collection::uri).collect()
    }

    /// Stamp the read time and hand back a copy.
    pub fn read(&mut self, id: u64, now_ms: i64) -> Option<Collection> {
        let c = self.open.iter_mut().find(|c| c.id == id)?;
        c.time.end = now_ms;
        Some(c.clone())
    }

    /// Zero every value and restart the window. `false` if `id` is unknown.
    pub fn reset(&mut self, id: u64, now_ms: i64) -> bool {
        match self.open.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                *c = Collection::new(id, now_ms);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.open.len();
        self.open.retain(|c| c.id != id);
        self.open.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn observe_cpu(&mut self, s: CpuSample) {
        self.open.iter_mut().for_each(|c| c.observe_cpu(s));
    }

    pub fn observe_memory(&mut self, s: MemorySample) {
        self.open.iter_mut().for_each(|c| c.observe_memory(s));
    }

    pub fn observe_gc(&mut self, s: GcSample) {
        self.open.iter_mut().for_each(|c| c.observe_gc(s));
    }

    pub fn observe_http(&mut self, s: &HttpSample) {
        self.open.iter_mut().for_each(|c| c.observe_http(s));
    }
}
