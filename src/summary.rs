//! Serializable summary views over a finished fragment.
//!
//! The model itself stays a plain object graph; these structs exist so the
//! CLI (and any programmatic caller wanting JSON) has a stable, serde-friendly
//! shape without the model carrying serialization concerns.

use serde::Serialize;

use crate::model::{ModelFragment, ProcessModelFragment};

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub global_start_time: Option<f64>,
    pub global_end_time: Option<f64>,
    pub parent_timestamp: Option<f64>,
    pub realtime_timestamp: Option<i64>,
    pub process_count: usize,
    pub thread_count: usize,
    pub slice_count: usize,
    pub processes: Vec<ProcessSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProcessSummary {
    /// None for a process whose tgid was never observed.
    pub id: Option<i32>,
    pub name: Option<String>,
    pub thread_count: usize,
    pub slice_count: usize,
    pub counters: Vec<String>,
}

impl ImportSummary {
    pub fn from_fragment(fragment: &ModelFragment) -> Self {
        let mut processes: Vec<ProcessSummary> = fragment
            .processes
            .values()
            .map(ProcessSummary::from_process)
            .collect();
        // Identified processes first, in pid order; placeholders trail.
        processes.sort_by_key(|p| (p.id.is_none(), p.id));

        Self {
            global_start_time: fragment.global_start_time,
            global_end_time: fragment.global_end_time,
            parent_timestamp: fragment.parent_timestamp,
            realtime_timestamp: fragment.realtime_timestamp,
            process_count: fragment.processes.len(),
            thread_count: fragment.thread_count(),
            slice_count: fragment.slice_count(),
            processes,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match (self.global_start_time, self.global_end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

impl ProcessSummary {
    fn from_process(process: &ProcessModelFragment) -> Self {
        let mut counters: Vec<String> =
            process.counters.keys().map(|k| k.to_string()).collect();
        counters.sort();
        Self {
            id: process.id,
            name: process.name.as_ref().map(|n| n.to_string()),
            thread_count: process.threads.len(),
            slice_count: process.slice_count(),
            counters,
        }
    }
}
