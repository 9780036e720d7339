//! The process/thread/counter model one import produces.
//!
//! Graph edges are integer keys rather than object references: processes are
//! stored in one table keyed by [`ProcessKey`], and thread→process navigation
//! goes through the `thread_index` table. This keeps ownership single-rooted
//! (a process exclusively owns its threads) while still allowing lookups in
//! either direction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::sched_state::SchedStateBuilder;
use crate::model::slices::SliceStackBuilder;

/// Identity of a process in the model.
///
/// `Known` carries the real tgid. `Placeholder` is handed out when a thread
/// is seen before anything reveals which process it belongs to; the arena
/// counter keeps placeholders distinct from every pid, so an unknown identity
/// can never collide with a real one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessKey {
    Known(i32),
    Placeholder(u32),
}

impl ProcessKey {
    /// The real pid, when the process has been identified.
    pub fn known_pid(&self) -> Option<i32> {
        match self {
            ProcessKey::Known(pid) => Some(*pid),
            ProcessKey::Placeholder(_) => None,
        }
    }
}

/// One counter observation.
///
/// Cannot derive `Eq` because `value` is `f64`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CounterSample {
    pub timestamp: f64,
    pub value: f64,
}

/// A thread and everything recorded against it.
///
/// # Fields
///
/// - `tid`: kernel thread id from the trace
/// - `name`: thread name, refined via hints (`<...>` never hints)
/// - `slices`: nested begin/end slice tree
/// - `sched_states`: scheduling-state change points
#[derive(Debug)]
pub struct ThreadModelFragment {
    pub tid: i32,
    pub name: Option<Arc<str>>,
    pub slices: SliceStackBuilder,
    pub sched_states: SchedStateBuilder,
}

impl ThreadModelFragment {
    pub fn new(tid: i32) -> Self {
        Self {
            tid,
            name: None,
            slices: SliceStackBuilder::default(),
            sched_states: SchedStateBuilder::default(),
        }
    }
}

/// A process, its threads, and its counter series.
///
/// # Fields
///
/// - `id`: the pid (== tgid), `None` while the process is only a placeholder
/// - `name`: process name, hinted from its main thread's task name
/// - `threads`: exclusively owned threads, keyed by tid
/// - `counters`: append-only sample series keyed by counter name
#[derive(Debug, Default)]
pub struct ProcessModelFragment {
    pub id: Option<i32>,
    pub name: Option<Arc<str>>,
    pub threads: HashMap<i32, ThreadModelFragment>,
    pub counters: HashMap<Arc<str>, Vec<CounterSample>>,
}

impl ProcessModelFragment {
    pub fn new(id: Option<i32>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Append one sample to the named counter series. Samples keep arrival
    /// order; equal consecutive values are not deduplicated.
    pub fn add_counter_sample(&mut self, name: Arc<str>, timestamp: f64, value: f64) {
        self.counters
            .entry(name)
            .or_default()
            .push(CounterSample { timestamp, value });
    }

    /// Slices across all threads, nested ones included.
    pub fn slice_count(&self) -> usize {
        self.threads.values().map(|t| t.slices.count()).sum()
    }
}

/// Everything one import run produced.
///
/// # Fields
///
/// - `global_start_time` / `global_end_time`: first/last event timestamp seen
/// - `parent_timestamp` / `parent_timestamp_boot_time`: clock-sync anchor
///   (the parent clock value, and the boot-clock timestamp of the marker line
///   that carried it)
/// - `realtime_timestamp`: wall-clock anchor in ms since the epoch
/// - `processes`: all processes, identified and placeholder
/// - `thread_index`: tid → owning process key, for reverse navigation
#[derive(Debug, Default)]
pub struct ModelFragment {
    pub global_start_time: Option<f64>,
    pub global_end_time: Option<f64>,
    pub parent_timestamp: Option<f64>,
    pub parent_timestamp_boot_time: Option<f64>,
    pub realtime_timestamp: Option<i64>,
    pub processes: HashMap<ProcessKey, ProcessModelFragment>,
    pub thread_index: HashMap<i32, ProcessKey>,
}

impl ModelFragment {
    /// Widen the global time bounds to include `timestamp`.
    pub fn update_time_bounds(&mut self, timestamp: f64) {
        if self.global_start_time.is_none_or(|s| timestamp < s) {
            self.global_start_time = Some(timestamp);
        }
        if self.global_end_time.is_none_or(|e| timestamp > e) {
            self.global_end_time = Some(timestamp);
        }
    }

    /// An identified process, by pid.
    pub fn process(&self, pid: i32) -> Option<&ProcessModelFragment> {
        self.processes.get(&ProcessKey::Known(pid))
    }

    /// A thread, by tid, wherever it lives.
    pub fn thread(&self, tid: i32) -> Option<&ThreadModelFragment> {
        let key = self.thread_index.get(&tid)?;
        self.processes.get(key)?.threads.get(&tid)
    }

    /// The process owning `tid`.
    pub fn process_of_thread(&self, tid: i32) -> Option<&ProcessModelFragment> {
        let key = self.thread_index.get(&tid)?;
        self.processes.get(key)
    }

    pub fn thread_count(&self) -> usize {
        self.processes.values().map(|p| p.threads.len()).sum()
    }

    pub fn slice_count(&self) -> usize {
        self.processes.values().map(|p| p.slice_count()).sum()
    }
}
