//! Nested slice trees built from strictly LIFO begin/end pairs.

use std::sync::Arc;

use crate::model::sched_state::SchedStateBuilder;

/// One named execution interval on a thread.
///
/// # Fields
///
/// - `name`: interned slice name (e.g. `Choreographer#doFrame`)
/// - `start_time`: begin timestamp in seconds
/// - `end_time`: end timestamp, or `None` when the trace ended first
/// - `running_time`: time the thread was actually on-CPU inside the slice,
///   joined from the thread's scheduling states when the slice closes
/// - `children`: slices fully contained within this one, in begin order
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    pub name: Arc<str>,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub running_time: f64,
    pub children: Vec<Slice>,
}

impl Slice {
    /// Wall duration, when the slice was closed.
    pub fn duration(&self) -> Option<f64> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Builds a thread's slice tree. Begins push onto a stack; an end pops the
/// most recent begin (LIFO is a property of the input format: slices never
/// partially overlap on one thread).
#[derive(Debug, Default)]
pub struct SliceStackBuilder {
    top_level: Vec<Slice>,
    open: Vec<Slice>,
}

impl SliceStackBuilder {
    pub fn begin_slice(&mut self, name: Arc<str>, timestamp: f64) {
        self.open.push(Slice {
            name,
            start_time: timestamp,
            end_time: None,
            running_time: 0.0,
            children: Vec::new(),
        });
    }

    /// Close the most recently opened slice, joining in its on-CPU time.
    /// Returns false when no slice is open (the begin predates the trace).
    pub fn end_slice(&mut self, timestamp: f64, sched: &SchedStateBuilder) -> bool {
        let Some(mut slice) = self.open.pop() else {
            return false;
        };
        slice.end_time = Some(timestamp);
        slice.running_time = sched.running_time_between(slice.start_time, timestamp);
        self.attach(slice);
        true
    }

    /// Number of currently open slices.
    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    /// Completed top-level slices, in completion order.
    pub fn slices(&self) -> &[Slice] {
        &self.top_level
    }

    /// Slices in the whole tree, open ones included.
    pub fn count(&self) -> usize {
        fn count_tree(slices: &[Slice]) -> usize {
            slices.iter().map(|s| 1 + count_tree(&s.children)).sum()
        }
        count_tree(&self.top_level) + count_tree(&self.open)
    }

    /// Move still-open slices into the tree at end of stream. Their end times
    /// stay `None`; a truncated trace is visible, not papered over.
    pub fn finish(&mut self) {
        while let Some(slice) = self.open.pop() {
            self.attach(slice);
        }
    }

    fn attach(&mut self, slice: Slice) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(slice),
            None => self.top_level.push(slice),
        }
    }
}
