//! The trace model produced by an import.

pub mod fragment;
pub mod sched_state;
pub mod slices;

pub use fragment::{
    CounterSample, ModelFragment, ProcessKey, ProcessModelFragment, ThreadModelFragment,
};
pub use sched_state::{SchedStateBuilder, SchedStatePoint, SchedulingState};
pub use slices::{Slice, SliceStackBuilder};
