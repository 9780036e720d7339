//! Userspace marker events (`tracing_mark_write`).
//!
//! The payload's first byte selects the sub-format: `B|tgid|name` begins a
//! slice, `E` ends the most recent one, `C|tgid|name|value` appends a counter
//! sample. Everything else is tried against the two clock-sync patterns and
//! otherwise ignored; plenty of benign noise rides on this event.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::feedback::{ImportFeedback, ImportWarning};
use crate::handlers::{malformed, HandlerFn};
use crate::line::{FtraceLine, Tgid};
use crate::state::FtraceImporterState;

pub const HANDLERS: &[(&[u8], HandlerFn)] = &[(b"tracing_mark_write", handle_mark)];

/// Clock-sync markers are rare (a handful per trace), so a regex here costs
/// nothing; the per-line hot path never reaches these.
static PARENT_TS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"trace_event_clock_sync: parent_ts=(\d+\.?\d*)")
        .expect("invalid parent_ts clock-sync pattern")
});

static REALTIME_TS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"trace_event_clock_sync: realtime_ts=(\d+)")
        .expect("invalid realtime_ts clock-sync pattern")
});

fn handle_mark(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    match line.details.peek() {
        Some(b'B') => begin_slice(line, state, feedback),
        Some(b'E') => end_slice(line, state, feedback),
        Some(b'C') => counter_sample(line, state, feedback),
        _ => {
            clock_sync(line, state);
            Ok(())
        }
    }
}

fn begin_slice(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let mut payload = line.details;
    payload.bump();
    if !payload.eat(b'|') {
        return Err(malformed(line));
    }
    let Some(tgid) = payload.read_i32() else {
        return Err(malformed(line));
    };
    if !payload.eat(b'|') {
        return Err(malformed(line));
    }
    let name = state.cache_mut().intern_bytes(payload.rest());
    let thread = state.thread_for(line.pid, Tgid::Known(tgid), line.task, feedback);
    thread.slices.begin_slice(name, line.timestamp);
    Ok(())
}

fn end_slice(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let thread = state.thread_for(line.pid, line.tgid, line.task, feedback);
    // An end with nothing open means the matching begin predates the visible
    // trace window. Routine for ring buffers, so no diagnostic.
    thread.slices.end_slice(line.timestamp, &thread.sched_states);
    Ok(())
}

fn counter_sample(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let mut payload = line.details;
    payload.bump();
    if !payload.eat(b'|') {
        return Err(malformed(line));
    }
    let Some(tgid) = payload.read_i32() else {
        return Err(malformed(line));
    };
    if !payload.eat(b'|') {
        return Err(malformed(line));
    }
    let name_bytes = payload.take_until(b'|');
    if !payload.eat(b'|') {
        return Err(malformed(line));
    }
    let Some(value) = payload.read_f64() else {
        return Err(malformed(line));
    };
    let name = state.cache_mut().intern_bytes(name_bytes);
    let process = state.process_for(line.pid, Tgid::Known(tgid), line.task, feedback);
    process.add_counter_sample(name, line.timestamp, value);
    Ok(())
}

/// Apply a clock-sync payload to the fragment. Either pattern may match
/// independently; a payload matching neither is ignored.
fn clock_sync(line: &FtraceLine<'_>, state: &mut FtraceImporterState) {
    let payload = line.details.rest();
    if let Some(caps) = PARENT_TS_RE.captures(payload) {
        if let Some(value) = parse_capture::<f64>(&caps[1]) {
            let fragment = state.fragment_mut();
            fragment.parent_timestamp = Some(value);
            fragment.parent_timestamp_boot_time = Some(line.timestamp);
        }
    }
    if let Some(caps) = REALTIME_TS_RE.captures(payload) {
        if let Some(value) = parse_capture::<i64>(&caps[1]) {
            state.fragment_mut().realtime_timestamp = Some(value);
        }
    }
}

fn parse_capture<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
