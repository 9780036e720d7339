//! Scheduler events.
//!
//! Every handler here registers the threads a line mentions, so a pid's
//! existence never depends on it emitting a marker of its own. `sched_switch`
//! and `sched_wakeup` additionally record scheduling-state change points; the
//! marker `E` handler joins those back into closed slices as on-CPU time.

use crate::feedback::{ImportFeedback, ImportWarning};
use crate::handlers::{malformed, HandlerFn};
use crate::line::{FtraceLine, Tgid};
use crate::model::SchedulingState;
use crate::state::FtraceImporterState;

pub const HANDLERS: &[(&[u8], HandlerFn)] = &[
    (b"sched_switch", handle_switch),
    (b"sched_wakeup", handle_wakeup),
    (b"sched_blocked_reason", handle_blocked_reason),
    (b"sched_cpu_hotplug", handle_cpu_hotplug),
];

/// Payload: `prev_comm=X prev_pid=N prev_prio=N prev_state=S ==>
/// next_comm=Y next_pid=M next_prio=M`.
fn handle_switch(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let payload = line.details.rest();
    let prev_comm = comm_field(payload, b"prev_comm=", b" prev_pid=");
    let prev_pid = int_field(payload, b"prev_pid=");
    let prev_state = token_field(payload, b"prev_state=");
    let next_comm = comm_field(payload, b"next_comm=", b" next_pid=");
    let next_pid = int_field(payload, b"next_pid=");
    let (Some(prev_comm), Some(prev_pid), Some(prev_state), Some(next_comm), Some(next_pid)) =
        (prev_comm, prev_pid, prev_state, next_comm, next_pid)
    else {
        return Err(malformed(line));
    };

    state.thread_for(line.pid, line.tgid, line.task, feedback);

    let prev = state.thread_for(prev_pid, Tgid::Unknown, Some(prev_comm), feedback);
    prev.sched_states
        .switch_state(line.timestamp, SchedulingState::from_prev_state(prev_state));

    let next = state.thread_for(next_pid, Tgid::Unknown, Some(next_comm), feedback);
    next.sched_states
        .switch_state(line.timestamp, SchedulingState::Running);
    Ok(())
}

/// Payload: `comm=X pid=N prio=N target_cpu=NNN` (older kernels insert a
/// `success=` field; ignored either way).
fn handle_wakeup(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let payload = line.details.rest();
    let (Some(comm), Some(pid)) = (
        comm_field(payload, b"comm=", b" pid="),
        int_field(payload, b"pid="),
    ) else {
        return Err(malformed(line));
    };

    state.thread_for(line.pid, line.tgid, line.task, feedback);
    let woken = state.thread_for(pid, Tgid::Unknown, Some(comm), feedback);
    woken
        .sched_states
        .switch_state(line.timestamp, SchedulingState::Waking);
    Ok(())
}

/// Payload: `pid=N iowait=N caller=symbol`. Registers the blocked thread;
/// detailed block-reason tracking is out of scope.
fn handle_blocked_reason(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let Some(pid) = int_field(line.details.rest(), b"pid=") else {
        return Err(malformed(line));
    };
    state.thread_for(line.pid, line.tgid, line.task, feedback);
    state.thread_for(pid, Tgid::Unknown, None, feedback);
    Ok(())
}

/// Payload names a cpu, not a task; only the emitting thread registers.
fn handle_cpu_hotplug(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    state.thread_for(line.pid, line.tgid, line.task, feedback);
    Ok(())
}

/// Bytes following the first occurrence of `key`, or `None`.
fn after_key<'a>(payload: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let pos = payload.windows(key.len()).position(|w| w == key)?;
    Some(&payload[pos + key.len()..])
}

/// A comm value runs until the key that follows it; comms may contain spaces
/// (`Signal Catcher`), so whitespace cannot terminate them.
fn comm_field<'a>(payload: &'a [u8], key: &[u8], terminator: &[u8]) -> Option<&'a [u8]> {
    let rest = after_key(payload, key)?;
    let end = rest
        .windows(terminator.len())
        .position(|w| w == terminator)?;
    Some(&rest[..end])
}

/// A single whitespace-free token after `key`.
fn token_field<'a>(payload: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let rest = after_key(payload, key)?;
    let end = rest
        .iter()
        .position(|&b| b == b' ' || b == b'\t')
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

fn int_field(payload: &[u8], key: &[u8]) -> Option<i32> {
    let token = token_field(payload, key)?;
    if !token.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    std::str::from_utf8(token).ok()?.parse().ok()
}
