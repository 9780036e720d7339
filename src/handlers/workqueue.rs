//! Kernel workqueue execution events.
//!
//! `workqueue_execute_start` opens a slice on the kworker thread named after
//! the work function; `workqueue_execute_end` closes it. Same stack
//! discipline as marker slices, scoped to the line's own thread.

use crate::feedback::{ImportFeedback, ImportWarning};
use crate::handlers::{malformed, HandlerFn};
use crate::line::FtraceLine;
use crate::state::FtraceImporterState;

pub const HANDLERS: &[(&[u8], HandlerFn)] = &[
    (b"workqueue_execute_start", handle_start),
    (b"workqueue_execute_end", handle_end),
];

/// Start payload: `work struct <addr>: function <name>`.
const FUNCTION_KEY: &[u8] = b"function ";

fn handle_start(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let payload = line.details.rest();
    let Some(pos) = payload
        .windows(FUNCTION_KEY.len())
        .position(|w| w == FUNCTION_KEY)
    else {
        return Err(malformed(line));
    };
    let name = &payload[pos + FUNCTION_KEY.len()..];
    if name.is_empty() {
        return Err(malformed(line));
    }
    let name = state.cache_mut().intern_bytes(name);
    let thread = state.thread_for(line.pid, line.tgid, line.task, feedback);
    thread.slices.begin_slice(name, line.timestamp);
    Ok(())
}

fn handle_end(
    line: &FtraceLine<'_>,
    state: &mut FtraceImporterState,
    feedback: &mut dyn ImportFeedback,
) -> Result<(), ImportWarning> {
    let thread = state.thread_for(line.pid, line.tgid, line.task, feedback);
    thread.slices.end_slice(line.timestamp, &thread.sched_states);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::CollectingFeedback;
    use crate::line::parse_line;

    fn run(
        line: &[u8],
        state: &mut FtraceImporterState,
        handler: HandlerFn,
    ) -> Result<(), ImportWarning> {
        let parsed = parse_line(line).expect("test line must tokenize");
        let mut feedback = CollectingFeedback::new();
        handler(&parsed, state, &mut feedback)
    }

    #[test]
    fn test_start_end_names_slice_after_work_function() {
        let mut state = FtraceImporterState::new();
        run(
            b"kworker/1:1-33 [001] 5.000: workqueue_execute_start: work struct ffffffc0ba2aea18: function vmstat_update",
            &mut state,
            handle_start,
        )
        .unwrap();
        run(
            b"kworker/1:1-33 [001] 5.002: workqueue_execute_end: work struct ffffffc0ba2aea18",
            &mut state,
            handle_end,
        )
        .unwrap();

        let fragment = state.into_fragment();
        let thread = fragment.thread(33).unwrap();
        assert_eq!(thread.name.as_deref(), Some("kworker/1:1"));
        let slices = thread.slices.slices();
        assert_eq!(slices.len(), 1);
        assert_eq!(&*slices[0].name, "vmstat_update");
        assert_eq!(slices[0].start_time, 5.0);
        assert_eq!(slices[0].end_time, Some(5.002));
    }

    #[test]
    fn test_start_without_function_key_is_malformed() {
        let mut state = FtraceImporterState::new();
        let result = run(
            b"kworker/1:1-33 [001] 5.0: workqueue_execute_start: work struct ffffffc0ba2aea18",
            &mut state,
            handle_start,
        );
        assert!(matches!(
            result,
            Err(ImportWarning::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_end_without_start_is_silent() {
        let mut state = FtraceImporterState::new();
        run(
            b"kworker/1:1-33 [001] 5.0: workqueue_execute_end: work struct ffffffc0ba2aea18",
            &mut state,
            handle_end,
        )
        .unwrap();
        let fragment = state.into_fragment();
        assert_eq!(fragment.thread(33).unwrap().slices.count(), 0);
    }
}
