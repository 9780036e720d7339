//! Tokenizer for ftrace data lines.
//!
//! One data line looks like (older kernels omit the tgid and flags fields):
//!
//! ```text
//!  surfaceflinger-617   (  617) [001] ...1  1198.424757: tracing_mark_write: B|617|handleMessage
//! ```
//!
//! Parsing is a single left-to-right pass over the bytes; nothing on this
//! path allocates or decodes UTF-8. The returned [`FtraceLine`] borrows the
//! line buffer, so every field a handler wants to keep has to be copied out
//! (through the string cache) before the next line is read. That contract is
//! carried by the lifetime parameter rather than by convention.

use crate::cursor::ByteCursor;

/// Task names longer than the kernel's comm limit print as this sentinel.
const TRUNCATED_TASK: &[u8] = b"<...>";

/// The process id column of a line. The kernel prints `-----` (or nothing,
/// on older kernels) when it does not know the tgid, so "unknown" has to be
/// representable apart from every real pid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tgid {
    Unknown,
    Known(i32),
}

/// One tokenized data line. Valid for a single dispatch call.
#[derive(Clone, Copy, Debug)]
pub struct FtraceLine<'a> {
    /// Task name, `None` when the kernel truncated it to `<...>`.
    pub task: Option<&'a [u8]>,
    pub pid: i32,
    pub tgid: Tgid,
    pub cpu: u32,
    /// Seconds. Not assumed monotonic: buffer wraparound reorders lines.
    pub timestamp: f64,
    /// Event name, matched as raw bytes against the dispatch table.
    pub function: &'a [u8],
    /// Cursor over the payload after `function: `.
    pub details: ByteCursor<'a>,
}

/// Tokenize one data line. `None` means the line does not match the grammar;
/// the caller decides whether that is worth a diagnostic.
pub fn parse_line(bytes: &[u8]) -> Option<FtraceLine<'_>> {
    let mut cur = ByteCursor::new(bytes);
    cur.skip_spaces();

    let (task, pid) = parse_task_pid(&mut cur)?;
    cur.skip_spaces();

    let tgid = parse_tgid(&mut cur)?;
    cur.skip_spaces();

    if !cur.eat(b'[') {
        return None;
    }
    let cpu = cur.read_u32()?;
    if !cur.eat(b']') {
        return None;
    }
    cur.skip_spaces();

    // The irq-context flags field is optional. A timestamp always starts
    // with a digit; flags never do.
    if matches!(cur.peek(), Some(b) if !b.is_ascii_digit()) {
        cur.skip_while(|b| b != b' ' && b != b'\t');
        cur.skip_spaces();
    }

    let timestamp = cur.read_f64()?;
    cur.skip_spaces();
    if !cur.eat(b':') {
        return None;
    }
    cur.skip_spaces();

    let function = cur.take_until(b':');
    if function.is_empty() {
        return None;
    }
    if !cur.eat(b':') {
        return None;
    }
    cur.eat(b' ');

    Some(FtraceLine {
        task,
        pid,
        tgid,
        cpu,
        timestamp,
        function,
        details: cur,
    })
}

/// Split the `taskname-pid` token. Task names may contain both `-` and
/// spaces (`Signal Catcher-618`, `kworker/u16:1-33`), so the boundary is the
/// last `-` whose following run of digits reaches whitespace.
fn parse_task_pid<'a>(cur: &mut ByteCursor<'a>) -> Option<(Option<&'a [u8]>, i32)> {
    let bytes = cur.rest();
    let mut last_dash = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'-' => last_dash = Some(i),
            b' ' | b'\t' => {
                if let Some(dash) = last_dash {
                    let digits = &bytes[dash + 1..i];
                    if !digits.is_empty() && digits.iter().all(|d| d.is_ascii_digit()) {
                        let pid = digits_to_i32(digits)?;
                        let task = &bytes[..dash];
                        if task.is_empty() {
                            return None;
                        }
                        cur.advance_by(i);
                        return Some((normalize_task(task), pid));
                    }
                }
                // Whitespace inside the task name; keep scanning.
            }
            _ => {}
        }
    }
    None
}

fn normalize_task(task: &[u8]) -> Option<&[u8]> {
    if task == TRUNCATED_TASK {
        None
    } else {
        Some(task)
    }
}

fn digits_to_i32(digits: &[u8]) -> Option<i32> {
    let mut value: i64 = 0;
    for &b in digits {
        value = value * 10 + i64::from(b - b'0');
        if value > i64::from(i32::MAX) {
            return None;
        }
    }
    Some(value as i32)
}

/// The optional `(tgid)` column: `(  618)`, `(-----)`, `(-)`, or absent.
fn parse_tgid(cur: &mut ByteCursor<'_>) -> Option<Tgid> {
    if !cur.eat(b'(') {
        return Some(Tgid::Unknown);
    }
    cur.skip_spaces();
    let tgid = match cur.peek() {
        Some(b'-') | Some(b')') => Tgid::Unknown,
        Some(b) if b.is_ascii_digit() => Tgid::Known(cur.read_i32()?),
        _ => return None,
    };
    cur.skip_while(|b| b == b'-' || b == b' ');
    if !cur.eat(b')') {
        return None;
    }
    Some(tgid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_line_with_tgid_and_flags() {
        let line =
            b"  surfaceflinger-617   (  617) [001] ...1  1198.424757: tracing_mark_write: B|617|handleMessage";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.task, Some(&b"surfaceflinger"[..]));
        assert_eq!(parsed.pid, 617);
        assert_eq!(parsed.tgid, Tgid::Known(617));
        assert_eq!(parsed.cpu, 1);
        assert_eq!(parsed.timestamp, 1198.424757);
        assert_eq!(parsed.function, b"tracing_mark_write");
        assert_eq!(parsed.details.rest(), b"B|617|handleMessage");
    }

    #[test]
    fn test_old_line_without_tgid_or_flags() {
        let line = b"Thread-1-100   [000] 1.000: tracing_mark_write: B|100|DoWork";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.task, Some(&b"Thread-1"[..]));
        assert_eq!(parsed.pid, 100);
        assert_eq!(parsed.tgid, Tgid::Unknown);
        assert_eq!(parsed.cpu, 0);
        assert_eq!(parsed.timestamp, 1.0);
        assert_eq!(parsed.details.rest(), b"B|100|DoWork");
    }

    #[test]
    fn test_truncated_task_parses_to_none() {
        let line = b"           <...>-619   (-----) [001] ...1  1198.424757: tracing_mark_write: E";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.task, None);
        assert_eq!(parsed.pid, 619);
        assert_eq!(parsed.tgid, Tgid::Unknown);
        assert_eq!(parsed.details.rest(), b"E");
    }

    #[test]
    fn test_task_name_with_spaces() {
        let line = b" Signal Catcher-861   (  618) [002] d..2  100.5: sched_wakeup: comm=x pid=1 prio=120 target_cpu=001";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.task, Some(&b"Signal Catcher"[..]));
        assert_eq!(parsed.pid, 861);
        assert_eq!(parsed.tgid, Tgid::Known(618));
    }

    #[test]
    fn test_task_name_with_dashes() {
        let line = b"kworker/u16:1-33    [002] 5.000: workqueue_execute_start: work struct ff: function vmstat_update";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.task, Some(&b"kworker/u16:1"[..]));
        assert_eq!(parsed.pid, 33);
        assert_eq!(parsed.function, b"workqueue_execute_start");
        assert_eq!(parsed.details.rest(), b"work struct ff: function vmstat_update");
    }

    #[test]
    fn test_idle_task_is_a_real_name() {
        let line = b"          <idle>-0     [000] d..2  1198.5: sched_switch: prev_comm=swapper/0 prev_pid=0 prev_prio=120 prev_state=R ==> next_comm=adbd next_pid=1085 next_prio=120";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.task, Some(&b"<idle>"[..]));
        assert_eq!(parsed.pid, 0);
    }

    #[test]
    fn test_dash_only_tgid_variants() {
        let with_short_dash = b"app-1 (-) [000] 1.0: f: x";
        assert_eq!(parse_line(with_short_dash).unwrap().tgid, Tgid::Unknown);
        let with_empty_parens = b"app-1 () [000] 1.0: f: x";
        assert_eq!(parse_line(with_empty_parens).unwrap().tgid, Tgid::Unknown);
    }

    #[test]
    fn test_flags_of_any_width() {
        let five_wide = b"app-1 [000] d..2.  7.25: f: x";
        let parsed = parse_line(five_wide).unwrap();
        assert_eq!(parsed.timestamp, 7.25);
        assert_eq!(parsed.function, b"f");
    }

    #[test]
    fn test_payload_may_be_empty() {
        let line = b"app-1 [000] 1.0: f: ";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.details.rest(), b"");
    }

    #[test]
    fn test_missing_function_colon_is_malformed() {
        assert!(parse_line(b"app-1 [000] 1.0: no_terminator").is_none());
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(parse_line(b"did you mean to pass a binary trace?").is_none());
        assert!(parse_line(b"app-1 000] 1.0: f: x").is_none());
        assert!(parse_line(b"app-1 [000 1.0: f: x").is_none());
        assert!(parse_line(b"app-1 [000] notatime: f: x").is_none());
    }

    #[test]
    fn test_pid_overflow_is_malformed() {
        assert!(parse_line(b"app-99999999999 [000] 1.0: f: x").is_none());
    }
}
