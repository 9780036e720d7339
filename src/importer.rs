//! Top-level import driver and format sniffing.
//!
//! `FtraceImporter` owns the dispatch table and drives one pass over the
//! input: skip everything before the header, watch comment lines for the
//! per-CPU buffer-start marker, tokenize and dispatch data lines, and hand
//! back the finished fragment at end of stream.
//!
//! A buffer-start marker reappearing mid-trace means a CPU's ring buffer only
//! begins logging there; the prefix built so far may be missing that CPU's
//! events entirely. The policy is to discard all accumulated state and start
//! over rather than reconcile per-CPU offsets. Precision over completeness.

use std::io::Read;
use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::feedback::{ImportError, ImportFeedback, ImportWarning};
use crate::handlers::DispatchTable;
use crate::line::parse_line;
use crate::model::ModelFragment;
use crate::reader::{LineReader, DEFAULT_MAX_LINE_LEN};
use crate::state::FtraceImporterState;

/// How far into the stream the sniffer looks for the tracer marker.
const SNIFF_WINDOW: usize = 1000;

const SNIFF_MARKER: &[u8] = b"# tracer: nop\n";

static BUFFER_STARTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#+ CPU \d buffer started #+").expect("invalid buffer-start marker pattern")
});

/// Whether `buf` looks like an ftrace text trace: the literal
/// `# tracer: nop\n` within the first 1000 bytes. Cheap format-level
/// dispatch for callers choosing between importers.
pub fn is_ftrace_text(buf: &[u8]) -> bool {
    let window = &buf[..buf.len().min(SNIFF_WINDOW)];
    window
        .windows(SNIFF_MARKER.len())
        .any(|w| w == SNIFF_MARKER)
}

/// One import pass over an ftrace text stream.
///
/// The importer itself is stateless between calls (the table is fn pointers);
/// each `import` builds its own state, so a shared `FtraceImporter` can serve
/// concurrent imports from separate threads.
pub struct FtraceImporter {
    table: DispatchTable,
    max_line_len: usize,
}

impl FtraceImporter {
    pub fn new() -> Self {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            table: DispatchTable::new(),
            max_line_len,
        }
    }

    /// Import everything `source` yields, reporting recoverable problems to
    /// `feedback`. Fatal errors (I/O, oversized line) abort the import and
    /// return `Err`; no partial fragment survives them.
    pub fn import<R: Read>(
        &self,
        source: R,
        feedback: &mut dyn ImportFeedback,
    ) -> Result<ModelFragment, ImportError> {
        let mut reader = LineReader::with_max_line_len(source, self.max_line_len);
        let mut state = FtraceImporterState::new();
        let mut found_header = false;

        loop {
            let line = match reader.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    feedback.report_error(&err);
                    return Err(err);
                }
            };
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            if line.starts_with(b"#") {
                found_header = true;
                if BUFFER_STARTED_RE.is_match(line) {
                    // A CPU's visible window starts here; everything built
                    // from the prefix is unreliable.
                    state = FtraceImporterState::new();
                }
                continue;
            }
            if !found_header {
                continue;
            }

            let Some(parsed) = parse_line(line) else {
                feedback.report_warning(ImportWarning::MalformedLine {
                    line: String::from_utf8_lossy(line).into_owned(),
                });
                continue;
            };
            state.fragment_mut().update_time_bounds(parsed.timestamp);
            if let Some(handler) = self.table.lookup(parsed.function) {
                if let Err(warning) = handler(&parsed, &mut state, feedback) {
                    feedback.report_warning(warning);
                }
            }
        }

        Ok(state.into_fragment())
    }
}

impl Default for FtraceImporter {
    fn default() -> Self {
        Self::new()
    }
}
