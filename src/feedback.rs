//! Import diagnostics: warnings, fatal errors, and the feedback sink.
//!
//! The importer never aborts on a single bad line. Recoverable problems are
//! reported as [`ImportWarning`] values through an [`ImportFeedback`] sink and
//! the line is skipped; only I/O failures and oversized lines surface as
//! [`ImportError`] and end the import.

use std::fmt;
use std::io;

/// Fatal errors that abort an import. No partial model is returned.
#[derive(Debug)]
pub enum ImportError {
    /// The underlying byte source failed.
    Io(io::Error),
    /// A single line exceeded the configured maximum length.
    LineTooLong { limit: usize },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "read error: {err}"),
            ImportError::LineTooLong { limit } => {
                write!(f, "line exceeded the maximum length of {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::LineTooLong { .. } => None,
        }
    }
}

impl From<io::Error> for ImportError {
    fn from(err: io::Error) -> Self {
        ImportError::Io(err)
    }
}

/// Recoverable per-line problems. The offending line is skipped and the
/// import continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// A non-blank data line did not match the ftrace line grammar.
    MalformedLine { line: String },
    /// A line matched the grammar but its event payload did not.
    MalformedPayload { event: String, payload: String },
    /// A thread was claimed by a second process. The first-seen identity is
    /// kept; name hints, by contrast, are fill-if-unset.
    ConflictingTgid {
        pid: i32,
        existing: i32,
        claimed: i32,
    },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::MalformedLine { line } => {
                write!(f, "skipping unparseable line: '{line}'")
            }
            ImportWarning::MalformedPayload { event, payload } => {
                write!(f, "{event}: malformed payload '{payload}'")
            }
            ImportWarning::ConflictingTgid {
                pid,
                existing,
                claimed,
            } => {
                write!(
                    f,
                    "thread {pid} already belongs to process {existing}, ignoring claim by {claimed}"
                )
            }
        }
    }
}

/// Sink for diagnostics emitted during an import.
pub trait ImportFeedback {
    /// Report a recoverable problem. The import continues.
    fn report_warning(&mut self, warning: ImportWarning);

    /// Report the fatal error that is about to abort the import.
    fn report_error(&mut self, error: &ImportError);
}

/// Feedback sink that stores everything it receives.
///
/// Useful for tests and for callers that want to inspect diagnostics after
/// the import instead of streaming them.
#[derive(Debug, Default)]
pub struct CollectingFeedback {
    pub warnings: Vec<ImportWarning>,
    pub errors: Vec<String>,
}

impl CollectingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl ImportFeedback for CollectingFeedback {
    fn report_warning(&mut self, warning: ImportWarning) {
        self.warnings.push(warning);
    }

    fn report_error(&mut self, error: &ImportError) {
        self.errors.push(error.to_string());
    }
}

/// Feedback sink that prints diagnostics to stderr, one per line.
#[derive(Debug, Default)]
pub struct StderrFeedback;

impl ImportFeedback for StderrFeedback {
    fn report_warning(&mut self, warning: ImportWarning) {
        eprintln!("Warning: {warning}");
    }

    fn report_error(&mut self, error: &ImportError) {
        eprintln!("Error: {error}");
    }
}
