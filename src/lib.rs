//! Streaming importer for Linux ftrace/atrace text traces.
//!
//! Reads a trace line by line from any [`std::io::Read`] source, dispatches
//! on the embedded event-function name, and builds a queryable model of
//! processes, threads, nested slices, scheduling states, and counters.
//!
//! # Modules
//!
//! - [`importer`] - the top-level driver and format sniffer
//! - [`model`] - the `ModelFragment` object graph an import produces
//! - [`feedback`] - the diagnostics sink and warning/error types
//! - [`summary`] - serde-friendly summary views for CLI/JSON output
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use ftrace_import::{CollectingFeedback, FtraceImporter};
//!
//! let file = File::open("trace.txt").expect("Failed to open trace");
//! let mut feedback = CollectingFeedback::new();
//! let fragment = FtraceImporter::new()
//!     .import(file, &mut feedback)
//!     .expect("Import failed");
//!
//! for process in fragment.processes.values() {
//!     println!("{:?}: {} threads", process.name, process.threads.len());
//! }
//! ```

pub mod cursor;
pub mod feedback;
pub mod handlers;
pub mod importer;
pub mod intern;
pub mod line;
pub mod model;
pub mod reader;
pub mod state;
pub mod summary;

// Re-export for convenience
pub use feedback::{
    CollectingFeedback, ImportError, ImportFeedback, ImportWarning, StderrFeedback,
};
pub use importer::{is_ftrace_text, FtraceImporter};
pub use line::Tgid;
pub use model::{
    CounterSample, ModelFragment, ProcessKey, ProcessModelFragment, SchedulingState, Slice,
    ThreadModelFragment,
};
pub use summary::{ImportSummary, ProcessSummary};
