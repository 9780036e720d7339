//! Event-function dispatch.
//!
//! The table is built once per importer from the closed set of handler
//! families below. Each family contributes `(event name, handler)` pairs; a
//! duplicate event name across families is a construction-time panic, not a
//! runtime trace error. Lookup is by the raw byte key the tokenizer produced,
//! so the ~90% of lines whose event has no handler cost one hash probe and no
//! allocation.

pub mod marker;
pub mod sched;
pub mod workqueue;

use std::collections::HashMap;

use crate::feedback::{ImportFeedback, ImportWarning};
use crate::line::FtraceLine;
use crate::state::FtraceImporterState;

/// One event handler. The line and its byte slices are valid only for this
/// call; anything kept is interned first. A returned warning means the line's
/// payload was unusable; the driver reports it and moves on.
pub type HandlerFn =
    fn(&FtraceLine<'_>, &mut FtraceImporterState, &mut dyn ImportFeedback) -> Result<(), ImportWarning>;

pub struct DispatchTable {
    handlers: HashMap<&'static [u8], HandlerFn>,
}

impl DispatchTable {
    /// Assemble the table from every handler family.
    ///
    /// Panics when two families register the same event name: that is a bug
    /// in the registry lists, never a property of the input.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static [u8], HandlerFn> = HashMap::new();
        let families = [marker::HANDLERS, workqueue::HANDLERS, sched::HANDLERS];
        for &(name, handler) in families.into_iter().flatten() {
            if handlers.insert(name, handler).is_some() {
                panic!(
                    "duplicate handler registered for event '{}'",
                    String::from_utf8_lossy(name)
                );
            }
        }
        Self { handlers }
    }

    pub fn lookup(&self, function: &[u8]) -> Option<HandlerFn> {
        self.handlers.get(function).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the warning for a payload the event's handler could not parse.
fn malformed(line: &FtraceLine<'_>) -> ImportWarning {
    ImportWarning::MalformedPayload {
        event: String::from_utf8_lossy(line.function).into_owned(),
        payload: String::from_utf8_lossy(line.details.rest()).into_owned(),
    }
}
