//! Mutable state for one import run: the fragment under construction, the
//! tid → process index, and the string cache.
//!
//! All thread and process access from handlers goes through [`thread_for`] /
//! [`process_for`] so the pid index can never drift from the model. A thread
//! seen before its process is known lives under a placeholder key until some
//! later line names the tgid, at which point the placeholder is merged into
//! the identified process in one explicit step.
//!
//! [`thread_for`]: FtraceImporterState::thread_for
//! [`process_for`]: FtraceImporterState::process_for

use std::collections::HashMap;

use crate::feedback::{ImportFeedback, ImportWarning};
use crate::intern::StringCache;
use crate::line::Tgid;
use crate::model::{ModelFragment, ProcessKey, ProcessModelFragment, ThreadModelFragment};

pub struct FtraceImporterState {
    fragment: ModelFragment,
    pid_map: HashMap<i32, ProcessKey>,
    cache: StringCache,
    next_placeholder: u32,
}

impl FtraceImporterState {
    pub fn new() -> Self {
        Self {
            fragment: ModelFragment::default(),
            pid_map: HashMap::new(),
            cache: StringCache::new(),
            next_placeholder: 0,
        }
    }

    pub fn fragment_mut(&mut self) -> &mut ModelFragment {
        &mut self.fragment
    }

    pub fn cache_mut(&mut self) -> &mut StringCache {
        &mut self.cache
    }

    /// Look up or create the thread for `pid`, applying whatever the line
    /// revealed: a task name hint, and possibly the owning tgid.
    ///
    /// Name hints fill in missing names and never overwrite known ones.
    /// Identity is stickier still: once a thread belongs to an identified
    /// process, a different claimed tgid is reported and ignored.
    pub fn thread_for(
        &mut self,
        pid: i32,
        tgid: Tgid,
        task: Option<&[u8]>,
        feedback: &mut dyn ImportFeedback,
    ) -> &mut ThreadModelFragment {
        let key = self.register(pid, tgid, task, feedback);
        let process = self
            .fragment
            .processes
            .entry(key)
            .or_insert_with(|| ProcessModelFragment::new(key.known_pid()));
        process
            .threads
            .entry(pid)
            .or_insert_with(|| ThreadModelFragment::new(pid))
    }

    /// Like [`Self::thread_for`], but hands back the owning process (for
    /// counter samples, which attach to the process rather than the thread).
    pub fn process_for(
        &mut self,
        pid: i32,
        tgid: Tgid,
        task: Option<&[u8]>,
        feedback: &mut dyn ImportFeedback,
    ) -> &mut ProcessModelFragment {
        let key = self.register(pid, tgid, task, feedback);
        self.fragment
            .processes
            .entry(key)
            .or_insert_with(|| ProcessModelFragment::new(key.known_pid()))
    }

    /// Finalize: drain every thread's open-slice stack and hand the pid
    /// index over to the fragment for downstream navigation.
    pub fn into_fragment(mut self) -> ModelFragment {
        for process in self.fragment.processes.values_mut() {
            for thread in process.threads.values_mut() {
                thread.slices.finish();
            }
        }
        self.fragment.thread_index = self.pid_map;
        self.fragment
    }

    /// Resolve `pid` to its process key, create missing process/thread
    /// entries, and apply name hints. The single write path for `pid_map`.
    fn register(
        &mut self,
        pid: i32,
        tgid: Tgid,
        task: Option<&[u8]>,
        feedback: &mut dyn ImportFeedback,
    ) -> ProcessKey {
        let key = self.resolve_process_key(pid, tgid, feedback);
        let process = self
            .fragment
            .processes
            .entry(key)
            .or_insert_with(|| ProcessModelFragment::new(key.known_pid()));
        let thread = process
            .threads
            .entry(pid)
            .or_insert_with(|| ThreadModelFragment::new(pid));
        if let Some(name) = task.filter(|t| !t.is_empty()) {
            if thread.name.is_none() {
                thread.name = Some(self.cache.intern_bytes(name));
            }
            // The main thread's task name doubles as the process name.
            if key == ProcessKey::Known(pid) && process.name.is_none() {
                process.name = Some(self.cache.intern_bytes(name));
            }
        }
        key
    }

    fn resolve_process_key(
        &mut self,
        pid: i32,
        tgid: Tgid,
        feedback: &mut dyn ImportFeedback,
    ) -> ProcessKey {
        if let Some(&existing) = self.pid_map.get(&pid) {
            return match (existing, tgid) {
                (ProcessKey::Placeholder(_), Tgid::Known(target)) => {
                    self.merge_into(existing, target)
                }
                (ProcessKey::Known(current), Tgid::Known(claimed)) if current != claimed => {
                    feedback.report_warning(ImportWarning::ConflictingTgid {
                        pid,
                        existing: current,
                        claimed,
                    });
                    existing
                }
                _ => existing,
            };
        }
        let key = match tgid {
            Tgid::Known(tgid) => ProcessKey::Known(tgid),
            Tgid::Unknown => {
                let key = ProcessKey::Placeholder(self.next_placeholder);
                self.next_placeholder += 1;
                key
            }
        };
        self.pid_map.insert(pid, key);
        key
    }

    /// Fold a placeholder process into the now-identified one: move its
    /// threads and counters over, retarget their index entries, keep the
    /// already-known name when both sides have one.
    fn merge_into(&mut self, source: ProcessKey, target_pid: i32) -> ProcessKey {
        let target_key = ProcessKey::Known(target_pid);
        let Some(source_process) = self.fragment.processes.remove(&source) else {
            return target_key;
        };
        let target = self
            .fragment
            .processes
            .entry(target_key)
            .or_insert_with(|| ProcessModelFragment::new(Some(target_pid)));
        if target.name.is_none() {
            target.name = source_process.name;
        }
        for (tid, thread) in source_process.threads {
            self.pid_map.insert(tid, target_key);
            target.threads.insert(tid, thread);
        }
        for (name, samples) in source_process.counters {
            target.counters.entry(name).or_default().extend(samples);
        }
        target_key
    }
}

impl Default for FtraceImporterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::CollectingFeedback;

    #[test]
    fn test_known_tgid_creates_identified_process() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        let thread = state.thread_for(100, Tgid::Known(100), Some(b"app"), &mut feedback);
        assert_eq!(thread.tid, 100);
        assert_eq!(thread.name.as_deref(), Some("app"));

        let fragment = state.into_fragment();
        let process = fragment.process(100).unwrap();
        assert_eq!(process.id, Some(100));
        assert_eq!(process.name.as_deref(), Some("app"));
        assert_eq!(fragment.thread_index[&100], ProcessKey::Known(100));
    }

    #[test]
    fn test_unknown_tgid_creates_placeholder() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        state.thread_for(43, Tgid::Unknown, Some(b"worker"), &mut feedback);

        let fragment = state.into_fragment();
        assert!(fragment.process(43).is_none());
        let key = fragment.thread_index[&43];
        assert!(matches!(key, ProcessKey::Placeholder(_)));
        let process = &fragment.processes[&key];
        assert_eq!(process.id, None);
        // A placeholder cannot know it is the main thread, so no process name.
        assert_eq!(process.name, None);
    }

    #[test]
    fn test_placeholder_merges_when_tgid_appears() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        state.thread_for(43, Tgid::Unknown, Some(b"worker"), &mut feedback);
        state.thread_for(42, Tgid::Known(42), Some(b"app"), &mut feedback);
        // Same thread again, now with its tgid revealed.
        state.thread_for(43, Tgid::Known(42), Some(b"worker"), &mut feedback);

        let fragment = state.into_fragment();
        assert_eq!(fragment.processes.len(), 1);
        let process = fragment.process(42).unwrap();
        assert_eq!(process.threads.len(), 2);
        assert_eq!(process.name.as_deref(), Some("app"));
        assert_eq!(fragment.thread_index[&43], ProcessKey::Known(42));
        assert_eq!(fragment.thread_index[&42], ProcessKey::Known(42));
        assert!(feedback.warnings.is_empty());
    }

    #[test]
    fn test_merge_into_process_seen_only_via_payload() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        // Thread seen with no process, then a payload names tgid 42 before
        // any line for pid 42 itself exists.
        state.thread_for(43, Tgid::Unknown, None, &mut feedback);
        state.thread_for(43, Tgid::Known(42), None, &mut feedback);

        let fragment = state.into_fragment();
        let process = fragment.process(42).unwrap();
        assert_eq!(process.id, Some(42));
        assert!(process.threads.contains_key(&43));
        assert_eq!(fragment.thread_index[&43], ProcessKey::Known(42));
    }

    #[test]
    fn test_name_hints_fill_but_never_overwrite() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        state.thread_for(100, Tgid::Known(100), None, &mut feedback);
        state.thread_for(100, Tgid::Known(100), Some(b"first"), &mut feedback);
        state.thread_for(100, Tgid::Known(100), Some(b"second"), &mut feedback);

        let fragment = state.into_fragment();
        let thread = fragment.thread(100).unwrap();
        assert_eq!(thread.name.as_deref(), Some("first"));
        assert_eq!(fragment.process(100).unwrap().name.as_deref(), Some("first"));
    }

    #[test]
    fn test_conflicting_tgid_keeps_first_and_warns() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        state.thread_for(7, Tgid::Known(100), None, &mut feedback);
        state.thread_for(7, Tgid::Known(200), None, &mut feedback);

        assert_eq!(
            feedback.warnings,
            vec![ImportWarning::ConflictingTgid {
                pid: 7,
                existing: 100,
                claimed: 200,
            }]
        );

        let fragment = state.into_fragment();
        assert_eq!(fragment.thread_index[&7], ProcessKey::Known(100));
        assert!(fragment.process(200).is_none());
    }

    #[test]
    fn test_merge_preserves_placeholder_name_when_target_unnamed() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        // Placeholder whose main-thread-ness is unknowable, carrying only a
        // thread name; the identified process has no name of its own yet.
        state.thread_for(43, Tgid::Unknown, Some(b"worker"), &mut feedback);
        state.thread_for(43, Tgid::Known(42), None, &mut feedback);

        let fragment = state.into_fragment();
        let process = fragment.process(42).unwrap();
        assert_eq!(process.name, None);
        assert_eq!(
            process.threads[&43].name.as_deref(),
            Some("worker"),
            "thread names travel with the merge"
        );
    }

    #[test]
    fn test_counters_travel_with_merge() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        let name = state.cache_mut().intern("cpu_freq");
        let process = state.process_for(43, Tgid::Unknown, None, &mut feedback);
        process.add_counter_sample(name, 1.0, 100.0);
        state.thread_for(43, Tgid::Known(42), None, &mut feedback);

        let fragment = state.into_fragment();
        let process = fragment.process(42).unwrap();
        assert_eq!(process.counters["cpu_freq"].len(), 1);
    }

    #[test]
    fn test_distinct_unknown_threads_get_distinct_placeholders() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        state.thread_for(1, Tgid::Unknown, None, &mut feedback);
        state.thread_for(2, Tgid::Unknown, None, &mut feedback);

        let fragment = state.into_fragment();
        assert_eq!(fragment.processes.len(), 2);
        assert_ne!(fragment.thread_index[&1], fragment.thread_index[&2]);
    }

    #[test]
    fn test_main_thread_names_process_even_without_line_tgid() {
        let mut state = FtraceImporterState::new();
        let mut feedback = CollectingFeedback::new();

        // Process identified first, then its main thread shows up on a line
        // with no tgid column.
        state.thread_for(42, Tgid::Known(42), None, &mut feedback);
        state.thread_for(42, Tgid::Unknown, Some(b"app"), &mut feedback);

        let fragment = state.into_fragment();
        assert_eq!(fragment.process(42).unwrap().name.as_deref(), Some("app"));
    }
}
