//! String interning for names that outlive the line buffer.
//!
//! The tokenizer hands out byte slices borrowed from the reader's buffer.
//! Anything the model keeps (task names, slice names, counter keys) is copied
//! out exactly once through this cache; repeated occurrences share one
//! `Arc<str>` allocation. Traces repeat a small set of names millions of
//! times, so the cache keeps allocation proportional to distinct names, not
//! to line count.

use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct StringCache {
    strings: HashSet<Arc<str>>,
}

impl StringCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shared copy of `s`, inserting it on first sight.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(s);
        self.strings.insert(Arc::clone(&shared));
        shared
    }

    /// Intern raw line bytes. Invalid UTF-8 is replaced rather than rejected;
    /// kernel task names are not guaranteed to be valid UTF-8.
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> Arc<str> {
        match std::str::from_utf8(bytes) {
            Ok(s) => self.intern(s),
            Err(_) => {
                let lossy = String::from_utf8_lossy(bytes);
                self.intern(&lossy)
            }
        }
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_shares_allocation() {
        let mut cache = StringCache::new();
        let a = cache.intern("surfaceflinger");
        let b = cache.intern("surfaceflinger");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_intern_distinct_strings() {
        let mut cache = StringCache::new();
        let a = cache.intern("doFrame");
        let b = cache.intern("doFrame2");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_intern_bytes_matches_intern() {
        let mut cache = StringCache::new();
        let a = cache.intern_bytes(b"kworker/0:1");
        let b = cache.intern("kworker/0:1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_intern_bytes_invalid_utf8() {
        let mut cache = StringCache::new();
        let a = cache.intern_bytes(&[0x66, 0x6f, 0xff, 0x6f]);
        assert_eq!(&*a, "fo\u{fffd}o");
    }
}
