//! Storage for rate limit entries.

use std::collections::HashMap;

use super::entry::RateLimitEntry;

/// Key-value storage for rate limit entries.
///
/// The limiter serializes every call into a store behind its own lock, so
/// implementations do not need interior synchronization. A shared backend
/// (one counter set for several instances) plugs in here.
pub trait RateLimitStore: Send {
    /// Look up the entry for a key.
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Insert or replace the entry for a key.
    fn set(&mut self, key: &str, entry: RateLimitEntry);

    /// Remove the entry for a key, returning it if present.
    fn delete(&mut self, key: &str) -> Option<RateLimitEntry>;

    /// Iterate over all stored entries.
    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &RateLimitEntry)> + '_>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    fn clear(&mut self) {
        let keys: Vec<String> = self.iter().map(|(k, _)| k.to_string()).collect();
        for key in keys {
            self.delete(&key);
        }
    }
}

/// In-process store. State is lost when the process restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, RateLimitEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn delete(&mut self, key: &str) -> Option<RateLimitEntry> {
        self.entries.remove(key)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &RateLimitEntry)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k.as_str(), v)))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("a", RateLimitEntry::start("a", 0, 1_000));
        assert_eq!(store.get("a").map(|e| e.count), Some(1));
        assert_eq!(store.len(), 1);

        let removed = store.delete("a");
        assert!(removed.is_some());
        assert!(store.get("a").is_none());
        assert!(store.delete("a").is_none());
    }

    #[test]
    fn test_iter_and_clear() {
        let mut store = MemoryStore::new();
        store.set("a", RateLimitEntry::start("a", 0, 1_000));
        store.set("b", RateLimitEntry::start("b", 0, 2_000));

        let mut keys: Vec<&str> = store.iter().map(|(k, _)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);

        store.clear();
        assert!(store.is_empty());
    }
}
