use std::collections::{HashMap, VecDeque};

/// String-keyed store with an optional bound and FIFO eviction.
///
/// Eviction order is insertion order. Reads never reorder entries, and
/// replacing the value of an existing key keeps its original position.
#[derive(Debug, Clone)]
pub struct CacheStore<V> {
    entries: HashMap<String, V>,
    order: VecDeque<String>,
    max_size: usize,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<V> CacheStore<V> {
    /// `max_size == 0` leaves the store unbounded.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    pub fn max_size(&self) -> Option<usize> {
        (self.max_size > 0).then_some(self.max_size)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `value` under `key`. When the bound would be exceeded the
    /// oldest-inserted entry is dropped first and its key returned.
    pub fn insert(&mut self, key: String, value: V) -> Option<String> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.max_size > 0 && self.entries.len() >= self.max_size {
            self.evict_oldest()
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let value = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let key = self.order.pop_front()?;
        self.entries.remove(&key);
        log::debug!("cache full ({} entries); evicted `{key}`", self.max_size);
        Some(key)
    }

    /// Drops every entry. Always succeeds.
    pub fn clear(&mut self) -> bool {
        self.entries.clear();
        self.order.clear();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from oldest to newest insertion.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<V>(store: &CacheStore<V>) -> Vec<&str> {
        store.keys().collect()
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let mut store = CacheStore::new(0);
        for i in 0..100 {
            assert_eq!(store.insert(format!("k{i}"), i), None);
        }
        assert_eq!(store.len(), 100);
        assert_eq!(store.max_size(), None);
    }

    #[test]
    fn test_fifo_eviction_ignores_reads() {
        let mut store = CacheStore::new(2);
        store.insert("a".into(), 1);
        store.insert("b".into(), 2);

        // a read of "a" would save it under LRU; FIFO still evicts it
        assert_eq!(store.get("a"), Some(&1));
        assert_eq!(store.insert("c".into(), 3), Some("a".to_string()));

        assert!(!store.contains("a"));
        assert_eq!(keys(&store), vec!["b", "c"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = CacheStore::new(2);
        store.insert("a".into(), 1);
        store.insert("b".into(), 2);
        assert_eq!(store.insert("a".into(), 10), None);
        assert_eq!(store.get("a"), Some(&10));

        assert_eq!(store.insert("c".into(), 3), Some("a".to_string()));
        assert_eq!(keys(&store), vec!["b", "c"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = CacheStore::new(3);
        store.insert("a".into(), 1);
        store.insert("b".into(), 2);
        assert_eq!(store.remove("a"), Some(1));
        assert_eq!(store.remove("a"), None);
        assert_eq!(keys(&store), vec!["b"]);

        assert!(store.clear());
        assert!(store.is_empty());
        assert_eq!(keys(&store).len(), 0);
        assert!(store.clear());
    }
}
