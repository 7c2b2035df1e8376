use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::utils::clock::Clock;

struct Entry<V> {
    value: V,
    created_at: i64,
}

/// Time-bounded map shared by the context, profile and behavior caches.
///
/// An entry older than `ttl_secs` is never returned; it is dropped on the
/// read that finds it. When the map is full and purging frees nothing,
/// `put` is skipped and the cache just misses.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl_secs: i64,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl_secs: u64, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_secs: ttl_secs as i64,
            capacity,
            clock,
        }
    }

    fn is_fresh(&self, created_at: i64, now: i64) -> bool {
        now - created_at < self.ttl_secs
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.timestamp();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if self.is_fresh(entry.created_at, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Returns false when the value was not stored.
    pub fn put(&self, key: K, value: V) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let now = self.clock.timestamp();
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.retain(|_, e| now - e.created_at < self.ttl_secs);
            if entries.len() >= self.capacity {
                log::warn!(
                    "[Cache] full at {} entries, skipping insert",
                    self.capacity
                );
                return false;
            }
        }
        entries.insert(
            key,
            Entry {
                value,
                created_at: now,
            },
        );
        true
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    /// Drop every entry whose key matches.
    pub fn invalidate_where<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| !pred(k));
        before - entries.len()
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.timestamp();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| now - e.created_at < self.ttl_secs);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
