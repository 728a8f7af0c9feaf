//! Bounded in-memory response cache.
//!
//! Entries are raw response bytes costed by length. One mutex serializes the
//! key map, the access-order list, and the running cost, so callers never
//! observe torn state. Eviction is strict LRU by byte cost and happens
//! inside `put`; there is no TTL.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use bytes::Bytes;

use crate::cache::key::CacheKey;

/// Default cost limit: 4 MiB.
pub const DEFAULT_COST_LIMIT: usize = 4 * 1024 * 1024;

/// Point-in-time accounting for a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of retained entries.
    pub entry_count: usize,
    /// Sum of retained byte costs.
    pub total_cost: usize,
    /// The configured limit.
    pub cost_limit: usize,
    /// Number of distinct payloads among retained entries. Maintained by a
    /// payload-digest side index; the key map alone decides containment.
    pub distinct_payloads: usize,
}

struct CacheState {
    entries: HashMap<CacheKey, Bytes>,
    // Access order, least recently used at the front.
    order: VecDeque<CacheKey>,
    total_cost: usize,
    digests: HashMap<u64, usize>,
}

impl CacheState {
    fn promote(&mut self, key: &CacheKey) {
        self.order.retain(|existing| existing != key);
        self.order.push_back(key.clone());
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Bytes> {
        let bytes = self.entries.remove(key)?;
        self.order.retain(|existing| existing != key);
        self.total_cost -= bytes.len();
        self.forget_digest(&bytes);
        Some(bytes)
    }

    fn record_digest(&mut self, bytes: &Bytes) {
        *self.digests.entry(digest(bytes)).or_insert(0) += 1;
    }

    fn forget_digest(&mut self, bytes: &Bytes) {
        let key = digest(bytes);
        if let Some(count) = self.digests.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.digests.remove(&key);
            }
        }
    }
}

fn digest(bytes: &Bytes) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Thread-safe LRU response cache bounded by total byte cost.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    cost_limit: usize,
}

impl ResponseCache {
    /// An empty cache with the default 4 MiB limit.
    pub fn new() -> Self {
        Self::with_cost_limit(DEFAULT_COST_LIMIT)
    }

    /// An empty cache bounded by `cost_limit` bytes.
    pub fn with_cost_limit(cost_limit: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                total_cost: 0,
                digests: HashMap::new(),
            }),
            cost_limit,
        }
    }

    /// A cache with the default limit, seeded with `entries`. Seeding runs
    /// through `put`, so an oversized seed set evicts like live traffic.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CacheKey, Bytes)>,
    {
        let cache = Self::new();
        for (key, bytes) in entries {
            cache.put(key, bytes);
        }
        cache
    }

    /// Store `bytes` under `key`, replacing any existing entry, then evict
    /// least-recently-used entries until the total cost fits the limit. An
    /// entry larger than the whole limit does not survive its own insert.
    pub fn put(&self, key: CacheKey, bytes: impl Into<Bytes>) {
        let bytes = bytes.into();
        let mut state = self.state.lock().unwrap();
        state.remove(&key);
        state.total_cost += bytes.len();
        state.record_digest(&bytes);
        state.entries.insert(key.clone(), bytes);
        state.promote(&key);

        while state.total_cost > self.cost_limit {
            let Some(oldest) = state.order.front().cloned() else {
                break;
            };
            state.remove(&oldest);
        }
    }

    /// Fetch the bytes under `key`, promoting the entry to
    /// most-recently-used.
    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let mut state = self.state.lock().unwrap();
        let bytes = state.entries.get(key)?.clone();
        state.promote(key);
        Some(bytes)
    }

    /// Drop the entry under `key`, returning its bytes.
    pub fn remove(&self, key: &CacheKey) -> Option<Bytes> {
        self.state.lock().unwrap().remove(key)
    }

    /// Whether `key` is currently retained. Does not affect access order.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().unwrap().entries.contains_key(key)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.order.clear();
        state.digests.clear();
        state.total_cost = 0;
    }

    /// Copy of every retained entry.
    pub fn snapshot(&self) -> HashMap<CacheKey, Bytes> {
        self.state.lock().unwrap().entries.clone()
    }

    /// Current accounting.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap();
        CacheStats {
            entry_count: state.entries.len(),
            total_cost: state.total_cost,
            cost_limit: self.cost_limit,
            distinct_payloads: state.digests.len(),
        }
    }

    /// The configured cost limit in bytes.
    pub fn cost_limit(&self) -> usize {
        self.cost_limit
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_raw(name)
    }

    fn payload(len: usize) -> Bytes {
        Bytes::from(vec![b'x'; len])
    }

    #[test]
    fn get_is_idempotent() {
        let cache = ResponseCache::new();
        cache.put(key("a"), payload(16));
        let first = cache.get(&key("a"));
        let second = cache.get(&key("a"));
        assert_eq!(first, second);
        assert_eq!(first, Some(payload(16)));
    }

    #[test]
    fn missing_key_yields_nothing() {
        let cache = ResponseCache::new();
        assert_eq!(cache.get(&key("missing")), None);
        assert!(!cache.contains(&key("missing")));
    }

    #[test]
    fn total_cost_never_exceeds_limit() {
        let cache = ResponseCache::with_cost_limit(100);
        for i in 0..50 {
            cache.put(key(&format!("k{i}")), payload(7 + (i % 13)));
            let stats = cache.stats();
            assert!(
                stats.total_cost <= stats.cost_limit,
                "cost {} exceeded limit {} after put {}",
                stats.total_cost,
                stats.cost_limit,
                i
            );
        }
    }

    #[test]
    fn eviction_is_least_recently_used() {
        let cache = ResponseCache::with_cost_limit(30);
        cache.put(key("a"), payload(10));
        cache.put(key("b"), payload(10));
        cache.put(key("c"), payload(10));

        // Touch "a" so "b" becomes the oldest.
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("d"), payload(10));

        assert!(cache.contains(&key("a")));
        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
        assert!(cache.contains(&key("d")));
    }

    #[test]
    fn replacing_a_key_adjusts_cost() {
        let cache = ResponseCache::with_cost_limit(100);
        cache.put(key("a"), payload(40));
        cache.put(key("a"), payload(10));
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_cost, 10);
    }

    #[test]
    fn oversized_entry_does_not_survive_insert() {
        let cache = ResponseCache::with_cost_limit(20);
        cache.put(key("small"), payload(5));
        cache.put(key("huge"), payload(50));
        assert!(!cache.contains(&key("huge")));
        let stats = cache.stats();
        assert!(stats.total_cost <= stats.cost_limit);
    }

    #[test]
    fn clear_resets_accounting() {
        let cache = ResponseCache::new();
        cache.put(key("a"), payload(8));
        cache.put(key("b"), payload(8));
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_cost, 0);
        assert_eq!(stats.distinct_payloads, 0);
        assert_eq!(cache.get(&key("a")), None);
    }

    #[test]
    fn snapshot_copies_every_entry() {
        let cache = ResponseCache::with_entries([
            (key("a"), payload(4)),
            (key("b"), payload(6)),
        ]);
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&key("a")), Some(&payload(4)));
        assert_eq!(snapshot.get(&key("b")), Some(&payload(6)));
    }

    #[test]
    fn identical_payloads_count_once_in_dedup_accounting() {
        let cache = ResponseCache::new();
        cache.put(key("a"), payload(12));
        cache.put(key("b"), payload(12));
        cache.put(key("c"), payload(3));
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.distinct_payloads, 2);

        cache.remove(&key("a"));
        assert_eq!(cache.stats().distinct_payloads, 2);
        cache.remove(&key("b"));
        assert_eq!(cache.stats().distinct_payloads, 1);
    }

    #[test]
    fn remove_returns_the_bytes() {
        let cache = ResponseCache::new();
        cache.put(key("a"), payload(9));
        assert_eq!(cache.remove(&key("a")), Some(payload(9)));
        assert_eq!(cache.remove(&key("a")), None);
        assert_eq!(cache.stats().total_cost, 0);
    }
}
