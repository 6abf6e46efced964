//! In-Memory Store
//!
//! This module implements the backing store for tinycache: a plain mapping
//! from key to value with overwrite semantics.
//!
//! ## Design Decisions
//!
//! 1. **No eviction, no expiry, no deletion**: once a key is present it stays,
//!    holding the value of the most recent SET.
//! 2. **One lock**: the server handles one request at a time, so there is
//!    never more than one writer. The `RwLock` keeps the store sound if a
//!    caller shares it across threads anyway.
//! 3. **Bytes everywhere**: keys and values are `Bytes` slices of the request
//!    buffer, so storing them does not copy the payload.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The key-value store.
///
/// Created empty at server start and shared with the server through an
/// `Arc`. Every operation is total: `get` and `set` never fail.
///
/// # Example
///
/// ```
/// use tinycache::storage::Store;
/// use bytes::Bytes;
///
/// let store = Store::new();
/// assert_eq!(store.get(b"foo"), None);
///
/// store.set(Bytes::from("foo"), Bytes::from("foo value"));
/// assert_eq!(store.get(b"foo"), Some(Bytes::from("foo value")));
/// ```
#[derive(Default)]
pub struct Store {
    data: RwLock<HashMap<Bytes, Bytes>>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: GETs that found their key
    hit_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value most recently set for `key`, or `None` if the key
    /// has never been set.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let value = self.read().get(key).cloned();
        if value.is_some() {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        self.write().insert(key, value);
    }

    /// Returns the number of keys in the store.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no key has been set yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let gets = self.get_count.load(Ordering::Relaxed);
        let hits = self.hit_count.load(Ordering::Relaxed);
        StoreStats {
            keys: self.len(),
            gets,
            hits,
            misses: gets.saturating_sub(hits),
            sets: self.set_count.load(Ordering::Relaxed),
        }
    }

    // Every write is a single insert, so a panic while the lock is held cannot
    // leave the map half-updated and the poison flag can be ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Bytes>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Bytes>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of keys currently stored
    pub keys: usize,
    /// Total GET operations
    pub gets: u64,
    /// GETs that found their key
    pub hits: u64,
    /// GETs that did not
    pub misses: u64,
    /// Total SET operations
    pub sets: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let store = Store::new();

        store.set(Bytes::from("key"), Bytes::from("value"));
        assert_eq!(store.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = Store::new();
        assert_eq!(store.get(b"nonexistent"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let store = Store::new();

        store.set(Bytes::from("bar"), Bytes::from("bar value"));
        assert_eq!(store.get(b"bar"), Some(Bytes::from("bar value")));

        store.set(Bytes::from("bar"), Bytes::from("bar value updated"));
        assert_eq!(store.get(b"bar"), Some(Bytes::from("bar value updated")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_same_value_is_idempotent() {
        let store = Store::new();

        store.set(Bytes::from("k"), Bytes::from("v"));
        store.set(Bytes::from("k"), Bytes::from("v"));

        assert_eq!(store.get(b"k"), Some(Bytes::from("v")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_are_binary() {
        let store = Store::new();

        store.set(Bytes::from_static(b"\xffkey"), Bytes::from("a"));
        store.set(Bytes::from_static(b"key"), Bytes::from("b"));

        assert_eq!(store.get(b"\xffkey"), Some(Bytes::from("a")));
        assert_eq!(store.get(b"key"), Some(Bytes::from("b")));
    }

    #[test]
    fn test_stats() {
        let store = Store::new();

        store.set(Bytes::from("a"), Bytes::from("1"));
        store.set(Bytes::from("b"), Bytes::from("2"));
        store.get(b"a");
        store.get(b"missing");

        assert_eq!(
            store.stats(),
            StoreStats {
                keys: 2,
                gets: 2,
                hits: 1,
                misses: 1,
                sets: 2,
            }
        );
    }

    #[test]
    fn test_shared_across_threads() {
        let store = Arc::new(Store::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.set(
                            Bytes::from(format!("key:{}:{}", t, i)),
                            Bytes::from(format!("value:{}", i)),
                        );
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
        assert_eq!(store.get(b"key:3:99"), Some(Bytes::from("value:99")));
    }
}
