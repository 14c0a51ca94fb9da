//! Per-key mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lazily created lock per key.
///
/// Entries are never evicted, so the map holds one lock per distinct key seen.
/// Keys are cell ids taken from stored topology, which bounds the growth.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `key`, created on first use
    pub fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of keys that have had a lock created
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquire `lock`, ignoring poisoning; the guarded data is `()`
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_lock_per_distinct_key() {
        let locks = KeyedLocks::new();
        assert!(locks.is_empty());

        let first = locks.lock_for(&"c1".to_string());
        let again = locks.lock_for(&"c1".to_string());
        locks.lock_for(&"c2".to_string());

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(locks.len(), 2);
    }
}
