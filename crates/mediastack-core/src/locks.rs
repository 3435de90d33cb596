//! Per-key async mutual exclusion.
//!
//! Provides [`KeyedLocks`], a concurrent registry that hands out one
//! [`tokio::sync::Mutex`] per key. Entries are created on first use and
//! evicted when the last guard for a key is dropped, so the registry only
//! holds keys with work in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Thread-safe registry of per-key async mutexes.
///
/// # Examples
///
/// ```
/// use mediastack_core::KeyedLocks;
///
/// # tokio_test::block_on(async {
/// let locks = KeyedLocks::new();
/// let guard = locks.lock("upload-1").await;
/// assert!(locks.try_lock("upload-1").is_none());
/// assert!(locks.try_lock("upload-2").is_some());
/// drop(guard);
/// assert!(locks.try_lock("upload-1").is_some());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, waiting until it is free.
    pub async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let mutex = self.slot(key);
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            locks: self,
            key: key.to_owned(),
            guard: Some(guard),
        }
    }

    /// Acquire the lock for `key` only if nobody holds it.
    #[must_use]
    pub fn try_lock(&self, key: &str) -> Option<KeyedGuard<'_>> {
        let mutex = self.slot(key);
        match mutex.try_lock_owned() {
            Ok(guard) => Some(KeyedGuard {
                locks: self,
                key: key.to_owned(),
                guard: Some(guard),
            }),
            Err(_) => None,
        }
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        self.inner
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // Only the map holds the mutex once every guard and waiter is gone.
    fn evict_if_idle(&self, key: &str) {
        self.inner
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Guard returned by [`KeyedLocks::lock`]; releases the key on drop.
#[derive(Debug)]
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedGuard<'_> {
    /// The key this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.evict_if_idle(&self.key);
    }
}
