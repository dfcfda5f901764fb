//! In-memory cache store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::entry::CacheEntry;
use super::store::{CacheStats, CacheStore, CacheStoreError};

/// Process-local cache.
///
/// Expired entries are dropped lazily on read and in bulk by
/// [`evict_expired`](Self::evict_expired), which the daemon runs on an
/// interval. There is no size-based eviction.
#[derive(Default)]
pub struct InMemoryCacheStore {
  data: RwLock<HashMap<String, CacheEntry>>,
  hits: AtomicU64,
  misses: AtomicU64,
  expired: AtomicU64,
}

impl InMemoryCacheStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drop every expired entry; returns how many were removed
  pub fn evict_expired(&self) -> usize {
    let mut data = self.data.write();
    let before = data.len();
    data.retain(|_, entry| !entry.is_expired());
    let count = before - data.len();
    self.expired.fetch_add(count as u64, Ordering::Relaxed);
    count
  }

  /// Number of stored entries, including expired ones not yet swept
  pub fn len(&self) -> usize {
    self.data.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.read().is_empty()
  }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
    {
      let data = self.data.read();
      match data.get(key) {
        Some(entry) if !entry.is_expired() => {
          self.hits.fetch_add(1, Ordering::Relaxed);
          return Ok(Some(entry.value.clone()));
        }
        Some(_) => {}
        None => {
          self.misses.fetch_add(1, Ordering::Relaxed);
          return Ok(None);
        }
      }
    }

    // Expired: re-check under the write lock, a concurrent set may have
    // replaced it in between
    let mut data = self.data.write();
    if data.get(key).is_some_and(CacheEntry::is_expired) {
      data.remove(key);
      self.expired.fetch_add(1, Ordering::Relaxed);
    }
    self.misses.fetch_add(1, Ordering::Relaxed);
    Ok(None)
  }

  async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheStoreError> {
    if ttl_secs == 0 {
      return Err(CacheStoreError::InvalidTtl);
    }
    let entry = CacheEntry::new(value, Duration::from_secs(ttl_secs));
    self.data.write().insert(key.to_string(), entry);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError> {
    let removed = self.data.write().remove(key);
    Ok(removed.is_some_and(|entry| !entry.is_expired()))
  }

  async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheStoreError> {
    let data = self.data.read();
    Ok(
      data
        .get(key)
        .and_then(CacheEntry::ttl_remaining)
        .map(|d| d.as_secs()),
    )
  }

  async fn info(&self) -> CacheStats {
    let data = self.data.read();
    CacheStats {
      keys: data.values().filter(|e| !e.is_expired()).count(),
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      expired: self.expired.load(Ordering::Relaxed),
    }
  }

  fn name(&self) -> &'static str {
    "builtin"
  }
}
