//! Cache-aside reads and write-through writes over a primary store.
//!
//! Reads check the cache first and populate it from the primary store on a
//! miss. Writes go to the primary store, then overwrite (or remove) the cache
//! entry. The primary store is authoritative; the cache only ever holds a
//! copy that expires after a fixed TTL.
//!
//! Nothing here locks across the two backends. Two misses for the same key
//! may both read the primary store and both populate the cache, and a read
//! racing an update may briefly observe the older value. Both are bounded by
//! the TTL.
//!
//! Every operation is a future: dropping it cancels whatever backend call is
//! in flight. Each backend call is additionally bounded by
//! [`CacheSettings::io_timeout`].

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::primary::PrimaryStore;
use crate::cache::{CacheConfig, CachePolicy, CacheStats, CacheStore, CacheStoreError};
use crate::error::{Error, Result};
use crate::types::Resource;

/// Default page size for `list`
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Largest page `list` will return
pub const MAX_LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct CacheSettings {
  /// Prepended to every resource key; must not collide with other resource
  /// types sharing the cache backend
  pub prefix: String,
  /// Lifetime of each written entry, whole seconds
  pub ttl_secs: u64,
  pub policy: CachePolicy,
  /// Upper bound on any single backend call
  pub io_timeout: Option<Duration>,
}

impl CacheSettings {
  pub fn new(prefix: impl Into<String>, ttl_secs: u64) -> Self {
    Self {
      prefix: prefix.into(),
      ttl_secs,
      policy: CachePolicy::default(),
      io_timeout: None,
    }
  }

  pub fn with_policy(mut self, policy: CachePolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
    self.io_timeout = Some(timeout);
    self
  }
}

impl From<&CacheConfig> for CacheSettings {
  fn from(config: &CacheConfig) -> Self {
    CacheSettings::new(config.prefix.clone(), config.ttl_secs).with_policy(config.policy)
  }
}

/// Counters since the store was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStats {
  pub cache_hits: u64,
  pub cache_misses: u64,
  pub primary_reads: u64,
  pub cache_errors: u64,
}

#[derive(Default)]
struct Counters {
  cache_hits: AtomicU64,
  cache_misses: AtomicU64,
  primary_reads: AtomicU64,
  cache_errors: AtomicU64,
}

pub struct CachedResourceStore<R: Resource> {
  primary: Arc<dyn PrimaryStore<R>>,
  cache: Arc<dyn CacheStore>,
  settings: CacheSettings,
  counters: Counters,
}

impl<R: Resource> CachedResourceStore<R> {
  pub fn new(
    primary: Arc<dyn PrimaryStore<R>>,
    cache: Arc<dyn CacheStore>,
    settings: CacheSettings,
  ) -> Self {
    Self {
      primary,
      cache,
      settings,
      counters: Counters::default(),
    }
  }

  pub fn settings(&self) -> &CacheSettings {
    &self.settings
  }

  pub fn primary(&self) -> &Arc<dyn PrimaryStore<R>> {
    &self.primary
  }

  pub fn cache(&self) -> &Arc<dyn CacheStore> {
    &self.cache
  }

  /// Cache key for a resource key
  pub fn cache_key(&self, key: &str) -> String {
    format!("{}{}", self.settings.prefix, key)
  }

  /// Fetch a resource, serving it from the cache when possible.
  ///
  /// A hit does not extend the entry's TTL.
  pub async fn get(&self, key: &str) -> Result<R> {
    let cache_key = self.cache_key(key);

    match self.cache_call("get", &cache_key, self.cache.get(&cache_key)).await {
      Ok(Some(bytes)) => match serde_json::from_slice::<R>(&bytes) {
        Ok(record) => {
          self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
          tracing::debug!("cache hit: {}", cache_key);
          return Ok(record);
        }
        Err(e) => {
          tracing::warn!("discarding undecodable cache entry {}: {}", cache_key, e);
          self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
          self.invalidate(&cache_key).await;
        }
      },
      Ok(None) => {
        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("cache miss: {}", cache_key);
      }
      Err(e) => {
        if self.settings.policy == CachePolicy::Strict {
          return Err(Error::CacheUnavailable(e.to_string()));
        }
        tracing::warn!("cache lookup failed, reading {} from primary store", key);
      }
    }

    self.counters.primary_reads.fetch_add(1, Ordering::Relaxed);
    let record = self
      .primary_call("find_by_key", self.primary.find_by_key(key))
      .await?
      .ok_or_else(|| Error::NotFound(key.to_string()))?;

    self.store_copy(&cache_key, &record).await;
    Ok(record)
  }

  /// Create a resource and write it through to the cache.
  pub async fn create(&self, draft: R::Draft) -> Result<R> {
    R::validate_draft(&draft).map_err(Error::Validation)?;
    let supplied = R::draft_key(&draft).map(str::to_string);

    let record = self
      .primary_call("insert", self.primary.insert(draft))
      .await?
      .ok_or_else(|| Error::Conflict(supplied.unwrap_or_default()))?;

    let cache_key = self.cache_key(record.key());
    self.write_through(&cache_key, &record).await;
    tracing::info!("created {}", cache_key);
    Ok(record)
  }

  /// Apply a partial update and refresh the cached copy.
  pub async fn update(&self, key: &str, patch: R::Patch) -> Result<R> {
    R::validate_patch(&patch).map_err(Error::Validation)?;

    let record = self
      .primary_call("update_by_key", self.primary.update_by_key(key, &patch))
      .await?
      .ok_or_else(|| Error::NotFound(key.to_string()))?;

    let cache_key = self.cache_key(key);
    self.write_through(&cache_key, &record).await;
    tracing::info!("updated {}", cache_key);
    Ok(record)
  }

  /// Delete a resource and drop its cache entry.
  ///
  /// The entry is invalidated whatever the primary store reports. Deleting
  /// a key that does not exist is always `NotFound`.
  pub async fn delete(&self, key: &str) -> Result<()> {
    let deleted = self
      .primary_call("delete_by_key", self.primary.delete_by_key(key))
      .await;

    let cache_key = self.cache_key(key);
    self.invalidate(&cache_key).await;

    if !deleted? {
      return Err(Error::NotFound(key.to_string()));
    }
    tracing::info!("deleted {}", cache_key);
    Ok(())
  }

  /// Up to `limit` resources straight from the primary store; never cached
  pub async fn list(&self, limit: Option<usize>) -> Result<Vec<R>> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    self.counters.primary_reads.fetch_add(1, Ordering::Relaxed);
    self
      .primary_call("find_all", self.primary.find_all(limit))
      .await
  }

  pub fn stats(&self) -> AccessStats {
    AccessStats {
      cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
      cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
      primary_reads: self.counters.primary_reads.load(Ordering::Relaxed),
      cache_errors: self.counters.cache_errors.load(Ordering::Relaxed),
    }
  }

  pub async fn cache_info(&self) -> CacheStats {
    self.cache.info().await
  }

  /// Populate after a read miss. Failure only costs a later miss.
  async fn store_copy(&self, cache_key: &str, record: &R) -> bool {
    let bytes = match serde_json::to_vec(record) {
      Ok(bytes) => bytes,
      Err(e) => {
        tracing::warn!("cannot serialize {} for the cache: {}", cache_key, e);
        return false;
      }
    };
    self
      .cache_call(
        "set",
        cache_key,
        self.cache.set(cache_key, bytes, self.settings.ttl_secs),
      )
      .await
      .is_ok()
  }

  /// Overwrite after a committed write. If the new value cannot be stored,
  /// remove the old one so it cannot be served until its TTL runs out.
  async fn write_through(&self, cache_key: &str, record: &R) {
    if !self.store_copy(cache_key, record).await {
      self.invalidate(cache_key).await;
    }
  }

  async fn invalidate(&self, cache_key: &str) {
    if self
      .cache_call("delete", cache_key, self.cache.delete(cache_key))
      .await
      .is_err()
    {
      tracing::error!(
        "could not invalidate {}; a stale copy may be served until it expires",
        cache_key
      );
    }
  }

  async fn primary_call<T>(
    &self,
    op: &'static str,
    fut: impl Future<Output = std::result::Result<T, anyhow::Error>>,
  ) -> Result<T> {
    let result = match self.settings.io_timeout {
      Some(limit) => match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("{} timed out after {:?}", op, limit)),
      },
      None => fut.await,
    };

    result.map_err(|e| {
      tracing::error!("primary store {} failed: {:#}", op, e);
      Error::PrimaryStoreUnavailable(e)
    })
  }

  async fn cache_call<T>(
    &self,
    op: &'static str,
    cache_key: &str,
    fut: impl Future<Output = std::result::Result<T, CacheStoreError>>,
  ) -> std::result::Result<T, CacheStoreError> {
    let result = match self.settings.io_timeout {
      Some(limit) => match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CacheStoreError::Backend(format!(
          "{} timed out after {:?}",
          op, limit
        ))),
      },
      None => fut.await,
    };

    if let Err(e) = &result {
      self.counters.cache_errors.fetch_add(1, Ordering::Relaxed);
      tracing::warn!("cache {} {} failed: {}", op, cache_key, e);
    }
    result
  }
}
