//! Cache store trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
  pub keys: usize,
  pub hits: u64,
  pub misses: u64,
  pub expired: u64,
}

impl CacheStats {
  pub fn hit_rate(&self) -> f64 {
    let total = self.hits + self.misses;
    if total == 0 {
      0.0
    } else {
      self.hits as f64 / total as f64
    }
  }
}

/// Store operation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheStoreError {
  #[error("cache backend error: {0}")]
  Backend(String),
  #[error("ttl must be at least one second")]
  InvalidTtl,
}

/// A key-value cache with per-key expiry in whole seconds.
///
/// A `set` is atomic from the caller's point of view: after it returns the
/// key holds either the full new value or whatever it held before.
#[async_trait]
pub trait CacheStore: Send + Sync {
  /// Value for `key`, or `None` if absent or expired
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError>;

  async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheStoreError>;

  /// Remove `key`; returns whether it was present
  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError>;

  /// Remaining lifetime of `key` in whole seconds, `None` if absent
  async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheStoreError>;

  async fn info(&self) -> CacheStats;

  /// Short backend name for status output
  fn name(&self) -> &'static str;
}
