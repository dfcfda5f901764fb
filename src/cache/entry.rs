//! Cache entry types

use std::time::Duration;
use tokio::time::Instant;

/// A cached value with its expiry.
///
/// The deadline comes from the tokio clock so paused-time tests can move past
/// a TTL without sleeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub value: Vec<u8>,
  pub expires_at: Instant,
}

impl CacheEntry {
  pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
    Self {
      value,
      expires_at: Instant::now() + ttl,
    }
  }

  pub fn is_expired(&self) -> bool {
    Instant::now() >= self.expires_at
  }

  pub fn ttl_remaining(&self) -> Option<Duration> {
    let now = Instant::now();
    if now >= self.expires_at {
      None
    } else {
      Some(self.expires_at - now)
    }
  }
}
