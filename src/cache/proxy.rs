//! Redis-backed cache store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::sync::atomic::{AtomicU64, Ordering};

use super::config::RedisConfig;
use super::store::{CacheStats, CacheStore, CacheStoreError};

/// Cache store on an external Redis server.
///
/// Values are stored as raw bytes with `SET key value EX ttl`, so an entry
/// is replaced atomically and expires on the server's clock.
pub struct RedisCacheStore {
  connection: ConnectionManager,
  hits: AtomicU64,
  misses: AtomicU64,
}

impl RedisCacheStore {
  pub async fn new(config: &RedisConfig) -> Result<Self, RedisError> {
    let client = Client::open(config.connection_url())?;
    let connection = ConnectionManager::new(client).await?;

    Ok(Self {
      connection,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
    })
  }

  /// Test the connection to Redis
  pub async fn ping(&self) -> Result<(), RedisError> {
    let mut conn = self.connection.clone();
    redis::cmd("PING").query_async::<()>(&mut conn).await?;
    Ok(())
  }
}

fn backend_error(e: RedisError) -> CacheStoreError {
  CacheStoreError::Backend(e.to_string())
}

#[async_trait]
impl CacheStore for RedisCacheStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
    let mut conn = self.connection.clone();
    let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend_error)?;
    if value.is_some() {
      self.hits.fetch_add(1, Ordering::Relaxed);
    } else {
      self.misses.fetch_add(1, Ordering::Relaxed);
    }
    Ok(value)
  }

  async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheStoreError> {
    if ttl_secs == 0 {
      return Err(CacheStoreError::InvalidTtl);
    }
    let mut conn = self.connection.clone();
    let _: () = conn
      .set_ex(key, value.as_slice(), ttl_secs)
      .await
      .map_err(backend_error)?;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError> {
    let mut conn = self.connection.clone();
    let removed: i64 = conn.del(key).await.map_err(backend_error)?;
    Ok(removed > 0)
  }

  async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheStoreError> {
    let mut conn = self.connection.clone();
    let ttl: i64 = conn.ttl(key).await.map_err(backend_error)?;
    // -2: no such key, -1: key without expiry (never written by this service)
    Ok(u64::try_from(ttl).ok())
  }

  async fn info(&self) -> CacheStats {
    let mut conn = self.connection.clone();
    let dbsize: Result<usize, _> = redis::cmd("DBSIZE").query_async(&mut conn).await;

    CacheStats {
      keys: dbsize.unwrap_or(0),
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      // Expiry happens server-side
      expired: 0,
    }
  }

  fn name(&self) -> &'static str {
    "redis"
  }
}
