//! Key-value caches with per-key TTL
//!
//! Two backends implement [`CacheStore`]:
//! - [`InMemoryCacheStore`], a process-local map with lazy and periodic expiry
//! - [`RedisCacheStore`], an external Redis server via `GET` / `SET EX` / `DEL`

pub mod config;
mod entry;
mod memory;
mod proxy;
mod store;

pub use config::{CacheConfig, CacheMode, CachePolicy, RedisConfig};
pub use entry::CacheEntry;
pub use memory::InMemoryCacheStore;
pub use proxy::RedisCacheStore;
pub use store::{CacheStats, CacheStore, CacheStoreError};
