//! Primary stores and the caching layer in front of them

mod cached;
mod document;
mod memory;
mod primary;

pub use cached::{
  AccessStats, CacheSettings, CachedResourceStore, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use document::DocumentStore;
pub use memory::MemoryStore;
pub use primary::PrimaryStore;
