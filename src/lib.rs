//! Cache-aside reads and write-through writes for a movie resource.
//!
//! The core is [`store::CachedResourceStore`]: it sits between request
//! handlers and two collaborators, a primary store that owns every record and
//! a key-value cache that holds disposable copies with a fixed TTL.

pub mod cache;
pub mod db;
pub mod error;
pub mod store;
pub mod types;

// HTTP surface and daemon wiring (only compiled with server feature)
#[cfg(feature = "server")]
pub mod server;

pub use error::{Error, Result};
