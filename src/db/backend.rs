use async_trait::async_trait;

use crate::types::Document;

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
  Postgres,
  Sqlite,
}

/// Abstract document database.
///
/// Documents are keyed by `(collection, id)`. Single-document operations are
/// atomic; nothing spans more than one document.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
  fn dialect(&self) -> SqlDialect;

  async fn init_schema(&self) -> Result<(), anyhow::Error>;

  /// Insert a document under `id`. Returns `None` when the id is already
  /// taken in `collection`.
  async fn insert(
    &self,
    collection: &str,
    id: &str,
    data: serde_json::Value,
  ) -> Result<Option<Document>, anyhow::Error>;

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, anyhow::Error>;

  /// Replace the data of an existing document
  async fn update(
    &self,
    collection: &str,
    id: &str,
    data: serde_json::Value,
  ) -> Result<Option<Document>, anyhow::Error>;

  /// Remove a document, returning it if it existed
  async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>, anyhow::Error>;

  /// Documents in insertion order
  async fn list(
    &self,
    collection: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<Document>, anyhow::Error>;
}
