use async_trait::async_trait;

use crate::types::Resource;

/// The authoritative store for resources of type `R`.
///
/// Errors are backend failures only; absence is reported through `Option`
/// and `bool` results.
#[async_trait]
pub trait PrimaryStore<R: Resource>: Send + Sync {
  async fn find_by_key(&self, key: &str) -> Result<Option<R>, anyhow::Error>;

  /// Up to `limit` resources in insertion order
  async fn find_all(&self, limit: usize) -> Result<Vec<R>, anyhow::Error>;

  /// Store a validated draft. Returns `None` if the draft's supplied key is
  /// already taken.
  async fn insert(&self, draft: R::Draft) -> Result<Option<R>, anyhow::Error>;

  /// Apply a field-level update; `None` if `key` is absent
  async fn update_by_key(&self, key: &str, patch: &R::Patch) -> Result<Option<R>, anyhow::Error>;

  /// Returns whether `key` existed
  async fn delete_by_key(&self, key: &str) -> Result<bool, anyhow::Error>;

  /// Short backend name for status output
  fn name(&self) -> &'static str;
}

/// Key for a new resource: the client's, or a fresh UUID
pub(crate) fn resolve_key<R: Resource>(draft: &R::Draft) -> String {
  R::draft_key(draft)
    .map(str::to_string)
    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
