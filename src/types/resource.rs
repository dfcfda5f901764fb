use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// A record that can live in a primary store and be cached.
///
/// Beyond its key, a resource is opaque to the storage layers: they only
/// need to serialize it, build it from client input, and apply a partial
/// update to it.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
  /// Client input for `create`
  type Draft: Send + Sync + 'static;
  /// Client input for `update`; only the fields present change
  type Patch: Send + Sync + 'static;

  /// Document collection name; also the default cache namespace
  const COLLECTION: &'static str;

  fn key(&self) -> &str;

  /// Key supplied by the client, if any
  fn draft_key(draft: &Self::Draft) -> Option<&str>;

  fn validate_draft(draft: &Self::Draft) -> Result<(), String>;

  fn validate_patch(patch: &Self::Patch) -> Result<(), String>;

  /// Build the stored record. Called only with a validated draft.
  fn from_draft(key: String, draft: Self::Draft, now: DateTime<Utc>) -> Self;

  fn apply_patch(&mut self, patch: &Self::Patch, now: DateTime<Utc>);
}
