use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::primary::{resolve_key, PrimaryStore};
use crate::types::Resource;

/// Primary store held in a process-local list.
///
/// Insertion order is kept so `find_all` is stable. Lookups are linear,
/// which is fine for the demo-sized data sets this store is meant for.
pub struct MemoryStore<R> {
  records: RwLock<Vec<R>>,
}

impl<R: Resource> MemoryStore<R> {
  pub fn new() -> Self {
    Self {
      records: RwLock::new(Vec::new()),
    }
  }

  /// Store pre-populated with `records`
  pub fn with_records(records: Vec<R>) -> Self {
    Self {
      records: RwLock::new(records),
    }
  }

  pub fn len(&self) -> usize {
    self.records.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.read().is_empty()
  }
}

impl<R: Resource> Default for MemoryStore<R> {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl<R: Resource> PrimaryStore<R> for MemoryStore<R> {
  async fn find_by_key(&self, key: &str) -> Result<Option<R>, anyhow::Error> {
    Ok(self.records.read().iter().find(|r| r.key() == key).cloned())
  }

  async fn find_all(&self, limit: usize) -> Result<Vec<R>, anyhow::Error> {
    Ok(self.records.read().iter().take(limit).cloned().collect())
  }

  async fn insert(&self, draft: R::Draft) -> Result<Option<R>, anyhow::Error> {
    let key = resolve_key::<R>(&draft);
    let mut records = self.records.write();
    if records.iter().any(|r| r.key() == key) {
      return Ok(None);
    }
    let record = R::from_draft(key, draft, Utc::now());
    records.push(record.clone());
    Ok(Some(record))
  }

  async fn update_by_key(&self, key: &str, patch: &R::Patch) -> Result<Option<R>, anyhow::Error> {
    let mut records = self.records.write();
    Ok(records.iter_mut().find(|r| r.key() == key).map(|record| {
      record.apply_patch(patch, Utc::now());
      record.clone()
    }))
  }

  async fn delete_by_key(&self, key: &str) -> Result<bool, anyhow::Error> {
    let mut records = self.records.write();
    let before = records.len();
    records.retain(|r| r.key() != key);
    Ok(records.len() != before)
  }

  fn name(&self) -> &'static str {
    "memory"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Movie, MovieDraft, MoviePatch};

  #[tokio::test]
  async fn test_insert_generates_or_keeps_key() {
    let store = MemoryStore::<Movie>::new();

    let generated = store
      .insert(MovieDraft::new("Inception", "Sci-Fi"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(generated.id.len(), 36);

    let supplied = store
      .insert(MovieDraft::new("The Matrix", "Sci-Fi").with_id("2"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(supplied.id, "2");

    let duplicate = store
      .insert(MovieDraft::new("Other", "Drama").with_id("2"))
      .await
      .unwrap();
    assert!(duplicate.is_none());
    assert_eq!(store.len(), 2);
  }

  #[tokio::test]
  async fn test_update_and_delete() {
    let store = MemoryStore::<Movie>::new();
    store
      .insert(MovieDraft::new("Inception", "Sci-Fi").with_id("1"))
      .await
      .unwrap();

    let updated = store
      .update_by_key("1", &MoviePatch::title("Thriller"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(updated.name, "Inception");
    assert_eq!(updated.title, "Thriller");
    assert!(store
      .update_by_key("9", &MoviePatch::title("x"))
      .await
      .unwrap()
      .is_none());

    assert!(store.delete_by_key("1").await.unwrap());
    assert!(!store.delete_by_key("1").await.unwrap());
    assert!(store.find_by_key("1").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_find_all_respects_limit_and_order() {
    let store = MemoryStore::<Movie>::new();
    for i in 0..5 {
      store
        .insert(MovieDraft::new(format!("Movie {}", i), "Drama").with_id(i.to_string()))
        .await
        .unwrap();
    }
    let ids: Vec<_> = store
      .find_all(3)
      .await
      .unwrap()
      .into_iter()
      .map(|m| m.id)
      .collect();
    assert_eq!(ids, vec!["0", "1", "2"]);
  }
}
