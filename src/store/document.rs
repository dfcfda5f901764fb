use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;

use super::primary::{resolve_key, PrimaryStore};
use crate::db::{DatabaseBackend, SqlDialect};
use crate::types::{Document, Resource};

/// Primary store backed by a document database.
///
/// Each resource is one JSON document in collection `R::COLLECTION`, keyed
/// by the resource key. Updates read the document, apply the patch and write
/// it back; two racing updates of the same key resolve last-writer-wins.
pub struct DocumentStore<R> {
  backend: Arc<dyn DatabaseBackend>,
  _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> DocumentStore<R> {
  pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
    Self {
      backend,
      _resource: PhantomData,
    }
  }

  fn decode(doc: Document) -> Result<R, anyhow::Error> {
    serde_json::from_value(doc.data)
      .with_context(|| format!("decoding {} document {}", doc.collection, doc.id))
  }
}

#[async_trait]
impl<R: Resource> PrimaryStore<R> for DocumentStore<R> {
  async fn find_by_key(&self, key: &str) -> Result<Option<R>, anyhow::Error> {
    self
      .backend
      .get(R::COLLECTION, key)
      .await?
      .map(Self::decode)
      .transpose()
  }

  async fn find_all(&self, limit: usize) -> Result<Vec<R>, anyhow::Error> {
    self
      .backend
      .list(R::COLLECTION, Some(limit), None)
      .await?
      .into_iter()
      .map(Self::decode)
      .collect()
  }

  async fn insert(&self, draft: R::Draft) -> Result<Option<R>, anyhow::Error> {
    let key = resolve_key::<R>(&draft);
    let record = R::from_draft(key.clone(), draft, Utc::now());
    let data = serde_json::to_value(&record)?;
    let inserted = self.backend.insert(R::COLLECTION, &key, data).await?;
    Ok(inserted.map(|_| record))
  }

  async fn update_by_key(&self, key: &str, patch: &R::Patch) -> Result<Option<R>, anyhow::Error> {
    let Some(doc) = self.backend.get(R::COLLECTION, key).await? else {
      return Ok(None);
    };
    let mut record = Self::decode(doc)?;
    record.apply_patch(patch, Utc::now());

    let data = serde_json::to_value(&record)?;
    let updated = self.backend.update(R::COLLECTION, key, data).await?;
    // None here means the document was deleted between the read and the write
    Ok(updated.map(|_| record))
  }

  async fn delete_by_key(&self, key: &str) -> Result<bool, anyhow::Error> {
    Ok(self.backend.delete(R::COLLECTION, key).await?.is_some())
  }

  fn name(&self) -> &'static str {
    match self.backend.dialect() {
      SqlDialect::Postgres => "postgres",
      SqlDialect::Sqlite => "sqlite",
    }
  }
}
