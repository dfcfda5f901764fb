use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};

use super::backend::{DatabaseBackend, SqlDialect};
use super::sanitize::{
  validate_collection_name, validate_document_id, validate_limit, validate_offset,
};
use crate::types::Document;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection VARCHAR(255) NOT NULL,
    id VARCHAR(128) NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
);
CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(collection, created_at);
"#;

const RETURNING: &str = "RETURNING id, collection, data, created_at, updated_at";

pub struct PostgresBackend {
  pool: Pool,
}

impl PostgresBackend {
  pub fn new(url: &str, max_connections: usize) -> Result<Self, anyhow::Error> {
    let mut cfg = Config::new();
    cfg.url = Some(url.into());
    cfg.manager = Some(ManagerConfig {
      recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_connections.max(1)));
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(Self { pool })
  }
}

fn row_to_doc(r: &Row) -> Document {
  Document {
    id: r.get(0),
    collection: r.get(1),
    data: r.get(2),
    created_at: r.get(3),
    updated_at: r.get(4),
  }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
  fn dialect(&self) -> SqlDialect {
    SqlDialect::Postgres
  }

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    self.pool.get().await?.batch_execute(SCHEMA).await?;
    tracing::info!("PostgreSQL schema initialized");
    Ok(())
  }

  async fn insert(
    &self,
    collection: &str,
    id: &str,
    data: serde_json::Value,
  ) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;
    validate_document_id(id)?;

    let now = Utc::now();
    let row = self
      .pool
      .get()
      .await?
      .query_opt(
        &format!(
          "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES ($1, $2, $3, $4, $4)
           ON CONFLICT (collection, id) DO NOTHING {}",
          RETURNING
        ),
        &[&collection, &id, &data, &now],
      )
      .await?;
    Ok(row.as_ref().map(row_to_doc))
  }

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let row = self.pool.get().await?.query_opt(
      "SELECT id, collection, data, created_at, updated_at FROM documents WHERE collection = $1 AND id = $2",
      &[&collection, &id],
    ).await?;
    Ok(row.as_ref().map(row_to_doc))
  }

  async fn update(
    &self,
    collection: &str,
    id: &str,
    data: serde_json::Value,
  ) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let now = Utc::now();
    let row = self
      .pool
      .get()
      .await?
      .query_opt(
        &format!(
          "UPDATE documents SET data = $1, updated_at = $2 WHERE collection = $3 AND id = $4 {}",
          RETURNING
        ),
        &[&data, &now, &collection, &id],
      )
      .await?;
    Ok(row.as_ref().map(row_to_doc))
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let row = self
      .pool
      .get()
      .await?
      .query_opt(
        &format!(
          "DELETE FROM documents WHERE collection = $1 AND id = $2 {}",
          RETURNING
        ),
        &[&collection, &id],
      )
      .await?;
    Ok(row.as_ref().map(row_to_doc))
  }

  async fn list(
    &self,
    collection: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let mut sql = String::from(
      "SELECT id, collection, data, created_at, updated_at FROM documents WHERE collection = $1 ORDER BY created_at, id",
    );
    if let Some(l) = limit {
      validate_limit(l)?;
      sql.push_str(&format!(" LIMIT {}", l));
    }
    if let Some(o) = offset {
      validate_offset(o)?;
      sql.push_str(&format!(" OFFSET {}", o));
    }

    let rows = self.pool.get().await?.query(&sql, &[&collection]).await?;
    Ok(rows.iter().map(row_to_doc).collect())
  }
}
