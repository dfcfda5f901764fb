use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tokio_rusqlite::Connection;

use super::backend::{DatabaseBackend, SqlDialect};
use super::sanitize::{
  validate_collection_name, validate_document_id, validate_limit, validate_offset,
};
use crate::types::Document;

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;
PRAGMA temp_store = MEMORY;
"#;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
) WITHOUT ROWID;
CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(collection, created_at);
"#;

const SELECT_COLUMNS: &str = "SELECT id, collection, data, created_at, updated_at FROM documents";

pub struct SqliteBackend {
  conn: Connection,
}

impl SqliteBackend {
  pub async fn new(path: &str) -> Result<Self, anyhow::Error> {
    let conn = if path == ":memory:" {
      Connection::open_in_memory().await?
    } else {
      Connection::open(path).await?
    };

    conn
      .call(|conn| conn.execute_batch(PRAGMAS).map_err(|e| e.into()))
      .await?;

    Ok(Self { conn })
  }

  pub async fn in_memory() -> Result<Self, anyhow::Error> {
    Self::new(":memory:").await
  }
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
  fn dialect(&self) -> SqlDialect {
    SqlDialect::Sqlite
  }

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    self
      .conn
      .call(|conn| conn.execute_batch(SCHEMA).map_err(|e| e.into()))
      .await?;
    tracing::info!("SQLite schema initialized");
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
    let data_str = serde_json::to_string(&data)?;
    let now_str = now.to_rfc3339();
    let col = collection.to_string();
    let id_str = id.to_string();

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)
           ON CONFLICT (collection, id) DO NOTHING",
          params![col, id_str, data_str, now_str],
        )?;
        Ok(changed)
      })
      .await?;

    if inserted == 0 {
      return Ok(None);
    }

    Ok(Some(Document {
      id: id.to_string(),
      collection: collection.into(),
      data,
      created_at: now,
      updated_at: now,
    }))
  }

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let col = collection.to_string();
    let id_str = id.to_string();

    let doc = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare_cached(&format!("{} WHERE collection = ?1 AND id = ?2", SELECT_COLUMNS))?;
        let mut rows = stmt.query(params![col, id_str])?;
        match rows.next()? {
          Some(row) => Ok(Some(row_to_doc(row)?)),
          None => Ok(None),
        }
      })
      .await?;
    Ok(doc)
  }

  async fn update(
    &self,
    collection: &str,
    id: &str,
    data: serde_json::Value,
  ) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let col = collection.to_string();
    let id_str = id.to_string();
    let data_str = serde_json::to_string(&data)?;
    let now_str = Utc::now().to_rfc3339();

    let doc = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE documents SET data = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
          params![data_str, now_str, col, id_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let mut stmt =
          conn.prepare_cached(&format!("{} WHERE collection = ?1 AND id = ?2", SELECT_COLUMNS))?;
        let mut rows = stmt.query(params![col, id_str])?;
        match rows.next()? {
          Some(row) => Ok(Some(row_to_doc(row)?)),
          None => Ok(None),
        }
      })
      .await?;
    Ok(doc)
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let col = collection.to_string();
    let id_str = id.to_string();

    let doc = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let doc = {
          let mut stmt =
            tx.prepare_cached(&format!("{} WHERE collection = ?1 AND id = ?2", SELECT_COLUMNS))?;
          let mut rows = stmt.query(params![col, id_str])?;
          match rows.next()? {
            Some(row) => row_to_doc(row)?,
            None => return Ok(None),
          }
        };
        tx.execute(
          "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
          params![col, id_str],
        )?;
        tx.commit()?;
        Ok(Some(doc))
      })
      .await?;
    Ok(doc)
  }

  async fn list(
    &self,
    collection: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<Document>, anyhow::Error> {
    validate_collection_name(collection)?;
    if let Some(l) = limit {
      validate_limit(l)?;
    }
    if let Some(o) = offset {
      validate_offset(o)?;
    }

    let col = collection.to_string();
    // SQLite treats a negative LIMIT as "no limit"
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let offset = offset.unwrap_or(0) as i64;

    let docs = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!(
          "{} WHERE collection = ?1 ORDER BY created_at, id LIMIT ?2 OFFSET ?3",
          SELECT_COLUMNS
        ))?;
        let mut rows = stmt.query(params![col, limit, offset])?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
          docs.push(row_to_doc(row)?);
        }
        Ok(docs)
      })
      .await?;
    Ok(docs)
  }
}

fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
  DateTime::parse_from_rfc3339(value)
    .map(|d| d.with_timezone(&Utc))
    .map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_doc(row: &rusqlite::Row) -> Result<Document, rusqlite::Error> {
  let data_str: String = row.get(2)?;
  let created_str: String = row.get(3)?;
  let updated_str: String = row.get(4)?;
  Ok(Document {
    id: row.get(0)?,
    collection: row.get(1)?,
    data: serde_json::from_str(&data_str).map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?,
    created_at: parse_timestamp(3, &created_str)?,
    updated_at: parse_timestamp(4, &updated_str)?,
  })
}
