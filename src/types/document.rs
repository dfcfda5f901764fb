use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the document database: one JSON value in a named collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub id: String,
  pub collection: String,
  pub data: serde_json::Value,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
