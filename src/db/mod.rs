//! JSON document databases used as the primary store

mod backend;
mod postgres;
pub mod sanitize;
mod sqlite;

pub use backend::{DatabaseBackend, SqlDialect};
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;
