//! HTTP service: configuration, routes and process lifecycle

mod api;
mod config;
mod daemon;

pub use api::{build_router, AppState, MovieStore};
pub use config::{
  expand_env_vars, BackendType, LimitsSection, LoggingSection, PostgresSection, ServerConfig,
  ServerSection, SqliteSection,
};
pub use daemon::{sample_movies, Daemon};
