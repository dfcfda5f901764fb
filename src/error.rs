use thiserror::Error;

/// Outcome of a failed resource operation.
///
/// `NotFound`, `Validation` and `Conflict` are expected results the caller
/// can act on. `CacheUnavailable` only surfaces under the strict cache
/// policy; `PrimaryStoreUnavailable` always propagates.
#[derive(Debug, Error)]
pub enum Error {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("already exists: {0}")]
  Conflict(String),

  #[error("cache unavailable: {0}")]
  CacheUnavailable(String),

  #[error("primary store unavailable: {0:#}")]
  PrimaryStoreUnavailable(anyhow::Error),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }
}

pub type Result<T> = std::result::Result<T, Error>;
