use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;

/// Expand environment variables in a string.
/// Supports $VAR_NAME and ${VAR_NAME} syntax; unset variables expand to "".
/// Substituted values are copied verbatim and never expanded again.
pub fn expand_env_vars(input: &str) -> String {
  let mut result = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(pos) = rest.find('$') {
    result.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];

    if let Some(braced) = after.strip_prefix('{') {
      if let Some(end) = braced.find('}') {
        result.push_str(&std::env::var(&braced[..end]).unwrap_or_default());
        rest = &braced[end + 1..];
        continue;
      }
    } else {
      let var_len = after
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(after.len());
      if var_len > 0 {
        result.push_str(&std::env::var(&after[..var_len]).unwrap_or_default());
        rest = &after[var_len..];
        continue;
      }
    }

    // Not a reference: keep the '$' as written
    result.push('$');
    rest = after;
  }

  result.push_str(rest);
  result
}

/// Where movies are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
  /// Process-local list, lost on restart
  #[default]
  Memory,
  Sqlite,
  Postgres,
}

impl std::str::FromStr for BackendType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "memory" => Ok(BackendType::Memory),
      "sqlite" => Ok(BackendType::Sqlite),
      "postgres" | "postgresql" => Ok(BackendType::Postgres),
      _ => Err(format!("Unknown backend: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default)]
  pub server: ServerSection,
  #[serde(default)]
  pub backend: BackendType,
  #[serde(default)]
  pub postgres: PostgresSection,
  #[serde(default)]
  pub sqlite: SqliteSection,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub limits: LimitsSection,
  #[serde(default)]
  pub logging: LoggingSection,
  /// Load the two sample movies into an empty memory store
  #[serde(default = "default_true")]
  pub seed: bool,
}

fn default_true() -> bool {
  true
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      server: ServerSection::default(),
      backend: BackendType::default(),
      postgres: PostgresSection::default(),
      sqlite: SqliteSection::default(),
      cache: CacheConfig::default(),
      limits: LimitsSection::default(),
      logging: LoggingSection::default(),
      seed: true,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  /// CORS allowed origins.
  /// Use ["*"] for permissive mode, or list origins like ["http://localhost:3000"]
  #[serde(default = "default_cors_origins")]
  pub cors_origins: Vec<String>,
}

fn default_host() -> String {
  "0.0.0.0".into()
}
fn default_port() -> u16 {
  3000
}
fn default_cors_origins() -> Vec<String> {
  vec!["*".to_string()]
}

impl Default for ServerSection {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      cors_origins: default_cors_origins(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSection {
  /// Whole-request deadline in milliseconds (0 = none)
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,

  /// Deadline for a single cache or primary store call (0 = none)
  #[serde(default = "default_io_timeout_ms")]
  pub io_timeout_ms: u64,

  /// Largest accepted request body in bytes
  #[serde(default = "default_max_body_bytes")]
  pub max_body_bytes: usize,
}

fn default_request_timeout_ms() -> u64 {
  30000
}
fn default_io_timeout_ms() -> u64 {
  5000
}
fn default_max_body_bytes() -> usize {
  64 * 1024
}

impl Default for LimitsSection {
  fn default() -> Self {
    Self {
      request_timeout_ms: default_request_timeout_ms(),
      io_timeout_ms: default_io_timeout_ms(),
      max_body_bytes: default_max_body_bytes(),
    }
  }
}

impl LimitsSection {
  pub fn request_timeout(&self) -> Option<Duration> {
    (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
  }

  pub fn io_timeout(&self) -> Option<Duration> {
    (self.io_timeout_ms > 0).then(|| Duration::from_millis(self.io_timeout_ms))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSection {
  #[serde(default = "default_pg_url")]
  pub url: String,
  #[serde(default = "default_max_conn")]
  pub max_connections: usize,
}
fn default_pg_url() -> String {
  "postgres://localhost/marquee".into()
}
fn default_max_conn() -> usize {
  20
}
impl Default for PostgresSection {
  fn default() -> Self {
    Self {
      url: default_pg_url(),
      max_connections: default_max_conn(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteSection {
  #[serde(default = "default_sqlite_path")]
  pub path: String,
}
fn default_sqlite_path() -> String {
  "marquee.db".into()
}
impl Default for SqliteSection {
  fn default() -> Self {
    Self {
      path: default_sqlite_path(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}
fn default_level() -> String {
  "info".into()
}
impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

impl ServerConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
    let content = std::fs::read_to_string(&path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, anyhow::Error> {
    let expanded = expand_env_vars(content);
    Ok(serde_yaml::from_str(&expanded)?)
  }

  /// First of `marquee.yaml` or `marquee.yml` present in `dir`
  pub fn find_config_file(dir: impl AsRef<Path>) -> Option<PathBuf> {
    ["marquee.yaml", "marquee.yml"]
      .iter()
      .map(|name| dir.as_ref().join(name))
      .find(|path| path.exists())
  }

  pub fn address(&self) -> String {
    format!("{}:{}", self.server.host, self.server.port)
  }

  /// Reject settings that would only fail once traffic arrives
  pub fn validate(&self) -> Result<(), anyhow::Error> {
    self.cache.validate().map_err(anyhow::Error::msg)?;
    if self.limits.max_body_bytes == 0 {
      anyhow::bail!("limits.max_body_bytes must be at least 1");
    }
    if self.backend == BackendType::Postgres && self.postgres.url.is_empty() {
      anyhow::bail!("postgres.url is required for the postgres backend");
    }
    if self.backend == BackendType::Sqlite && self.sqlite.path.is_empty() {
      anyhow::bail!("sqlite.path is required for the sqlite backend");
    }
    Ok(())
  }
}
