//! Cache configuration

use serde::{Deserialize, Serialize};

/// Which cache backend holds the read copies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
  /// In-process map (default)
  #[default]
  Builtin,
  /// External Redis server
  Redis,
}

impl std::str::FromStr for CacheMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "builtin" | "memory" | "inmemory" => Ok(CacheMode::Builtin),
      "redis" | "external" => Ok(CacheMode::Redis),
      _ => Err(format!("Unknown cache mode: {}", s)),
    }
  }
}

/// What a failed cache lookup does to a read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
  /// Log and read from the primary store (default)
  #[default]
  Degrade,
  /// Abort the read with `CacheUnavailable`
  Strict,
}

impl std::str::FromStr for CachePolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "degrade" | "fail-open" | "fail_open" => Ok(CachePolicy::Degrade),
      "strict" | "fail-closed" | "fail_closed" => Ok(CachePolicy::Strict),
      _ => Err(format!("Unknown cache policy: {}", s)),
    }
  }
}

/// Connection settings for redis mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
  /// Full connection URL; overrides the individual fields when set
  #[serde(default)]
  pub url: Option<String>,

  #[serde(default = "default_redis_host")]
  pub host: String,

  #[serde(default = "default_redis_port")]
  pub port: u16,

  #[serde(default)]
  pub password: Option<String>,

  /// Database number
  #[serde(default)]
  pub database: u8,

  #[serde(default)]
  pub tls_enabled: bool,
}

fn default_redis_host() -> String {
  "localhost".to_string()
}

fn default_redis_port() -> u16 {
  6379
}

impl Default for RedisConfig {
  fn default() -> Self {
    Self {
      url: None,
      host: default_redis_host(),
      port: default_redis_port(),
      password: None,
      database: 0,
      tls_enabled: false,
    }
  }
}

impl RedisConfig {
  pub fn connection_url(&self) -> String {
    if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
      return url.to_string();
    }
    let scheme = if self.tls_enabled { "rediss" } else { "redis" };
    let auth = match &self.password {
      Some(pwd) if !pwd.is_empty() => format!(":{}@", pwd),
      _ => String::new(),
    };
    format!(
      "{}://{}{}:{}/{}",
      scheme, auth, self.host, self.port, self.database
    )
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub mode: CacheMode,

  /// Namespace prepended to every resource key
  #[serde(default = "default_prefix")]
  pub prefix: String,

  /// Lifetime of every entry written by the service, in seconds
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,

  #[serde(default)]
  pub policy: CachePolicy,

  /// How often the builtin store sweeps expired entries (0 = never)
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,

  #[serde(default)]
  pub redis: RedisConfig,
}

fn default_prefix() -> String {
  "movie_".to_string()
}

fn default_ttl_secs() -> u64 {
  3600
}

fn default_sweep_interval_secs() -> u64 {
  60
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      mode: CacheMode::default(),
      prefix: default_prefix(),
      ttl_secs: default_ttl_secs(),
      policy: CachePolicy::default(),
      sweep_interval_secs: default_sweep_interval_secs(),
      redis: RedisConfig::default(),
    }
  }
}

impl CacheConfig {
  pub fn validate(&self) -> Result<(), String> {
    if self.ttl_secs == 0 {
      return Err("cache.ttl_secs must be at least 1".into());
    }
    if self.prefix.is_empty() {
      return Err("cache.prefix cannot be empty".into());
    }
    Ok(())
  }
}
