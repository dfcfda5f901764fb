use clap::Parser;
use marquee::cache::{CacheMode, CachePolicy};
use marquee::server::{BackendType, Daemon, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "marquee", about = "Cached movie service", version)]
struct Args {
  #[arg(short, long)]
  config: Option<String>,
  #[arg(short, long)]
  port: Option<u16>,
  #[arg(long)]
  host: Option<String>,
  /// memory, sqlite or postgres
  #[arg(long, env = "MARQUEE_BACKEND")]
  backend: Option<BackendType>,
  #[arg(long, env = "MARQUEE_SQLITE_PATH")]
  sqlite: Option<String>,
  #[arg(long, env = "MARQUEE_PG_URL")]
  pg_url: Option<String>,
  #[arg(long, env = "MARQUEE_REDIS_URL")]
  redis_url: Option<String>,
  /// builtin or redis
  #[arg(long)]
  cache_mode: Option<CacheMode>,
  #[arg(long)]
  cache_ttl: Option<u64>,
  /// degrade or strict
  #[arg(long)]
  cache_policy: Option<CachePolicy>,
  /// Start the memory store empty
  #[arg(long)]
  no_seed: bool,
  #[arg(long)]
  log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();

  // Load config: explicit path > auto-detect > defaults
  let config_path = args
    .config
    .clone()
    .map(PathBuf::from)
    .or_else(|| ServerConfig::find_config_file("."));
  let mut config = match &config_path {
    Some(path) => ServerConfig::from_file(path)?,
    None => ServerConfig::default(),
  };

  // CLI args override config file
  if let Some(backend) = args.backend {
    config.backend = backend;
  }
  if let Some(path) = args.sqlite {
    config.sqlite.path = path;
    config.backend = BackendType::Sqlite;
  }
  if let Some(url) = args.pg_url {
    config.postgres.url = url;
    config.backend = BackendType::Postgres;
  }
  if let Some(url) = args.redis_url {
    config.cache.redis.url = Some(url);
    config.cache.mode = CacheMode::Redis;
  }
  if let Some(mode) = args.cache_mode {
    config.cache.mode = mode;
  }
  if let Some(ttl) = args.cache_ttl {
    config.cache.ttl_secs = ttl;
  }
  if let Some(policy) = args.cache_policy {
    config.cache.policy = policy;
  }
  if args.no_seed {
    config.seed = false;
  }
  if let Some(port) = args.port {
    config.server.port = port;
  }
  if let Some(host) = args.host {
    config.server.host = host;
  }
  if let Some(level) = args.log_level {
    config.logging.level = level;
  }

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  // The subscriber needs the configured level, so the source is reported here
  match &config_path {
    Some(path) => tracing::info!("Loaded config from {}", path.display()),
    None => tracing::info!("No config file found, using defaults"),
  }

  let daemon = Arc::new(Daemon::open(config).await?);
  let daemon_clone = daemon.clone();

  // Handle shutdown signals (SIGINT, SIGTERM)
  tokio::spawn(async move {
    shutdown_signal().await;
    daemon_clone.shutdown();
  });

  daemon.run().await
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!("Failed to install Ctrl+C handler: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!("Failed to install SIGTERM handler: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("Received SIGINT"),
    _ = terminate => tracing::info!("Received SIGTERM"),
  }
}
