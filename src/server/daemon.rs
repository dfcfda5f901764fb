use anyhow::Context;
use axum::Router;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::api::{build_router, AppState, MovieStore};
use super::{BackendType, ServerConfig};
use crate::cache::{CacheConfig, CacheMode, CacheStore, InMemoryCacheStore, RedisCacheStore};
use crate::db::{DatabaseBackend, PostgresBackend, SqliteBackend};
use crate::store::{CacheSettings, CachedResourceStore, DocumentStore, MemoryStore, PrimaryStore};
use crate::types::Movie;

pub struct Daemon {
  config: ServerConfig,
  store: Arc<MovieStore>,
  /// Set when the builtin cache is in use, for the expiry sweeper
  builtin_cache: Option<Arc<InMemoryCacheStore>>,
  shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
  /// Connect the configured primary store and cache
  pub async fn open(config: ServerConfig) -> Result<Self, anyhow::Error> {
    config.validate()?;

    let primary = open_primary(&config).await?;
    tracing::info!("Primary store: {}", primary.name());

    let (cache, builtin_cache) = open_cache(&config.cache).await?;
    tracing::info!(
      "Cache: {} (prefix {:?}, ttl {}s, policy {:?})",
      cache.name(),
      config.cache.prefix,
      config.cache.ttl_secs,
      config.cache.policy
    );

    let mut settings = CacheSettings::from(&config.cache);
    if let Some(timeout) = config.limits.io_timeout() {
      settings = settings.with_io_timeout(timeout);
    }

    let (shutdown_tx, _) = broadcast::channel(1);
    Ok(Self {
      store: Arc::new(CachedResourceStore::new(primary, cache, settings)),
      config,
      builtin_cache,
      shutdown_tx,
    })
  }

  pub fn router(&self) -> Router {
    build_router(AppState::new(self.store.clone()), &self.config)
  }

  /// Trigger graceful shutdown
  pub fn shutdown(&self) {
    tracing::info!("Initiating graceful shutdown...");
    let _ = self.shutdown_tx.send(());
  }

  /// Serve HTTP until `shutdown` is called, then drain in-flight requests
  pub async fn run(&self) -> Result<(), anyhow::Error> {
    if let Some(cache) = &self.builtin_cache {
      if self.config.cache.sweep_interval_secs > 0 {
        spawn_sweeper(
          cache.clone(),
          Duration::from_secs(self.config.cache.sweep_interval_secs),
          self.shutdown_tx.subscribe(),
        );
      }
    }

    let addr = self.config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
      .await
      .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Marquee listening on http://{}", addr);

    let mut shutdown_rx = self.shutdown_tx.subscribe();
    axum::serve(listener, self.router())
      .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
      })
      .await?;

    tracing::info!("Shutdown complete");
    Ok(())
  }
}

async fn open_primary(config: &ServerConfig) -> Result<Arc<dyn PrimaryStore<Movie>>, anyhow::Error> {
  let backend: Arc<dyn DatabaseBackend> = match config.backend {
    BackendType::Memory => {
      let store = if config.seed {
        MemoryStore::with_records(sample_movies())
      } else {
        MemoryStore::new()
      };
      return Ok(Arc::new(store));
    }
    BackendType::Sqlite => Arc::new(
      SqliteBackend::new(&config.sqlite.path)
        .await
        .with_context(|| format!("opening sqlite database {}", config.sqlite.path))?,
    ),
    BackendType::Postgres => Arc::new(PostgresBackend::new(
      &config.postgres.url,
      config.postgres.max_connections,
    )?),
  };

  backend.init_schema().await?;
  Ok(Arc::new(DocumentStore::<Movie>::new(backend)))
}

async fn open_cache(
  config: &CacheConfig,
) -> Result<(Arc<dyn CacheStore>, Option<Arc<InMemoryCacheStore>>), anyhow::Error> {
  match config.mode {
    CacheMode::Builtin => {
      let cache = Arc::new(InMemoryCacheStore::new());
      let shared: Arc<dyn CacheStore> = cache.clone();
      Ok((shared, Some(cache)))
    }
    CacheMode::Redis => {
      let target = format!("{}:{}", config.redis.host, config.redis.port);
      let cache = RedisCacheStore::new(&config.redis)
        .await
        .with_context(|| format!("connecting to redis at {}", target))?;
      cache.ping().await.context("redis PING failed")?;
      let shared: Arc<dyn CacheStore> = Arc::new(cache);
      Ok((shared, None))
    }
  }
}

fn spawn_sweeper(
  cache: Arc<InMemoryCacheStore>,
  every: Duration,
  mut shutdown_rx: broadcast::Receiver<()>,
) {
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately
    interval.tick().await;
    loop {
      tokio::select! {
        _ = interval.tick() => {
          let evicted = cache.evict_expired();
          if evicted > 0 {
            tracing::debug!("Evicted {} expired cache entries", evicted);
          }
        }
        _ = shutdown_rx.recv() => break,
      }
    }
  });
}

/// Movies a fresh memory store starts with
pub fn sample_movies() -> Vec<Movie> {
  let now = Utc::now();
  [("1", "Inception"), ("2", "The Matrix")]
    .into_iter()
    .map(|(id, name)| Movie {
      id: id.into(),
      name: name.into(),
      title: "Sci-Fi".into(),
      created_at: now,
      updated_at: now,
    })
    .collect()
}
