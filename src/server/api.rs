use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::ServerConfig;
use crate::cache::CacheStats;
use crate::error::Error;
use crate::store::{AccessStats, CachedResourceStore};
use crate::types::{Movie, MovieDraft, MoviePatch};

pub type MovieStore = CachedResourceStore<Movie>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<MovieStore>,
  pub start_time: Instant,
}

impl AppState {
  pub fn new(store: Arc<MovieStore>) -> Self {
    Self {
      store,
      start_time: Instant::now(),
    }
  }
}

impl Error {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::CacheUnavailable(_) | Error::PrimaryStoreUnavailable(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status_code();
    // Backend causes are logged where they occur; clients get the category only
    let message = match &self {
      Error::PrimaryStoreUnavailable(_) => "primary store unavailable".to_string(),
      Error::CacheUnavailable(_) => "cache unavailable".to_string(),
      other => other.to_string(),
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
  }
}

/// Router with every movie route and the HTTP middleware stack
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
  let cors = if config.server.cors_origins.is_empty()
    || config.server.cors_origins.iter().any(|o| o == "*")
  {
    CorsLayer::permissive()
  } else {
    let origins: Vec<_> = config
      .server
      .cors_origins
      .iter()
      .filter_map(|o| o.parse().ok())
      .collect();
    CorsLayer::new()
      .allow_origin(origins)
      .allow_methods(Any)
      .allow_headers(Any)
  };

  let mut app = Router::new()
    // Probes
    .route("/health", get(health_check))
    .route("/ready", get(readiness_check))
    .route("/stats", get(stats))
    .route("/movies", get(list_movies).post(create_movie))
    .route(
      "/movies/{id}",
      get(get_movie)
        .put(update_movie)
        .patch(update_movie)
        .delete(delete_movie),
    )
    .with_state(state)
    .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes));

  if let Some(timeout) = config.limits.request_timeout() {
    app = app.layer(TimeoutLayer::new(timeout));
  }

  app.layer(cors).layer(TraceLayer::new_for_http())
}

async fn health_check() -> StatusCode {
  StatusCode::OK
}

/// Readiness probe - returns 200 if the primary store answers
async fn readiness_check(State(state): State<AppState>) -> StatusCode {
  match state.store.primary().find_all(1).await {
    Ok(_) => StatusCode::OK,
    Err(e) => {
      tracing::warn!("readiness check failed: {:#}", e);
      StatusCode::SERVICE_UNAVAILABLE
    }
  }
}

#[derive(Debug, Deserialize)]
struct ListParams {
  limit: Option<usize>,
}

async fn list_movies(
  State(state): State<AppState>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Movie>>, Error> {
  Ok(Json(state.store.list(params.limit).await?))
}

async fn get_movie(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<Movie>, Error> {
  Ok(Json(state.store.get(&id).await?))
}

async fn create_movie(
  State(state): State<AppState>,
  Json(draft): Json<MovieDraft>,
) -> Result<(StatusCode, Json<Movie>), Error> {
  let movie = state.store.create(draft).await?;
  Ok((StatusCode::CREATED, Json(movie)))
}

async fn update_movie(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(patch): Json<MoviePatch>,
) -> Result<Json<Movie>, Error> {
  Ok(Json(state.store.update(&id, patch).await?))
}

async fn delete_movie(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<StatusCode, Error> {
  state.store.delete(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct StatsResponse {
  primary: &'static str,
  cache: &'static str,
  uptime_secs: u64,
  access: AccessStats,
  cache_store: CacheStats,
  hit_rate: f64,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
  let cache_store = state.store.cache_info().await;
  Json(StatsResponse {
    primary: state.store.primary().name(),
    cache: state.store.cache().name(),
    uptime_secs: state.start_time.elapsed().as_secs(),
    access: state.store.stats(),
    hit_rate: cache_store.hit_rate(),
    cache_store,
  })
}
