#![cfg(feature = "server")]

//! Movie routes driven through the axum router with `oneshot`

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use marquee::cache::{CacheStore, InMemoryCacheStore};
use marquee::server::{build_router, sample_movies, AppState, MovieStore, ServerConfig};
use marquee::store::{CacheSettings, CachedResourceStore, MemoryStore, PrimaryStore};
use marquee::types::{Movie, MovieDraft, MoviePatch};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app_with(records: Vec<Movie>) -> (Router, Arc<MovieStore>) {
  let store = Arc::new(CachedResourceStore::<Movie>::new(
    Arc::new(MemoryStore::with_records(records)),
    Arc::new(InMemoryCacheStore::new()),
    CacheSettings::new("movie_", 3600),
  ));
  let router = build_router(AppState::new(store.clone()), &ServerConfig::default());
  (router, store)
}

fn app() -> (Router, Arc<MovieStore>) {
  app_with(Vec::new())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(body) => builder
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, value)
}

#[tokio::test]
async fn test_movie_lifecycle() {
  let (app, store) = app();

  let (status, created) = send(
    &app,
    Method::POST,
    "/movies",
    Some(json!({"name": "Inception", "title": "Sci-Fi"})),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = created["id"].as_str().unwrap().to_string();
  assert_eq!(created["name"], "Inception");

  let (status, fetched) = send(&app, Method::GET, &format!("/movies/{}", id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched, created);

  let (status, updated) = send(
    &app,
    Method::PUT,
    &format!("/movies/{}", id),
    Some(json!({"title": "Thriller"})),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["name"], "Inception");
  assert_eq!(updated["title"], "Thriller");

  // Primary and cache both carry the update
  let primary = store.primary().find_by_key(&id).await.unwrap().unwrap();
  assert_eq!(primary.title, "Thriller");
  let cached = store
    .cache()
    .get(&store.cache_key(&id))
    .await
    .unwrap()
    .unwrap();
  let cached: Movie = serde_json::from_slice(&cached).unwrap();
  assert_eq!(cached.title, "Thriller");

  let (status, body) = send(&app, Method::DELETE, &format!("/movies/{}", id), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert_eq!(body, Value::Null);

  let (status, body) = send(&app, Method::GET, &format!("/movies/{}", id), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn test_patch_updates_single_field() {
  let (app, _) = app_with(sample_movies());

  let (status, body) = send(
    &app,
    Method::PATCH,
    "/movies/2",
    Some(json!({"name": "The Matrix Reloaded"})),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "The Matrix Reloaded");
  assert_eq!(body["title"], "Sci-Fi");
}

#[tokio::test]
async fn test_numeric_id_is_accepted() {
  let (app, _) = app();

  let (status, body) = send(
    &app,
    Method::POST,
    "/movies",
    Some(json!({"id": 3, "name": "Alien", "title": "Horror"})),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["id"], "3");

  let (status, _) = send(&app, Method::GET, "/movies/3", None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_error_statuses() {
  let (app, _) = app_with(sample_movies());

  // Missing field
  let (status, body) = send(&app, Method::POST, "/movies", Some(json!({"name": "Alien"}))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].as_str().unwrap().contains("title"));

  // Taken id
  let (status, _) = send(
    &app,
    Method::POST,
    "/movies",
    Some(json!({"id": "1", "name": "Alien", "title": "Horror"})),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  // Empty update
  let (status, _) = send(&app, Method::PUT, "/movies/1", Some(json!({}))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  // Unknown id
  let (status, _) = send(&app, Method::PUT, "/movies/99", Some(json!({"title": "x"}))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&app, Method::DELETE, "/movies/99", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // Malformed body
  let request = Request::builder()
    .method(Method::POST)
    .uri("/movies")
    .header("content-type", "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let response = app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_movies() {
  let (app, _) = app_with(sample_movies());

  let (status, body) = send(&app, Method::GET, "/movies", None).await;
  assert_eq!(status, StatusCode::OK);
  let names: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|m| m["name"].as_str().unwrap().to_string())
    .collect();
  assert_eq!(names, vec!["Inception", "The Matrix"]);

  let (_, body) = send(&app, Method::GET, "/movies?limit=1", None).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_probes_and_stats() {
  let (app, _) = app_with(sample_movies());

  let (status, _) = send(&app, Method::GET, "/health", None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&app, Method::GET, "/ready", None).await;
  assert_eq!(status, StatusCode::OK);

  send(&app, Method::GET, "/movies/1", None).await;
  send(&app, Method::GET, "/movies/1", None).await;

  let (status, stats) = send(&app, Method::GET, "/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["primary"], "memory");
  assert_eq!(stats["cache"], "builtin");
  assert_eq!(stats["access"]["cache_hits"], 1);
  assert_eq!(stats["access"]["cache_misses"], 1);
  assert_eq!(stats["cache_store"]["keys"], 1);
  assert_eq!(stats["cache_store"]["hits"], 1);
  assert_eq!(stats["cache_store"]["misses"], 1);
  assert_eq!(stats["hit_rate"], 0.5);
}

/// Primary store that either fails with a backend error or never answers
struct BrokenPrimary {
  hang: bool,
}

impl BrokenPrimary {
  async fn fail<T>(&self) -> anyhow::Result<T> {
    if self.hang {
      std::future::pending::<()>().await;
    }
    Err(anyhow::anyhow!("connection refused by db-internal.example:5432"))
  }
}

#[async_trait::async_trait]
impl PrimaryStore<Movie> for BrokenPrimary {
  async fn find_by_key(&self, _key: &str) -> anyhow::Result<Option<Movie>> {
    self.fail().await
  }

  async fn find_all(&self, _limit: usize) -> anyhow::Result<Vec<Movie>> {
    self.fail().await
  }

  async fn insert(&self, _draft: MovieDraft) -> anyhow::Result<Option<Movie>> {
    self.fail().await
  }

  async fn update_by_key(&self, _key: &str, _patch: &MoviePatch) -> anyhow::Result<Option<Movie>> {
    self.fail().await
  }

  async fn delete_by_key(&self, _key: &str) -> anyhow::Result<bool> {
    self.fail().await
  }

  fn name(&self) -> &'static str {
    "broken"
  }
}

fn broken_app(hang: bool, config: &ServerConfig) -> Router {
  let store = Arc::new(CachedResourceStore::<Movie>::new(
    Arc::new(BrokenPrimary { hang }),
    Arc::new(InMemoryCacheStore::new()),
    CacheSettings::new("movie_", 3600),
  ));
  build_router(AppState::new(store), config)
}

#[tokio::test]
async fn test_primary_failure_body_hides_backend_detail() {
  let app = broken_app(false, &ServerConfig::default());

  let (status, body) = send(&app, Method::GET, "/movies/1", None).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], "primary store unavailable");
  assert!(!body.to_string().contains("db-internal"));

  let (status, body) = send(&app, Method::POST, "/movies", Some(json!({ "title": "Heat" }))).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], "primary store unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_answers_408() {
  let mut config = ServerConfig::default();
  config.limits.request_timeout_ms = 50;
  let app = broken_app(true, &config);

  let request = Request::builder()
    .uri("/movies/1")
    .body(Body::empty())
    .unwrap();
  let response = tokio::time::timeout(Duration::from_secs(5), app.oneshot(request))
    .await
    .expect("request deadline did not fire")
    .unwrap();
  assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}
