use marquee::db::{DatabaseBackend, SqlDialect, SqliteBackend};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

async fn backend() -> SqliteBackend {
  let backend = SqliteBackend::in_memory().await.unwrap();
  backend.init_schema().await.unwrap();
  backend
}

#[tokio::test]
async fn test_sqlite_backend_init_schema() {
  let backend = backend().await;
  // Re-init is a no-op
  assert_ok!(backend.init_schema().await);
  assert_eq!(backend.dialect(), SqlDialect::Sqlite);
}

#[tokio::test]
async fn test_sqlite_backend_insert_and_get() {
  let backend = backend().await;

  let doc = backend
    .insert("movies", "1", json!({"name": "Inception"}))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(doc.id, "1");
  assert_eq!(doc.collection, "movies");

  let retrieved = backend.get("movies", "1").await.unwrap().unwrap();
  assert_eq!(retrieved.data["name"], "Inception");
  assert!(backend.get("movies", "2").await.unwrap().is_none());
  assert!(backend.get("series", "1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_backend_insert_taken_id() {
  let backend = backend().await;
  backend
    .insert("movies", "1", json!({"name": "Inception"}))
    .await
    .unwrap();

  let again = backend
    .insert("movies", "1", json!({"name": "Other"}))
    .await
    .unwrap();
  assert!(again.is_none());

  let kept = backend.get("movies", "1").await.unwrap().unwrap();
  assert_eq!(kept.data["name"], "Inception");

  // Same id in another collection is independent
  assert!(backend
    .insert("series", "1", json!({"name": "Dark"}))
    .await
    .unwrap()
    .is_some());
}

#[tokio::test]
async fn test_sqlite_backend_update() {
  let backend = backend().await;
  let created = backend
    .insert("movies", "1", json!({"title": "Sci-Fi"}))
    .await
    .unwrap()
    .unwrap();

  let updated = backend
    .update("movies", "1", json!({"title": "Thriller"}))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.data["title"], "Thriller");
  assert_eq!(updated.created_at, created.created_at);
  assert!(updated.updated_at >= created.updated_at);

  assert!(backend
    .update("movies", "9", json!({}))
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn test_sqlite_backend_delete() {
  let backend = backend().await;
  backend
    .insert("movies", "1", json!({"name": "Inception"}))
    .await
    .unwrap();

  let deleted = backend.delete("movies", "1").await.unwrap().unwrap();
  assert_eq!(deleted.data["name"], "Inception");
  assert!(backend.delete("movies", "1").await.unwrap().is_none());
  assert!(backend.get("movies", "1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_backend_list_limit_offset() {
  let backend = backend().await;
  for i in 0..5 {
    backend
      .insert("movies", &format!("m{}", i), json!({"n": i}))
      .await
      .unwrap();
  }

  assert_eq!(backend.list("movies", None, None).await.unwrap().len(), 5);
  let page = backend.list("movies", Some(2), Some(1)).await.unwrap();
  assert_eq!(page.len(), 2);
  assert_err!(backend.list("movies", Some(1_000_000), None).await);
}

#[tokio::test]
async fn test_sqlite_backend_rejects_bad_input() {
  let backend = backend().await;
  assert_err!(backend.insert("Movies!", "1", json!({})).await);
  assert_err!(backend.insert("select", "1", json!({})).await);
  assert_err!(backend.insert("movies", "", json!({})).await);
  assert_err!(backend.get("", "1").await);
}

#[tokio::test]
async fn test_sqlite_backend_file_persists() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("marquee.db");
  let path = path.to_str().unwrap();

  {
    let backend = SqliteBackend::new(path).await.unwrap();
    backend.init_schema().await.unwrap();
    backend
      .insert("movies", "1", json!({"name": "Inception"}))
      .await
      .unwrap();
  }

  let reopened = SqliteBackend::new(path).await.unwrap();
  reopened.init_schema().await.unwrap();
  let doc = reopened.get("movies", "1").await.unwrap().unwrap();
  assert_eq!(doc.data["name"], "Inception");
}
