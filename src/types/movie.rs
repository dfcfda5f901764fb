use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::resource::Resource;

/// Maximum length of a client-supplied movie id
pub const MAX_KEY_LENGTH: usize = 64;

/// Maximum length of the name and title fields
pub const MAX_FIELD_LENGTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
  pub id: String,
  pub name: String,
  pub title: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Body of a create request. Every field is optional at the wire level so a
/// missing field becomes a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieDraft {
  #[serde(default, deserialize_with = "deserialize_key")]
  pub id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
}

impl MovieDraft {
  pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      id: None,
      name: Some(name.into()),
      title: Some(title.into()),
    }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }
}

/// Body of an update request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoviePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

impl MoviePatch {
  pub fn name(name: impl Into<String>) -> Self {
    Self {
      name: Some(name.into()),
      title: None,
    }
  }

  pub fn title(title: impl Into<String>) -> Self {
    Self {
      name: None,
      title: Some(title.into()),
    }
  }
}

/// Ids arrive as strings or as integers (`{"id": 1}`); both are stored as text.
fn deserialize_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawKey {
    Text(String),
    Number(i64),
  }

  Ok(Option::<RawKey>::deserialize(deserializer)?.map(|raw| match raw {
    RawKey::Text(s) => s,
    RawKey::Number(n) => n.to_string(),
  }))
}

/// Validates a movie id: 1..=64 chars of ASCII alphanumerics, `-` or `_`.
pub fn validate_key(key: &str) -> Result<(), String> {
  if key.is_empty() {
    return Err("id cannot be empty".into());
  }
  if key.len() > MAX_KEY_LENGTH {
    return Err(format!("id too long: {} > {}", key.len(), MAX_KEY_LENGTH));
  }
  if let Some(c) = key
    .chars()
    .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
  {
    return Err(format!("invalid character in id: '{}'", c));
  }
  Ok(())
}

fn validate_field(field: &str, value: &str) -> Result<(), String> {
  if value.trim().is_empty() {
    return Err(format!("{} cannot be blank", field));
  }
  if value.len() > MAX_FIELD_LENGTH {
    return Err(format!(
      "{} too long: {} > {}",
      field,
      value.len(),
      MAX_FIELD_LENGTH
    ));
  }
  Ok(())
}

impl Resource for Movie {
  type Draft = MovieDraft;
  type Patch = MoviePatch;

  const COLLECTION: &'static str = "movies";

  fn key(&self) -> &str {
    &self.id
  }

  fn draft_key(draft: &MovieDraft) -> Option<&str> {
    draft.id.as_deref()
  }

  fn validate_draft(draft: &MovieDraft) -> Result<(), String> {
    if let Some(id) = &draft.id {
      validate_key(id)?;
    }
    match &draft.name {
      Some(name) => validate_field("name", name)?,
      None => return Err("name is required".into()),
    }
    match &draft.title {
      Some(title) => validate_field("title", title)?,
      None => return Err("title is required".into()),
    }
    Ok(())
  }

  fn validate_patch(patch: &MoviePatch) -> Result<(), String> {
    if patch.name.is_none() && patch.title.is_none() {
      return Err("update must set at least one of name, title".into());
    }
    if let Some(name) = &patch.name {
      validate_field("name", name)?;
    }
    if let Some(title) = &patch.title {
      validate_field("title", title)?;
    }
    Ok(())
  }

  fn from_draft(key: String, draft: MovieDraft, now: DateTime<Utc>) -> Self {
    Self {
      id: key,
      name: draft.name.unwrap_or_default(),
      title: draft.title.unwrap_or_default(),
      created_at: now,
      updated_at: now,
    }
  }

  fn apply_patch(&mut self, patch: &MoviePatch, now: DateTime<Utc>) {
    if let Some(name) = &patch.name {
      self.name = name.clone();
    }
    if let Some(title) = &patch.title {
      self.title = title.clone();
    }
    self.updated_at = now;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_draft_accepts_numeric_id() {
    let draft: MovieDraft =
      serde_json::from_str(r#"{"id": 42, "name": "Inception", "title": "Sci-Fi"}"#).unwrap();
    assert_eq!(draft.id.as_deref(), Some("42"));

    let draft: MovieDraft =
      serde_json::from_str(r#"{"id": "abc-1", "name": "Inception", "title": "Sci-Fi"}"#).unwrap();
    assert_eq!(draft.id.as_deref(), Some("abc-1"));

    let draft: MovieDraft = serde_json::from_str(r#"{"name": "Inception"}"#).unwrap();
    assert!(draft.id.is_none());
  }

  #[test]
  fn test_validate_draft() {
    assert!(Movie::validate_draft(&MovieDraft::new("Inception", "Sci-Fi")).is_ok());
    assert!(Movie::validate_draft(&MovieDraft::new("Inception", "Sci-Fi").with_id("7")).is_ok());

    let missing_title = MovieDraft {
      title: None,
      ..MovieDraft::new("Inception", "")
    };
    assert_eq!(
      Movie::validate_draft(&missing_title).unwrap_err(),
      "title is required"
    );
    assert!(Movie::validate_draft(&MovieDraft::new("  ", "Sci-Fi")).is_err());
    assert!(Movie::validate_draft(&MovieDraft::new("Inception", "Sci-Fi").with_id("a b")).is_err());
    assert!(Movie::validate_draft(&MovieDraft::new("Inception", "Sci-Fi").with_id("")).is_err());
  }

  #[test]
  fn test_validate_patch() {
    assert!(Movie::validate_patch(&MoviePatch::default()).is_err());
    assert!(Movie::validate_patch(&MoviePatch::title("Thriller")).is_ok());
    assert!(Movie::validate_patch(&MoviePatch::name("")).is_err());
  }

  #[test]
  fn test_apply_patch_keeps_absent_fields() {
    let created = Utc::now();
    let mut movie = Movie::from_draft("1".into(), MovieDraft::new("Inception", "Sci-Fi"), created);
    let later = created + chrono::Duration::seconds(5);
    movie.apply_patch(&MoviePatch::title("Thriller"), later);

    assert_eq!(movie.name, "Inception");
    assert_eq!(movie.title, "Thriller");
    assert_eq!(movie.created_at, created);
    assert_eq!(movie.updated_at, later);
  }

  #[test]
  fn test_validate_key() {
    assert!(validate_key("42").is_ok());
    assert!(validate_key("0b9e-44_x").is_ok());
    assert!(validate_key("").is_err());
    assert!(validate_key("movie:1").is_err());
    assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_err());
  }
}
