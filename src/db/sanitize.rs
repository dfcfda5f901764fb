//! Input checks applied before any value reaches a query.
//!
//! Every query is parameterized; these checks bound sizes and keep
//! collection names to a safe alphabet.

use thiserror::Error;

/// Maximum length for collection names
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Maximum length for document ids
pub const MAX_DOCUMENT_ID_LENGTH: usize = 128;

/// Maximum rows a single list call may return
pub const MAX_LIMIT: usize = 100_000;

/// Maximum rows a list call may skip
pub const MAX_OFFSET: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
  #[error("Identifier cannot be empty")]
  EmptyIdentifier,
  #[error("Identifier too long: {0} > {max}", max = MAX_IDENTIFIER_LENGTH)]
  IdentifierTooLong(usize),
  #[error("Identifier must start with letter or underscore, got '{0}'")]
  InvalidIdentifierStart(char),
  #[error("Collection names must be lowercase alphanumeric, got '{0}'")]
  InvalidCollectionChar(char),
  #[error("'{0}' is a reserved SQL keyword")]
  ReservedKeyword(String),
  #[error("Document id must be 1..={max} bytes without control characters", max = MAX_DOCUMENT_ID_LENGTH)]
  InvalidDocumentId,
  #[error("Limit {0} exceeds maximum {max}", max = MAX_LIMIT)]
  LimitTooLarge(usize),
  #[error("Offset {0} exceeds maximum {max}", max = MAX_OFFSET)]
  OffsetTooLarge(usize),
}

/// Validates a collection name: lowercase alphanumeric and underscore,
/// starting with a letter or underscore.
pub fn validate_collection_name(s: &str) -> Result<(), SanitizeError> {
  let Some(first) = s.chars().next() else {
    return Err(SanitizeError::EmptyIdentifier);
  };

  if s.len() > MAX_IDENTIFIER_LENGTH {
    return Err(SanitizeError::IdentifierTooLong(s.len()));
  }

  if !first.is_ascii_alphabetic() && first != '_' {
    return Err(SanitizeError::InvalidIdentifierStart(first));
  }

  if let Some(c) = s
    .chars()
    .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '_')
  {
    return Err(SanitizeError::InvalidCollectionChar(c));
  }

  let upper = s.to_uppercase();
  if SQL_KEYWORDS.contains(&upper.as_str()) {
    return Err(SanitizeError::ReservedKeyword(s.to_string()));
  }

  Ok(())
}

pub fn validate_document_id(id: &str) -> Result<(), SanitizeError> {
  if id.is_empty() || id.len() > MAX_DOCUMENT_ID_LENGTH || id.chars().any(char::is_control) {
    return Err(SanitizeError::InvalidDocumentId);
  }
  Ok(())
}

pub fn validate_limit(limit: usize) -> Result<(), SanitizeError> {
  if limit > MAX_LIMIT {
    return Err(SanitizeError::LimitTooLarge(limit));
  }
  Ok(())
}

pub fn validate_offset(offset: usize) -> Result<(), SanitizeError> {
  if offset > MAX_OFFSET {
    return Err(SanitizeError::OffsetTooLarge(offset));
  }
  Ok(())
}

/// Common SQL keywords that cannot be used as collection names
const SQL_KEYWORDS: &[&str] = &[
  "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TABLE", "INDEX", "FROM",
  "WHERE", "AND", "OR", "NOT", "NULL", "ORDER", "BY", "LIMIT", "OFFSET", "JOIN", "UNION", "INTO",
  "VALUES", "SET", "GRANT", "REVOKE", "TRUNCATE",
];
