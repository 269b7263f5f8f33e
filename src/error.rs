use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: String, id: String },

  #[error("remote request failed: {0}")]
  Remote(String),

  #[error("remote request timed out after {0:?}")]
  Timeout(Duration),

  #[error("cell ({row}, {col}) is out of range")]
  Index { row: usize, col: usize },

  #[error("invalid operation: {0}")]
  InvalidOperation(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("malformed payload: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(String),
}

impl Error {
  pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Error::NotFound {
      kind: kind.into(),
      id: id.into(),
    }
  }

  /// Timeouts count as remote failures.
  pub fn is_remote(&self) -> bool {
    matches!(self, Error::Remote(_) | Error::Timeout(_))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. })
  }
}

/// Map a poisoned lock into a storage error.
pub fn poisoned<T>(err: std::sync::PoisonError<T>) -> Error {
  Error::Storage(format!("Lock poisoned: {}", err))
}
