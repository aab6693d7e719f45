//! Error type for `agora-store-sqlite`.

use agora_core::{StorageError, reaction::Target};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain failure detected inside a transaction (missing post, parent
  /// mismatch, ...). Converted back into the core error unchanged.
  #[error(transparent)]
  Core(#[from] agora_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unexpected column value: {0}")]
  Decode(String),

  /// Another transaction inserted a reaction for the same (user, target)
  /// first. The losing insert was rolled back.
  #[error("concurrent reaction on {0} rejected by uniqueness constraint")]
  DuplicateReaction(Target),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for agora_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      dup @ Error::DuplicateReaction(_) => StorageError::retryable(dup).into(),
      other => StorageError::new(other).into(),
    }
  }
}
