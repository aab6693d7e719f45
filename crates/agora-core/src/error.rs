//! Error types for `agora-core`.
//!
//! Every component returns the most specific variant it can determine. The
//! facade passes the first error it encounters up unchanged.

use thiserror::Error;

use crate::{
  id::{CommentId, PostId},
  reaction::Target,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("an authenticated user is required")]
  Unauthorized,

  #[error("session credential does not map to a live session")]
  InvalidCredential,

  #[error("post not found: {0}")]
  PostNotFound(PostId),

  #[error("parent comment not found: {0}")]
  ParentNotFound(CommentId),

  #[error("parent comment {parent} does not belong to post {post}")]
  ParentMismatch { parent: CommentId, post: PostId },

  #[error("reaction target not found: {0}")]
  TargetNotFound(Target),

  #[error(transparent)]
  Storage(#[from] StorageError),
}

impl Error {
  /// Caller-caused failures (4xx-class). Everything else is a backend fault.
  pub fn is_client_error(&self) -> bool { !matches!(self, Self::Storage(_)) }

  /// Whether a single blind retry is known to be safe.
  ///
  /// Only set for the reaction duplicate-key race: the losing insert was
  /// rolled back, so replaying the toggle cannot duplicate a side effect.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Storage(e) if e.retryable)
  }
}

impl From<std::convert::Infallible> for Error {
  fn from(e: std::convert::Infallible) -> Self { match e {} }
}

/// A failure of the backing store, surfaced as-is.
#[derive(Debug, Error)]
#[error("storage error: {source}")]
pub struct StorageError {
  pub retryable: bool,
  #[source]
  pub source:    Box<dyn std::error::Error + Send + Sync>,
}

impl StorageError {
  pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self { retryable: false, source: source.into() }
  }

  pub fn retryable(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self { retryable: true, source: source.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
