//! API error type and [`axum::response::IntoResponse`] implementation.

use std::sync::Arc;

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// The presented session credential is unknown or expired. The response
  /// clears the named cookie so the client stops sending it.
  #[error("invalid session credential")]
  InvalidCredential { cookie: Arc<str> },

  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] agora_core::Error),
}

impl ApiError {
  /// Map a core error onto its HTTP class.
  pub fn from_core(e: agora_core::Error, cookie: &Arc<str>) -> Self {
    use agora_core::Error as E;

    match e {
      E::InvalidInput(_) | E::ParentMismatch { .. } => Self::BadRequest(e.to_string()),
      E::Unauthorized => Self::Unauthorized(e.to_string()),
      E::InvalidCredential => Self::InvalidCredential { cookie: cookie.clone() },
      E::PostNotFound(_) | E::ParentNotFound(_) | E::TargetNotFound(_) => {
        Self::NotFound(e.to_string())
      }
      E::Storage(_) => Self::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::InvalidCredential { .. } => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "storage failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if let ApiError::InvalidCredential { cookie } = &self
      && let Ok(value) =
        HeaderValue::from_str(&format!("{cookie}=; Path=/; Max-Age=0; HttpOnly"))
    {
      res.headers_mut().insert(header::SET_COOKIE, value);
    }
    res
  }
}
