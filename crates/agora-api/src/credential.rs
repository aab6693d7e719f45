//! Extracting the opaque session credential from a request.
//!
//! The session cookie wins; an `Authorization: Bearer <token>` header is
//! accepted for non-browser clients.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};

use crate::ApiState;

/// The raw credential a caller presented, if any. Resolution into an
/// identity happens in the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential(pub Option<String>);

impl Credential {
  pub fn as_deref(&self) -> Option<&str> { self.0.as_deref() }
}

/// Read `cookie_name` from the `Cookie` header(s), falling back to a bearer
/// token. Blank values count as absent.
pub fn read_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
  cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .filter(|(k, _)| *k == name)
    .map(|(_, v)| v.trim())
    .find(|v| !v.is_empty())
    .map(str::to_owned)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
}

impl<S> FromRequestParts<ApiState<S>> for Credential
where
  S: Send + Sync + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Credential(read_credential(&parts.headers, &state.session_cookie)))
  }
}
