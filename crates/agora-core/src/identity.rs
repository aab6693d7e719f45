//! Mapping opaque session credentials to an [`Identity`].

use std::sync::Arc;

use crate::{Error, Result, store::SessionStore, user::Identity};

/// Resolves the credential a caller presented into an [`Identity`].
///
/// The session store is injected so tests can substitute their own.
pub struct IdentityResolver<S> {
  sessions: Arc<S>,
}

impl<S: SessionStore> IdentityResolver<S> {
  pub fn new(sessions: Arc<S>) -> Self { Self { sessions } }

  /// - no credential (or a blank one) → [`Identity::Anonymous`]
  /// - a credential with a live session → [`Identity::User`]
  /// - any other credential → [`Error::InvalidCredential`]; the transport
  ///   layer should clear it from the client
  pub async fn resolve(&self, credential: Option<&str>) -> Result<Identity> {
    let Some(token) = credential.map(str::trim).filter(|t| !t.is_empty()) else {
      return Ok(Identity::Anonymous);
    };

    match self.sessions.session_user(token).await.map_err(Into::<Error>::into)? {
      Some(user_id) => Ok(Identity::User(user_id)),
      None => Err(Error::InvalidCredential),
    }
  }
}
