//! JSON REST API for Agora.
//!
//! Exposes an axum [`Router`] backed by a [`Discussion`] over any store that
//! implements both [`DiscussionStore`] and [`SessionStore`]. TLS and the
//! login/registration flows are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", agora_api::api_router(discussion.clone(), "session_id"))
//! ```

pub mod comments;
pub mod credential;
pub mod error;
pub mod feed;
pub mod me;
pub mod posts;
pub mod reactions;

use std::sync::Arc;

use agora_core::{
  Discussion,
  store::{DiscussionStore, SessionStore},
};
use axum::{Router, routing::get};

pub use credential::Credential;
pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub discussion:     Arc<Discussion<S>>,
  /// Name of the cookie carrying the session credential.
  pub session_cookie: Arc<str>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      discussion:     self.discussion.clone(),
      session_cookie: self.session_cookie.clone(),
    }
  }
}

impl<S> ApiState<S> {
  pub(crate) fn error(&self, e: agora_core::Error) -> ApiError {
    ApiError::from_core(e, &self.session_cookie)
  }
}

/// Build a fully-materialised API router around `discussion`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(
  discussion: Arc<Discussion<S>>,
  session_cookie: impl Into<Arc<str>>,
) -> Router<()>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let state = ApiState { discussion, session_cookie: session_cookie.into() };

  Router::new()
    .route("/feed", get(feed::handler::<S>))
    // Posts
    .route("/posts", axum::routing::post(posts::create::<S>))
    .route("/posts/{id}", get(posts::get_one::<S>))
    .route(
      "/posts/{id}/comments",
      get(comments::thread::<S>).post(comments::create::<S>),
    )
    // Reactions
    .route("/reactions", get(reactions::status::<S>).post(reactions::submit::<S>))
    .route("/me", get(me::handler::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
