//! Handlers for `/posts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/posts` | Body: `{"title":…,"body":…,"categories":[…]}` |
//! | `GET`  | `/posts/{id}` | 404 if not found |

use agora_core::{
  id::PostId,
  post::{Post, PostSummary},
  store::{DiscussionStore, SessionStore},
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Deserialize;

use crate::{ApiState, credential::Credential, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:      String,
  pub body:       String,
  #[serde(default)]
  pub categories: Vec<String>,
}

/// `POST /posts`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  credential: Credential,
  Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<Post>), ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let post = state
    .discussion
    .create_post(credential.as_deref(), &body.title, &body.body, body.categories)
    .await
    .map_err(|e| state.error(e))?;
  Ok((StatusCode::CREATED, Json(post)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /posts/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<PostId>,
) -> Result<Json<PostSummary>, ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let summary = state.discussion.post(id).await.map_err(|e| state.error(e))?;
  Ok(Json(summary))
}
