//! Handlers for `/posts/{id}/comments`.

use agora_core::{
  comment::{Comment, CommentNode},
  id::{CommentId, PostId},
  store::{DiscussionStore, SessionStore},
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Deserialize;

use crate::{ApiState, credential::Credential, error::ApiError};

/// `GET /posts/{id}/comments`: the post's comment forest.
pub async fn thread<S>(
  State(state): State<ApiState<S>>,
  Path(post_id): Path<PostId>,
) -> Result<Json<Vec<CommentNode>>, ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let nodes = state
    .discussion
    .assemble_thread(post_id)
    .await
    .map_err(|e| state.error(e))?;
  Ok(Json(nodes))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub content:   String,
  pub parent_id: Option<CommentId>,
}

/// `POST /posts/{id}/comments` with body `{"content":…,"parent_id":null}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  credential: Credential,
  Path(post_id): Path<PostId>,
  Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let comment = state
    .discussion
    .submit_comment(credential.as_deref(), post_id, &body.content, body.parent_id)
    .await
    .map_err(|e| state.error(e))?;
  Ok((StatusCode::CREATED, Json(comment)))
}
