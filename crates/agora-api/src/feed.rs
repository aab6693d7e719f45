//! Handler for `GET /feed`.
//!
//! | Param | Notes |
//! |-------|-------|
//! | `categories` | Comma-separated; a post matches if it has any of them |
//! | `author` | A user id; restricts the feed to that author |

use agora_core::{
  discussion::Feed,
  id::UserId,
  post::PostQuery,
  store::{DiscussionStore, SessionStore},
};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;

use crate::{ApiState, credential::Credential, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
  pub categories: Option<String>,
  pub author:     Option<UserId>,
}

impl FeedParams {
  pub fn to_query(&self) -> PostQuery {
    let mut query = PostQuery::with_categories(
      self.categories.as_deref().unwrap_or_default().split(','),
    );
    query.author = self.author;
    query
  }
}

/// `GET /feed[?categories=a,b][&author=<id>]`
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  credential: Credential,
  Query(params): Query<FeedParams>,
) -> Result<Json<Feed>, ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let feed = state
    .discussion
    .assemble_feed(credential.as_deref(), &params.to_query())
    .await
    .map_err(|e| state.error(e))?;
  Ok(Json(feed))
}
