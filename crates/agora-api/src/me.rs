//! Handler for `GET /me`: the calling user's profile.

use agora_core::{
  store::{DiscussionStore, SessionStore},
  user::User,
};
use axum::{Json, extract::State};

use crate::{ApiState, credential::Credential, error::ApiError};

pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  credential: Credential,
) -> Result<Json<User>, ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let user = state
    .discussion
    .viewer(credential.as_deref())
    .await
    .map_err(|e| state.error(e))?;
  Ok(Json(user))
}
