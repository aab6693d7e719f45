//! Handlers for `/reactions`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reactions?target_type=post&target_id=…` | Caller's state and counts |
//! | `POST` | `/reactions` | Body: `{"target_type":…,"target_id":…,"polarity":"like"}` |

use agora_core::{
  reaction::{Polarity, ReactionOutcome, Target, TargetKind},
  store::{DiscussionStore, SessionStore},
};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, credential::Credential, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TargetParams {
  pub target_type: TargetKind,
  pub target_id:   Uuid,
}

impl TargetParams {
  pub fn target(&self) -> Target { Target::from_parts(self.target_type, self.target_id) }
}

/// `GET /reactions`
pub async fn status<S>(
  State(state): State<ApiState<S>>,
  credential: Credential,
  Query(params): Query<TargetParams>,
) -> Result<Json<ReactionOutcome>, ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let outcome = state
    .discussion
    .reaction_status(credential.as_deref(), params.target())
    .await
    .map_err(|e| state.error(e))?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  #[serde(flatten)]
  pub target:   TargetParams,
  pub polarity: Polarity,
}

/// `POST /reactions`
///
/// A toggle that loses an insert race to a concurrent toggle by the same user
/// is replayed once; the second attempt sees the winner's row.
pub async fn submit<S>(
  State(state): State<ApiState<S>>,
  credential: Credential,
  Json(body): Json<SubmitBody>,
) -> Result<Json<ReactionOutcome>, ApiError>
where
  S: DiscussionStore + SessionStore + 'static,
{
  let target = body.target.target();
  let d = &state.discussion;

  let outcome = match d.submit_reaction(credential.as_deref(), target, body.polarity).await {
    Err(e) if e.is_retryable() => {
      tracing::warn!(%target, error = %e, "retrying reaction after lost race");
      d.submit_reaction(credential.as_deref(), target, body.polarity).await
    }
    other => other,
  }
  .map_err(|e| state.error(e))?;

  Ok(Json(outcome))
}
