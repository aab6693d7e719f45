//! Like/dislike reactions and the per-(user, target) toggle state machine.
//!
//! A user holds at most one reaction per target. Re-sending the polarity the
//! user already holds removes it (click-to-toggle); sending the opposite
//! polarity flips it in place. Counts are never stored, only recounted.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  id::{CommentId, PostId, ReactionId, UserId},
  store::DiscussionStore,
  user::Identity,
};

// ─── Targets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
  Like,
  Dislike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  Post,
  Comment,
}

/// Something that can receive a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target_type", content = "target_id", rename_all = "lowercase")]
pub enum Target {
  Post(PostId),
  Comment(CommentId),
}

impl Target {
  pub fn kind(&self) -> TargetKind {
    match self {
      Self::Post(_) => TargetKind::Post,
      Self::Comment(_) => TargetKind::Comment,
    }
  }

  pub fn id(&self) -> uuid::Uuid {
    match self {
      Self::Post(id) => id.0,
      Self::Comment(id) => id.0,
    }
  }

  pub fn from_parts(kind: TargetKind, id: uuid::Uuid) -> Self {
    match kind {
      TargetKind::Post => Self::Post(PostId(id)),
      TargetKind::Comment => Self::Comment(CommentId(id)),
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Post(id) => write!(f, "post {id}"),
      Self::Comment(id) => write!(f, "comment {id}"),
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// The single reaction a user holds on a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
  pub reaction_id: ReactionId,
  pub user_id:     UserId,
  pub target:      Target,
  pub polarity:    Polarity,
  pub updated_at:  DateTime<Utc>,
}

/// Aggregate counts for a target, derived from reaction rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
  pub like_count:    u64,
  pub dislike_count: u64,
}

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionState {
  NoReaction,
  Liked,
  Disliked,
}

/// The row-level write a transition requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEffect {
  Insert(Polarity),
  Update(Polarity),
  Delete,
}

impl ReactionState {
  /// Apply a requested polarity, returning the next state and the write that
  /// realises it.
  pub fn apply(self, requested: Polarity) -> (Self, ReactionEffect) {
    match (self, requested) {
      (Self::NoReaction, p) => (p.into(), ReactionEffect::Insert(p)),
      (Self::Liked, Polarity::Like) | (Self::Disliked, Polarity::Dislike) => {
        (Self::NoReaction, ReactionEffect::Delete)
      }
      (Self::Liked, Polarity::Dislike) | (Self::Disliked, Polarity::Like) => {
        (requested.into(), ReactionEffect::Update(requested))
      }
    }
  }
}

impl From<Polarity> for ReactionState {
  fn from(p: Polarity) -> Self {
    match p {
      Polarity::Like => Self::Liked,
      Polarity::Dislike => Self::Disliked,
    }
  }
}

impl From<Option<Polarity>> for ReactionState {
  fn from(p: Option<Polarity>) -> Self { p.map_or(Self::NoReaction, Self::from) }
}

/// Result of [`ReactionLedger::apply_reaction`]: the caller's new state and
/// the authoritative counts recounted inside the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionOutcome {
  pub state:  ReactionState,
  #[serde(flatten)]
  pub counts: ReactionCounts,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Owns the at-most-one-reaction-per-(user, target) invariant.
pub struct ReactionLedger<S> {
  store: Arc<S>,
}

impl<S: DiscussionStore> ReactionLedger<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Toggle `identity`'s reaction on `target`.
  ///
  /// Anonymous callers are rejected before the store is touched. The store
  /// checks that the target exists, applies [`ReactionState::apply`] and
  /// recounts, all in one transaction.
  pub async fn apply_reaction(
    &self,
    identity: &Identity,
    target: Target,
    polarity: Polarity,
  ) -> Result<ReactionOutcome> {
    let user_id = identity.require_user()?;
    self
      .store
      .apply_reaction(user_id, target, polarity)
      .await
      .map_err(Into::into)
  }

  pub async fn counts(&self, target: Target) -> Result<ReactionCounts> {
    self.store.reaction_counts(target).await.map_err(Into::into)
  }

  /// The reaction `user_id` currently holds on `target`, if any.
  pub async fn reaction_of(
    &self,
    user_id: UserId,
    target: Target,
  ) -> Result<Option<Reaction>> {
    self.store.reaction_of(user_id, target).await.map_err(Into::into)
  }
}
