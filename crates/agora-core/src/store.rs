//! The storage traits consumed by the core.
//!
//! Implemented by storage backends (e.g. `agora-store-sqlite`). The core
//! components and the HTTP layer depend on these abstractions, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  comment::{Comment, NewComment, ThreadRow},
  id::{PostId, UserId},
  post::{NewPost, Post, PostQuery, PostSummary},
  reaction::{Polarity, Reaction, ReactionCounts, ReactionOutcome, Target},
  user::User,
};

/// Persistent storage for posts, comments and reactions.
///
/// Every write that validates before it mutates (post + categories, comment
/// parent checks, reaction toggles) must run as a single atomic unit so that
/// concurrent requests on the same target are serialised and a failure leaves
/// no partial state behind.
///
/// Domain failures detected by the store (missing post, parent, or target)
/// are reported through `Self::Error` and must convert into the matching
/// [`crate::Error`] variant.
pub trait DiscussionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Users ─────────────────────────────────────────────────────────────

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Insert the post row and every category row in one transaction.
  fn create_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    id: PostId,
  ) -> impl Future<Output = Result<Option<PostSummary>, Self::Error>> + Send + '_;

  /// Posts matching `query`, newest first, with derived reaction counts.
  fn list_posts<'a>(
    &'a self,
    query: &'a PostQuery,
  ) -> impl Future<Output = Result<Vec<PostSummary>, Self::Error>> + Send + 'a;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Check post existence, parent existence and ownership, then the author
  /// identity, and insert, all in one transaction.
  fn create_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Every comment on `post_id` in insertion order, with author names and
  /// reaction counts. Fails with a post-not-found error for unknown posts.
  fn thread_rows(
    &self,
    post_id: PostId,
  ) -> impl Future<Output = Result<Vec<ThreadRow>, Self::Error>> + Send + '_;

  // ── Reactions ─────────────────────────────────────────────────────────

  /// Read the current reaction, apply
  /// [`ReactionState::apply`](crate::reaction::ReactionState::apply), and
  /// recount, in one transaction.
  fn apply_reaction(
    &self,
    user_id: UserId,
    target: Target,
    polarity: Polarity,
  ) -> impl Future<Output = Result<ReactionOutcome, Self::Error>> + Send + '_;

  fn reaction_counts(
    &self,
    target: Target,
  ) -> impl Future<Output = Result<ReactionCounts, Self::Error>> + Send + '_;

  fn reaction_of(
    &self,
    user_id: UserId,
    target: Target,
  ) -> impl Future<Output = Result<Option<Reaction>, Self::Error>> + Send + '_;
}

/// The raw token → user mapping that
/// [`IdentityResolver`](crate::identity::IdentityResolver) wraps.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// The user owning the live session `token`, or `None` if there is no such
  /// session or it has expired.
  fn session_user<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + 'a;
}
