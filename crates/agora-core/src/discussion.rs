//! [`Discussion`]: the request-facing facade.
//!
//! Each operation resolves the caller's identity once and delegates to the
//! owning component. Errors are passed up unchanged and nothing is retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  comment::{Comment, CommentNode, CommentTree},
  id::{CommentId, PostId},
  identity::IdentityResolver,
  post::{Post, PostComposer, PostQuery, PostSummary},
  reaction::{Polarity, ReactionLedger, ReactionOutcome, ReactionState, Target},
  store::{DiscussionStore, SessionStore},
  user::{Identity, User},
};

/// One post in the feed, with its full comment forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
  #[serde(flatten)]
  pub summary:  PostSummary,
  pub comments: Vec<CommentNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
  /// Who the feed was assembled for.
  pub viewer:  Identity,
  /// Newest post first.
  pub entries: Vec<FeedEntry>,
}

pub struct Discussion<S> {
  store:     Arc<S>,
  identity:  IdentityResolver<S>,
  posts:     PostComposer<S>,
  comments:  CommentTree<S>,
  reactions: ReactionLedger<S>,
}

impl<S> Discussion<S>
where
  S: DiscussionStore + SessionStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      identity: IdentityResolver::new(store.clone()),
      posts: PostComposer::new(store.clone()),
      comments: CommentTree::new(store.clone()),
      reactions: ReactionLedger::new(store.clone()),
      store,
    }
  }

  pub async fn resolve_identity(&self, credential: Option<&str>) -> Result<Identity> {
    self.identity.resolve(credential).await
  }

  /// The profile of the calling user.
  pub async fn viewer(&self, credential: Option<&str>) -> Result<User> {
    let user_id = self.resolve_identity(credential).await?.require_user()?;
    self
      .store
      .get_user(user_id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or(Error::Unauthorized)
  }

  pub async fn create_post(
    &self,
    credential: Option<&str>,
    title: &str,
    body: &str,
    categories: Vec<String>,
  ) -> Result<Post> {
    let identity = self.resolve_identity(credential).await?;
    self.posts.create_post(&identity, title, body, categories).await
  }

  pub async fn submit_comment(
    &self,
    credential: Option<&str>,
    post_id: PostId,
    content: &str,
    parent_id: Option<CommentId>,
  ) -> Result<Comment> {
    let identity = self.resolve_identity(credential).await?;
    self
      .comments
      .create_comment(&identity, post_id, content, parent_id)
      .await
  }

  pub async fn submit_reaction(
    &self,
    credential: Option<&str>,
    target: Target,
    polarity: Polarity,
  ) -> Result<ReactionOutcome> {
    let identity = self.resolve_identity(credential).await?;
    self.reactions.apply_reaction(&identity, target, polarity).await
  }

  /// The caller's current state on `target` alongside its counts. Anonymous
  /// callers always see [`ReactionState::NoReaction`].
  pub async fn reaction_status(
    &self,
    credential: Option<&str>,
    target: Target,
  ) -> Result<ReactionOutcome> {
    let identity = self.resolve_identity(credential).await?;
    let counts = self.reactions.counts(target).await?;
    let held = match identity.user_id() {
      Some(user_id) => self.reactions.reaction_of(user_id, target).await?,
      None => None,
    };
    let state = ReactionState::from(held.map(|r| r.polarity));
    Ok(ReactionOutcome { state, counts })
  }

  pub async fn post(&self, post_id: PostId) -> Result<PostSummary> {
    self.posts.get_post(post_id).await
  }

  pub async fn assemble_thread(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
    self.comments.assemble_thread(post_id).await
  }

  /// Every post matching `query`, newest first, each with its comment forest.
  pub async fn assemble_feed(
    &self,
    credential: Option<&str>,
    query: &PostQuery,
  ) -> Result<Feed> {
    let viewer = self.resolve_identity(credential).await?;
    let posts = self.posts.list_posts(query).await?;

    let mut entries = Vec::with_capacity(posts.len());
    for summary in posts {
      let comments = self.comments.assemble_thread(summary.post.post_id).await?;
      entries.push(FeedEntry { summary, comments });
    }

    Ok(Feed { viewer, entries })
  }
}
