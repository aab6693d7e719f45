//! Posts, their category sets, and the [`PostComposer`].
//!
//! A post is created together with its categories in one atomic unit: either
//! the post and every category row exist, or none do.

use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  id::{PostId, UserId},
  reaction::ReactionCounts,
  store::DiscussionStore,
  user::Identity,
};

/// A post and its (non-empty) category set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:    PostId,
  pub author_id:  UserId,
  pub title:      String,
  pub body:       String,
  pub categories: BTreeSet<String>,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
}

/// Validated input to [`DiscussionStore::create_post`].
/// `post_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub author_id:  UserId,
  pub title:      String,
  pub body:       String,
  pub categories: BTreeSet<String>,
}

impl NewPost {
  /// Validate caller-supplied fields.
  ///
  /// Title and body are trimmed. Field checks come first and yield
  /// [`Error::InvalidInput`]; an anonymous `identity` then yields
  /// [`Error::Unauthorized`].
  pub fn validate<I, C>(
    identity: &Identity,
    title: &str,
    body: &str,
    categories: I,
  ) -> Result<Self>
  where
    I: IntoIterator<Item = C>,
    C: AsRef<str>,
  {
    if title.trim().is_empty() {
      return Err(Error::InvalidInput("title must not be empty".into()));
    }
    if body.trim().is_empty() {
      return Err(Error::InvalidInput("body must not be empty".into()));
    }
    let categories = normalize_categories(categories);
    if categories.is_empty() {
      return Err(Error::InvalidInput(
        "at least one category is required".into(),
      ));
    }
    let author_id = identity.require_user()?;

    Ok(Self {
      author_id,
      title: title.trim().to_owned(),
      body: body.trim().to_owned(),
      categories,
    })
  }
}

/// Trim each category, drop blanks, and collapse duplicates.
pub fn normalize_categories<I, C>(categories: I) -> BTreeSet<String>
where
  I: IntoIterator<Item = C>,
  C: AsRef<str>,
{
  categories
    .into_iter()
    .map(|c| c.as_ref().trim().to_owned())
    .filter(|c| !c.is_empty())
    .collect()
}

/// A post with its author's display name and derived reaction counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
  pub post:        Post,
  pub author_name: String,
  #[serde(flatten)]
  pub counts:      ReactionCounts,
}

/// Parameters for [`DiscussionStore::list_posts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
  /// If non-empty, only posts tagged with at least one of these.
  pub categories: BTreeSet<String>,
  /// Restrict to a single author.
  pub author:     Option<UserId>,
}

impl PostQuery {
  pub fn with_categories<I, C>(categories: I) -> Self
  where
    I: IntoIterator<Item = C>,
    C: AsRef<str>,
  {
    Self { categories: normalize_categories(categories), author: None }
  }
}

// ─── Composer ────────────────────────────────────────────────────────────────

pub struct PostComposer<S> {
  store: Arc<S>,
}

impl<S: DiscussionStore> PostComposer<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn create_post<I, C>(
    &self,
    identity: &Identity,
    title: &str,
    body: &str,
    categories: I,
  ) -> Result<Post>
  where
    I: IntoIterator<Item = C>,
    C: AsRef<str>,
  {
    let input = NewPost::validate(identity, title, body, categories)?;
    self.store.create_post(input).await.map_err(Into::into)
  }

  pub async fn get_post(&self, post_id: PostId) -> Result<PostSummary> {
    self
      .store
      .get_post(post_id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or(Error::PostNotFound(post_id))
  }

  /// Posts matching `query`, newest first.
  pub async fn list_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>> {
    self.store.list_posts(query).await.map_err(Into::into)
  }
}
