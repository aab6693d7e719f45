//! Comments and the [`CommentTree`].
//!
//! Comments form a forest per post: top-level comments have no parent, and a
//! reply's parent always belongs to the same post. Comments are append-only
//! and a parent must already exist when a reply is written, so the forest
//! cannot contain cycles.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  id::{CommentId, PostId, UserId},
  reaction::ReactionCounts,
  store::DiscussionStore,
  user::Identity,
};

/// An immutable comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: CommentId,
  pub post_id:    PostId,
  pub author_id:  UserId,
  pub content:    String,
  pub parent_id:  Option<CommentId>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`DiscussionStore::create_comment`].
///
/// Carries the caller's [`Identity`] rather than a resolved user id: the
/// store checks post and parent existence before rejecting anonymous
/// callers, inside the same transaction as the insert.
#[derive(Debug, Clone)]
pub struct NewComment {
  pub post_id:   PostId,
  pub author:    Identity,
  pub content:   String,
  pub parent_id: Option<CommentId>,
}

/// One comment as read back for thread assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
  pub comment:     Comment,
  pub author_name: String,
  pub counts:      ReactionCounts,
}

/// A comment with its aggregates and its direct replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
  #[serde(flatten)]
  pub comment:     Comment,
  pub author_name: String,
  /// Number of direct replies.
  pub reply_count: usize,
  #[serde(flatten)]
  pub counts:      ReactionCounts,
  /// Direct replies, oldest first.
  pub replies:     Vec<CommentNode>,
}

impl CommentNode {
  fn new(row: ThreadRow, replies: Vec<CommentNode>) -> Self {
    Self {
      comment: row.comment,
      author_name: row.author_name,
      reply_count: replies.len(),
      counts: row.counts,
      replies,
    }
  }

  /// Total number of nodes in this subtree, including `self`.
  pub fn subtree_len(&self) -> usize {
    let mut total = 0;
    let mut pending = vec![self];
    while let Some(node) = pending.pop() {
      total += 1;
      pending.extend(node.replies.iter());
    }
    total
  }
}

/// Build the comment forest for one post from its flat rows.
///
/// Top-level comments come back newest first; replies at every depth are
/// oldest first. Rows with equal `created_at` keep their input order, so
/// callers should supply rows in insertion order.
///
/// Uses an explicit work list instead of recursion so thread depth does not
/// bound stack usage. A row whose parent is absent from `rows` is treated as
/// top-level; rows that are unreachable from any top-level row are dropped.
pub fn assemble_thread(mut rows: Vec<ThreadRow>) -> Vec<CommentNode> {
  rows.sort_by_key(|r| r.comment.created_at);

  let position: HashMap<CommentId, usize> = rows
    .iter()
    .enumerate()
    .map(|(i, r)| (r.comment.comment_id, i))
    .collect();

  let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
  let mut roots = Vec::new();
  for (i, row) in rows.iter().enumerate() {
    match row.comment.parent_id.and_then(|p| position.get(&p)) {
      Some(&parent) if parent != i => children[parent].push(i),
      _ => roots.push(i),
    }
  }

  let mut pending: Vec<Option<ThreadRow>> = rows.into_iter().map(Some).collect();
  let mut built: Vec<Option<CommentNode>> = Vec::with_capacity(pending.len());
  built.resize_with(pending.len(), || None);

  // Post-order walk: a node is built once all of its children are.
  let mut work: Vec<(usize, bool)> = roots.iter().map(|&i| (i, false)).collect();
  while let Some((i, children_built)) = work.pop() {
    if children_built {
      let Some(row) = pending[i].take() else { continue };
      let replies = children[i]
        .iter()
        .filter_map(|&c| built[c].take())
        .collect();
      built[i] = Some(CommentNode::new(row, replies));
    } else {
      work.push((i, true));
      work.extend(children[i].iter().map(|&c| (c, false)));
    }
  }

  roots.iter().rev().filter_map(|&i| built[i].take()).collect()
}

// ─── Tree ────────────────────────────────────────────────────────────────────

pub struct CommentTree<S> {
  store: Arc<S>,
}

impl<S: DiscussionStore> CommentTree<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Create a comment, or a reply when `parent_id` is given. Surrounding
  /// whitespace is stripped from `content` before it is stored.
  ///
  /// Checks, in order: non-empty content ([`Error::InvalidInput`]), post
  /// exists ([`Error::PostNotFound`]), parent exists and belongs to the post
  /// ([`Error::ParentNotFound`] / [`Error::ParentMismatch`]), caller is not
  /// anonymous ([`Error::Unauthorized`]). Everything after the content check
  /// runs in one transaction with the insert.
  pub async fn create_comment(
    &self,
    identity: &Identity,
    post_id: PostId,
    content: &str,
    parent_id: Option<CommentId>,
  ) -> Result<Comment> {
    let content = content.trim();
    if content.is_empty() {
      return Err(Error::InvalidInput("comment content must not be empty".into()));
    }
    let input = NewComment {
      post_id,
      author: *identity,
      content: content.to_owned(),
      parent_id,
    };
    self.store.create_comment(input).await.map_err(Into::into)
  }

  /// The full comment forest for `post_id`.
  pub async fn assemble_thread(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
    let rows = self.store.thread_rows(post_id).await.map_err(Into::<Error>::into)?;
    Ok(assemble_thread(rows))
  }
}
