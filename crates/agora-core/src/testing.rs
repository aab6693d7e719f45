//! A store that fails the test if it is ever reached.

use std::convert::Infallible;

use crate::{
  comment::{Comment, NewComment, ThreadRow},
  id::{PostId, UserId},
  post::{NewPost, Post, PostQuery, PostSummary},
  reaction::{Polarity, Reaction, ReactionCounts, ReactionOutcome, Target},
  store::DiscussionStore,
  user::User,
};

pub struct NoopStore;

impl DiscussionStore for NoopStore {
  type Error = Infallible;
  async fn get_user(&self, _: UserId) -> Result<Option<User>, Infallible> { unimplemented!() }
  async fn create_post(&self, _: NewPost) -> Result<Post, Infallible> { unimplemented!() }
  async fn get_post(&self, _: PostId) -> Result<Option<PostSummary>, Infallible> { unimplemented!() }
  async fn list_posts(&self, _: &PostQuery) -> Result<Vec<PostSummary>, Infallible> { unimplemented!() }
  async fn create_comment(&self, _: NewComment) -> Result<Comment, Infallible> { unimplemented!() }
  async fn thread_rows(&self, _: PostId) -> Result<Vec<ThreadRow>, Infallible> { unimplemented!() }
  async fn apply_reaction(&self, _: UserId, _: Target, _: Polarity) -> Result<ReactionOutcome, Infallible> { unimplemented!() }
  async fn reaction_counts(&self, _: Target) -> Result<ReactionCounts, Infallible> { unimplemented!() }
  async fn reaction_of(&self, _: UserId, _: Target) -> Result<Option<Reaction>, Infallible> { unimplemented!() }
}
