//! Integration tests for `SqliteStore` against an in-memory database,
//! driven through the [`Discussion`] facade where the behaviour is
//! observable there.

use std::sync::Arc;

use agora_core::{
  Discussion, Error as CoreError,
  comment::CommentNode,
  id::{CommentId, PostId, UserId},
  post::PostQuery,
  reaction::{Polarity, ReactionCounts, ReactionState, Target},
  store::{DiscussionStore, SessionStore},
  user::{Identity, User},
};
use chrono::{Duration, Utc};

use crate::{Error, SqliteStore};

const ALICE: Option<&str> = Some("alice-token");
const BOB: Option<&str> = Some("bob-token");

struct Fixture {
  store:      Arc<SqliteStore>,
  discussion: Arc<Discussion<SqliteStore>>,
  alice:      User,
  bob:        User,
}

async fn fixture() -> Fixture {
  let store = Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  );
  let alice = store.add_user("alice").await.unwrap();
  let bob = store.add_user("bob").await.unwrap();
  store.add_session("alice-token", alice.user_id, None).await.unwrap();
  store.add_session("bob-token", bob.user_id, None).await.unwrap();

  Fixture {
    discussion: Arc::new(Discussion::new(store.clone())),
    store,
    alice,
    bob,
  }
}

fn cats(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| s.to_string()).collect()
}

async fn post_count(store: &SqliteStore) -> usize {
  store.list_posts(&PostQuery::default()).await.unwrap().len()
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_session_resolves_to_its_user() {
  let f = fixture().await;
  let identity = f.discussion.resolve_identity(ALICE).await.unwrap();
  assert_eq!(identity, Identity::User(f.alice.user_id));

  let me = f.discussion.viewer(BOB).await.unwrap();
  assert_eq!(me, f.bob);
}

#[tokio::test]
async fn expired_and_unknown_sessions_are_invalid() {
  let f = fixture().await;
  f.store
    .add_session("old", f.alice.user_id, Some(Utc::now() - Duration::hours(1)))
    .await
    .unwrap();

  for token in ["old", "never-issued"] {
    let err = f.discussion.resolve_identity(Some(token)).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidCredential), "{token}: {err:?}");
  }
}

#[tokio::test]
async fn future_expiry_is_still_live() {
  let f = fixture().await;
  f.store
    .add_session("fresh", f.bob.user_id, Some(Utc::now() + Duration::hours(1)))
    .await
    .unwrap();
  assert_eq!(f.store.session_user("fresh").await.unwrap(), Some(f.bob.user_id));
}

#[tokio::test]
async fn session_for_unknown_user_is_rejected() {
  let f = fixture().await;
  let err = f.store.add_session("t", UserId::new(), None).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidInput(_))), "{err:?}");
}

#[tokio::test]
async fn anonymous_viewer_is_unauthorized() {
  let f = fixture().await;
  let err = f.discussion.viewer(None).await.unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized));
}

// ─── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_post() {
  let f = fixture().await;
  let post = f
    .discussion
    .create_post(ALICE, "Hello", "First post", cats(&["intro", "meta", "intro"]))
    .await
    .unwrap();
  assert_eq!(post.author_id, f.alice.user_id);

  let fetched = f.discussion.post(post.post_id).await.unwrap();
  assert_eq!(fetched.post, post);
  assert_eq!(fetched.author_name, "alice");
  assert_eq!(fetched.counts, ReactionCounts::default());
  assert_eq!(fetched.post.categories.len(), 2);
}

#[tokio::test]
async fn unknown_post_is_not_found() {
  let f = fixture().await;
  let id = PostId::new();
  let err = f.discussion.post(id).await.unwrap_err();
  assert!(matches!(err, CoreError::PostNotFound(p) if p == id));
}

#[tokio::test]
async fn rejected_posts_leave_nothing_behind() {
  let f = fixture().await;

  let err = f
    .discussion
    .create_post(None, "t", "b", cats(&["c"]))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized));

  let err = f
    .discussion
    .create_post(ALICE, "t", "b", cats(&[" "]))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidInput(_)));

  assert_eq!(post_count(&f.store).await, 0);
}

#[tokio::test]
async fn posts_are_listed_newest_first() {
  let f = fixture().await;
  let mut ids = Vec::new();
  for i in 0..5 {
    let post = f
      .discussion
      .create_post(ALICE, &format!("post {i}"), "body", cats(&["c"]))
      .await
      .unwrap();
    ids.push(post.post_id);
  }
  ids.reverse();

  let listed: Vec<_> = f
    .store
    .list_posts(&PostQuery::default())
    .await
    .unwrap()
    .into_iter()
    .map(|s| s.post.post_id)
    .collect();
  assert_eq!(listed, ids);
}

#[tokio::test]
async fn category_filter_matches_any_listed_category() {
  let f = fixture().await;
  let rust = f
    .discussion
    .create_post(ALICE, "a", "b", cats(&["rust"]))
    .await
    .unwrap();
  let go = f
    .discussion
    .create_post(BOB, "a", "b", cats(&["go", "tooling"]))
    .await
    .unwrap();
  f.discussion
    .create_post(BOB, "a", "b", cats(&["cooking"]))
    .await
    .unwrap();

  let found: Vec<_> = f
    .store
    .list_posts(&PostQuery::with_categories(["rust", "tooling"]))
    .await
    .unwrap()
    .into_iter()
    .map(|s| s.post.post_id)
    .collect();
  assert_eq!(found, vec![go.post_id, rust.post_id]);

  let by_bob = PostQuery { author: Some(f.bob.user_id), ..Default::default() };
  assert_eq!(f.store.list_posts(&by_bob).await.unwrap().len(), 2);

  let none = PostQuery::with_categories(["gardening"]);
  assert!(f.store.list_posts(&none).await.unwrap().is_empty());
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_fields_are_stored_trimmed() {
  let f = fixture().await;
  let post = f
    .discussion
    .create_post(ALICE, "  Title ", "\n body text \t", cats(&[" c "]))
    .await
    .unwrap();
  let comment = f
    .discussion
    .submit_comment(BOB, post.post_id, "  nice post  ", None)
    .await
    .unwrap();
  assert_eq!(comment.content, "nice post");

  let fetched = f.discussion.post(post.post_id).await.unwrap();
  assert_eq!(fetched.post.title, "Title");
  assert_eq!(fetched.post.body, "body text");
  let thread = f.discussion.assemble_thread(post.post_id).await.unwrap();
  assert_eq!(thread[0].comment.content, "nice post");
}

#[tokio::test]
async fn comment_on_unknown_post_is_not_found_even_when_anonymous() {
  let f = fixture().await;
  let err = f
    .discussion
    .submit_comment(None, PostId::new(), "hi", None)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::PostNotFound(_)), "{err:?}");
}

#[tokio::test]
async fn anonymous_comment_on_real_post_is_unauthorized() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let err = f
    .discussion
    .submit_comment(None, post.post_id, "hi", None)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized));
  assert!(f.discussion.assemble_thread(post.post_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn reply_must_target_a_comment_on_the_same_post() {
  let f = fixture().await;
  let first = f.discussion.create_post(ALICE, "1", "b", cats(&["c"])).await.unwrap();
  let second = f.discussion.create_post(ALICE, "2", "b", cats(&["c"])).await.unwrap();
  let on_first = f
    .discussion
    .submit_comment(BOB, first.post_id, "top", None)
    .await
    .unwrap();

  let err = f
    .discussion
    .submit_comment(BOB, second.post_id, "reply", Some(on_first.comment_id))
    .await
    .unwrap_err();
  assert!(
    matches!(err, CoreError::ParentMismatch { parent, post }
      if parent == on_first.comment_id && post == second.post_id),
    "{err:?}"
  );

  let missing = CommentId::new();
  let err = f
    .discussion
    .submit_comment(BOB, second.post_id, "reply", Some(missing))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::ParentNotFound(p) if p == missing));

  assert!(f.discussion.assemble_thread(second.post_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn thread_orders_top_level_newest_first_and_replies_oldest_first() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let pid = post.post_id;

  let c1 = f.discussion.submit_comment(ALICE, pid, "c1", None).await.unwrap();
  let c2 = f.discussion.submit_comment(BOB, pid, "c2", None).await.unwrap();
  let r1 = f
    .discussion
    .submit_comment(BOB, pid, "r1", Some(c1.comment_id))
    .await
    .unwrap();
  let r2 = f
    .discussion
    .submit_comment(ALICE, pid, "r2", Some(c1.comment_id))
    .await
    .unwrap();
  let rr = f
    .discussion
    .submit_comment(ALICE, pid, "rr", Some(r1.comment_id))
    .await
    .unwrap();

  let thread = f.discussion.assemble_thread(pid).await.unwrap();
  let top: Vec<_> = thread.iter().map(|n| n.comment.comment_id).collect();
  assert_eq!(top, vec![c2.comment_id, c1.comment_id]);

  let c1_node = &thread[1];
  assert_eq!(c1_node.reply_count, 2);
  assert_eq!(c1_node.author_name, "alice");
  let replies: Vec<_> = c1_node.replies.iter().map(|n| n.comment.comment_id).collect();
  assert_eq!(replies, vec![r1.comment_id, r2.comment_id]);
  assert_eq!(c1_node.replies[0].replies[0].comment.comment_id, rr.comment_id);

  let total: usize = thread.iter().map(CommentNode::subtree_len).sum();
  assert_eq!(total, 5);
}

#[tokio::test]
async fn thread_of_unknown_post_is_not_found() {
  let f = fixture().await;
  let err = f.discussion.assemble_thread(PostId::new()).await.unwrap_err();
  assert!(matches!(err, CoreError::PostNotFound(_)));
}

// ─── Reactions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reaction_toggle_sequence() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let target = Target::Post(post.post_id);

  let steps = [
    (Polarity::Like, ReactionState::Liked, (1, 0)),
    (Polarity::Dislike, ReactionState::Disliked, (0, 1)),
    (Polarity::Dislike, ReactionState::NoReaction, (0, 0)),
    (Polarity::Dislike, ReactionState::Disliked, (0, 1)),
    (Polarity::Like, ReactionState::Liked, (1, 0)),
    (Polarity::Like, ReactionState::NoReaction, (0, 0)),
  ];
  for (polarity, state, (likes, dislikes)) in steps {
    let out = f.discussion.submit_reaction(BOB, target, polarity).await.unwrap();
    assert_eq!(out.state, state, "after {polarity:?}");
    assert_eq!(out.counts, ReactionCounts { like_count: likes, dislike_count: dislikes });
  }
  assert!(f.store.reaction_of(f.bob.user_id, target).await.unwrap().is_none());
}

#[tokio::test]
async fn counts_aggregate_across_users_and_show_on_summaries() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let comment = f
    .discussion
    .submit_comment(ALICE, post.post_id, "hi", None)
    .await
    .unwrap();

  let on_post = Target::Post(post.post_id);
  let on_comment = Target::Comment(comment.comment_id);
  f.discussion.submit_reaction(ALICE, on_post, Polarity::Like).await.unwrap();
  f.discussion.submit_reaction(BOB, on_post, Polarity::Like).await.unwrap();
  f.discussion.submit_reaction(BOB, on_comment, Polarity::Dislike).await.unwrap();

  let summary = f.discussion.post(post.post_id).await.unwrap();
  assert_eq!(summary.counts, ReactionCounts { like_count: 2, dislike_count: 0 });

  let thread = f.discussion.assemble_thread(post.post_id).await.unwrap();
  assert_eq!(thread[0].counts, ReactionCounts { like_count: 0, dislike_count: 1 });

  let status = f.discussion.reaction_status(BOB, on_comment).await.unwrap();
  assert_eq!(status.state, ReactionState::Disliked);
  let status = f.discussion.reaction_status(None, on_comment).await.unwrap();
  assert_eq!(status.state, ReactionState::NoReaction);
  assert_eq!(status.counts.dislike_count, 1);
}

#[tokio::test]
async fn reaction_on_missing_target_is_not_found() {
  let f = fixture().await;
  let target = Target::Comment(CommentId::new());
  let err = f
    .discussion
    .submit_reaction(ALICE, target, Polarity::Like)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::TargetNotFound(t) if t == target));

  let err = f.discussion.reaction_status(None, target).await.unwrap_err();
  assert!(matches!(err, CoreError::TargetNotFound(_)));
}

#[tokio::test]
async fn anonymous_reaction_is_unauthorized_and_not_stored() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let target = Target::Post(post.post_id);
  let err = f
    .discussion
    .submit_reaction(None, target, Polarity::Like)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized));
  assert_eq!(f.store.reaction_counts(target).await.unwrap(), ReactionCounts::default());
}

#[tokio::test]
async fn concurrent_toggles_by_one_user_serialise() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let target = Target::Post(post.post_id);

  // An odd number of identical toggles must end liked with exactly one row.
  let handles: Vec<_> = (0..25)
    .map(|_| {
      let d = f.discussion.clone();
      tokio::spawn(async move { d.submit_reaction(BOB, target, Polarity::Like).await })
    })
    .collect();
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let counts = f.store.reaction_counts(target).await.unwrap();
  assert_eq!(counts, ReactionCounts { like_count: 1, dislike_count: 0 });
  let held = f.store.reaction_of(f.bob.user_id, target).await.unwrap().unwrap();
  assert_eq!(held.polarity, Polarity::Like);
}

#[tokio::test]
async fn concurrent_mixed_toggles_leave_at_most_one_reaction() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let target = Target::Post(post.post_id);

  for _ in 0..20 {
    let handles: Vec<_> = (0..10)
      .map(|i| {
        let d = f.discussion.clone();
        let polarity = if i % 2 == 0 { Polarity::Like } else { Polarity::Dislike };
        tokio::spawn(async move { d.submit_reaction(BOB, target, polarity).await })
      })
      .collect();
    for h in handles {
      h.await.unwrap().unwrap();
    }

    let counts = f.store.reaction_counts(target).await.unwrap();
    assert!(counts.like_count + counts.dislike_count <= 1, "{counts:?}");

    let held = f
      .store
      .reaction_of(f.bob.user_id, target)
      .await
      .unwrap()
      .map(|r| r.polarity);
    let expected = match (counts.like_count, counts.dislike_count) {
      (1, 0) => Some(Polarity::Like),
      (0, 1) => Some(Polarity::Dislike),
      _ => None,
    };
    assert_eq!(held, expected);

    let status = f.discussion.reaction_status(BOB, target).await.unwrap();
    assert_eq!(status.state, ReactionState::from(held));
    assert_eq!(status.counts, counts);
  }
}

#[test]
fn duplicate_reaction_row_is_a_unique_violation() {
  let conn = rusqlite::Connection::open_in_memory().unwrap();
  conn.execute_batch(crate::schema::SCHEMA).unwrap();
  conn
    .execute(
      "INSERT INTO users (user_id, display_name, created_at) VALUES ('u', 'bob', '2024-01-01T00:00:00Z')",
      [],
    )
    .unwrap();

  let insert = |reaction_id: &str, polarity: &str| {
    conn.execute(
      "INSERT INTO reactions (reaction_id, user_id, target_type, target_id, polarity, updated_at)
       VALUES (?1, 'u', 'post', 'p', ?2, '2024-01-01T00:00:00Z')",
      [reaction_id, polarity],
    )
  };
  insert("r1", "like").unwrap();
  let err = insert("r2", "dislike").unwrap_err();
  assert!(crate::store::is_unique_violation(&err), "{err:?}");

  // Other constraint failures are not mistaken for duplicates.
  let err = insert("r3", "sideways").unwrap_err();
  assert!(!crate::store::is_unique_violation(&err), "{err:?}");
}

#[tokio::test]
async fn concurrent_reactions_from_many_users_all_count() {
  let f = fixture().await;
  let post = f.discussion.create_post(ALICE, "t", "b", cats(&["c"])).await.unwrap();
  let target = Target::Post(post.post_id);

  let mut tokens = Vec::new();
  for i in 0..20 {
    let user = f.store.add_user(&format!("user{i}")).await.unwrap();
    let token = format!("token-{i}");
    f.store.add_session(&token, user.user_id, None).await.unwrap();
    tokens.push(token);
  }

  let handles: Vec<_> = tokens
    .into_iter()
    .enumerate()
    .map(|(i, token)| {
      let d = f.discussion.clone();
      let polarity = if i % 4 == 0 { Polarity::Dislike } else { Polarity::Like };
      tokio::spawn(async move { d.submit_reaction(Some(&token), target, polarity).await })
    })
    .collect();
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let counts = f.store.reaction_counts(target).await.unwrap();
  assert_eq!(counts, ReactionCounts { like_count: 15, dislike_count: 5 });
}

#[test]
fn duplicate_reaction_is_retryable_in_core() {
  let target = Target::Post(PostId::new());
  let core: CoreError = Error::DuplicateReaction(target).into();
  assert!(core.is_retryable());
  assert!(!core.is_client_error());

  let core: CoreError = Error::DateParse("bad".into()).into();
  assert!(!core.is_retryable());
}

#[test]
fn domain_errors_pass_through_unchanged() {
  let id = PostId::new();
  let core: CoreError = Error::Core(CoreError::PostNotFound(id)).into();
  assert!(matches!(core, CoreError::PostNotFound(p) if p == id));
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_carries_viewer_and_comment_forests() {
  let f = fixture().await;
  let quiet = f.discussion.create_post(ALICE, "quiet", "b", cats(&["a"])).await.unwrap();
  let busy = f.discussion.create_post(BOB, "busy", "b", cats(&["b"])).await.unwrap();
  let top = f
    .discussion
    .submit_comment(ALICE, busy.post_id, "top", None)
    .await
    .unwrap();
  f.discussion
    .submit_comment(BOB, busy.post_id, "reply", Some(top.comment_id))
    .await
    .unwrap();

  let feed = f
    .discussion
    .assemble_feed(ALICE, &PostQuery::default())
    .await
    .unwrap();
  assert_eq!(feed.viewer, Identity::User(f.alice.user_id));
  assert_eq!(feed.entries.len(), 2);
  assert_eq!(feed.entries[0].summary.post.post_id, busy.post_id);
  assert_eq!(feed.entries[0].comments.len(), 1);
  assert_eq!(feed.entries[0].comments[0].reply_count, 1);
  assert_eq!(feed.entries[1].summary.post.post_id, quiet.post_id);
  assert!(feed.entries[1].comments.is_empty());

  let anon = f.discussion.assemble_feed(None, &PostQuery::default()).await.unwrap();
  assert_eq!(anon.viewer, Identity::Anonymous);

  let err = f
    .discussion
    .assemble_feed(Some("bogus"), &PostQuery::default())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidCredential));
}
