//! [`SqliteStore`]: the SQLite implementation of [`DiscussionStore`] and
//! [`SessionStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use agora_core::{
  Error as CoreError,
  comment::{Comment, NewComment, ThreadRow},
  id::{CommentId, PostId, ReactionId, UserId},
  post::{NewPost, Post, PostQuery, PostSummary},
  reaction::{
    Polarity, Reaction, ReactionCounts, ReactionEffect, ReactionOutcome,
    ReactionState, Target, TargetKind,
  },
  store::{DiscussionStore, SessionStore},
  user::User,
};

use crate::{
  Error, Result,
  encode::{
    RawPost, RawReaction, RawThreadRow, RawUser, decode_counts, decode_polarity,
    decode_uuid, encode_dt, encode_polarity, encode_target_kind, encode_uuid,
  },
  schema::SCHEMA,
};

/// Posts joined with author name and post-targeted reaction aggregates.
/// Callers append a `WHERE` / `ORDER BY` tail.
pub(crate) const POST_SUMMARY_SELECT: &str = "
  SELECT p.post_id, p.author_id, p.title, p.body, p.created_at, u.display_name,
         COALESCE(r.like_count, 0), COALESCE(r.dislike_count, 0)
  FROM posts p
  JOIN users u ON u.user_id = p.author_id
  LEFT JOIN (
    SELECT target_id,
           SUM(polarity = 'like')    AS like_count,
           SUM(polarity = 'dislike') AS dislike_count
    FROM reactions
    WHERE target_type = 'post'
    GROUP BY target_id
  ) r ON r.target_id = p.post_id";

/// Every comment on one post with author name and reaction aggregates, in
/// insertion order.
const THREAD_SELECT: &str = "
  SELECT c.comment_id, c.post_id, c.author_id, c.content, c.parent_id,
         c.created_at, u.display_name,
         COALESCE(r.like_count, 0), COALESCE(r.dislike_count, 0)
  FROM comments c
  JOIN users u ON u.user_id = c.author_id
  LEFT JOIN (
    SELECT target_id,
           SUM(polarity = 'like')    AS like_count,
           SUM(polarity = 'dislike') AS dislike_count
    FROM reactions
    WHERE target_type = 'comment'
    GROUP BY target_id
  ) r ON r.target_id = c.comment_id
  WHERE c.post_id = ?1
  ORDER BY c.created_at ASC, c.rowid ASC";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Agora discussion store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are executed one at a time on the connection's background thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  // ── Provisioning ──────────────────────────────────────────────────────────
  //
  // Registration and login live outside this system; these exist so that
  // operators and tests can seed users and sessions.

  pub async fn add_user(&self, display_name: &str) -> Result<User> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
      return Err(
        CoreError::InvalidInput("display name must not be empty".into()).into(),
      );
    }

    let user = User {
      user_id:      UserId::new(),
      display_name: display_name.to_owned(),
      created_at:   Utc::now(),
    };

    let id_str   = encode_uuid(user.user_id.as_uuid());
    let name     = user.display_name.clone();
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, display_name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(user_id = %user.user_id, "user added");
    Ok(user)
  }

  /// Bind `token` to `user_id`. A `None` expiry never lapses.
  pub async fn add_session(
    &self,
    token: &str,
    user_id: UserId,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let token = token.trim().to_owned();
    if token.is_empty() {
      return Err(CoreError::InvalidInput("token must not be empty".into()).into());
    }

    let user_str    = encode_uuid(user_id.as_uuid());
    let now_str     = encode_dt(Utc::now());
    let expires_str = expires_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM users WHERE user_id = ?1", &user_str)? {
          return Ok(Err(CoreError::InvalidInput(format!("unknown user {user_id}"))));
        }
        conn.execute(
          "INSERT INTO sessions (token, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (token) DO UPDATE SET
             user_id = excluded.user_id,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at",
          rusqlite::params![token, user_str, now_str, expires_str],
        )?;
        Ok(Ok(()))
      })
      .await??;
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn row_exists(
  conn: &rusqlite::Connection,
  sql: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

fn target_exists(conn: &rusqlite::Connection, target: Target) -> rusqlite::Result<bool> {
  let sql = match target.kind() {
    TargetKind::Post => "SELECT 1 FROM posts WHERE post_id = ?1",
    TargetKind::Comment => "SELECT 1 FROM comments WHERE comment_id = ?1",
  };
  row_exists(conn, sql, &encode_uuid(target.id()))
}

/// `(likes, dislikes)` for a target, counted from the reaction rows.
fn count_reactions(
  conn: &rusqlite::Connection,
  target: Target,
) -> rusqlite::Result<(i64, i64)> {
  conn.query_row(
    "SELECT COALESCE(SUM(polarity = 'like'), 0),
            COALESCE(SUM(polarity = 'dislike'), 0)
     FROM reactions
     WHERE target_type = ?1 AND target_id = ?2",
    rusqlite::params![encode_target_kind(target.kind()), encode_uuid(target.id())],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )
}

fn load_categories(
  conn: &rusqlite::Connection,
  raw: &mut RawPost,
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(
    "SELECT category FROM post_categories WHERE post_id = ?1 ORDER BY category",
  )?;
  raw.categories = stmt
    .query_map([&raw.post_id], |r| r.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(())
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── DiscussionStore impl ────────────────────────────────────────────────────

impl DiscussionStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let id_str = encode_uuid(id.as_uuid());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, display_name, created_at FROM users WHERE user_id = ?1",
              [&id_str],
              |r| {
                Ok(RawUser {
                  user_id:      r.get(0)?,
                  display_name: r.get(1)?,
                  created_at:   r.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn create_post(&self, input: NewPost) -> Result<Post> {
    if input.categories.is_empty() {
      return Err(
        CoreError::InvalidInput("at least one category is required".into()).into(),
      );
    }

    let post = Post {
      post_id:    PostId::new(),
      author_id:  input.author_id,
      title:      input.title,
      body:       input.body,
      categories: input.categories,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(post.post_id.as_uuid());
    let author_str = encode_uuid(post.author_id.as_uuid());
    let title      = post.title.clone();
    let body       = post.body.clone();
    let categories = post.categories.clone();
    let at_str     = encode_dt(post.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "INSERT INTO posts (post_id, author_id, title, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, author_str, title, body, at_str],
        )?;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO post_categories (post_id, category) VALUES (?1, ?2)",
          )?;
          for category in &categories {
            stmt.execute(rusqlite::params![id_str, category])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(post_id = %post.post_id, author_id = %post.author_id, "post created");
    Ok(post)
  }

  async fn get_post(&self, id: PostId) -> Result<Option<PostSummary>> {
    let id_str = encode_uuid(id.as_uuid());

    let raw = self
      .conn
      .call(move |conn| {
        let sql = format!("{POST_SUMMARY_SELECT} WHERE p.post_id = ?1");
        let Some(mut raw) =
          conn.query_row(&sql, [&id_str], RawPost::from_row).optional()?
        else {
          return Ok(None);
        };
        load_categories(conn, &mut raw)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawPost::into_summary).transpose()
  }

  async fn list_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>> {
    let categories: Vec<String> = query.categories.iter().cloned().collect();
    let author = query.author.map(|a| encode_uuid(a.as_uuid()));

    let raws = self
      .conn
      .call(move |conn| {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if !categories.is_empty() {
          let marks = vec!["?"; categories.len()].join(", ");
          clauses.push(format!(
            "EXISTS (SELECT 1 FROM post_categories pc
                     WHERE pc.post_id = p.post_id AND pc.category IN ({marks}))"
          ));
          args.extend(categories);
        }
        if let Some(author) = author {
          clauses.push("p.author_id = ?".to_owned());
          args.push(author);
        }

        let filter = if clauses.is_empty() {
          String::new()
        } else {
          format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
          "{POST_SUMMARY_SELECT}{filter} ORDER BY p.created_at DESC, p.rowid DESC"
        );

        // One read transaction so the post rows and their categories come
        // from the same snapshot.
        let tx = conn.transaction()?;
        let mut raws = {
          let mut stmt = tx.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params_from_iter(args), RawPost::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        for raw in &mut raws {
          load_categories(&tx, raw)?;
        }
        tx.commit()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawPost::into_summary).collect()
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn create_comment(&self, input: NewComment) -> Result<Comment> {
    let NewComment { post_id, author, content, parent_id } = input;
    let comment_id = CommentId::new();
    let created_at = Utc::now();

    let id_str     = encode_uuid(comment_id.as_uuid());
    let post_str   = encode_uuid(post_id.as_uuid());
    let parent_str = parent_id.map(|p| encode_uuid(p.as_uuid()));
    let at_str     = encode_dt(created_at);
    let body       = content.clone();

    let author_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, "SELECT 1 FROM posts WHERE post_id = ?1", &post_str)? {
          return Ok(Err(CoreError::PostNotFound(post_id)));
        }

        if let (Some(parent), Some(parent_str)) = (parent_id, parent_str.as_deref()) {
          let parent_post: Option<String> = tx
            .query_row(
              "SELECT post_id FROM comments WHERE comment_id = ?1",
              [parent_str],
              |r| r.get(0),
            )
            .optional()?;
          match parent_post {
            None => return Ok(Err(CoreError::ParentNotFound(parent))),
            Some(p) if p != post_str => {
              return Ok(Err(CoreError::ParentMismatch { parent, post: post_id }));
            }
            Some(_) => {}
          }
        }

        let Some(author_id) = author.user_id() else {
          return Ok(Err(CoreError::Unauthorized));
        };

        tx.execute(
          "INSERT INTO comments (
             comment_id, post_id, author_id, content, parent_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            post_str,
            encode_uuid(author_id.as_uuid()),
            body,
            parent_str,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(author_id))
      })
      .await??;

    tracing::debug!(%comment_id, %post_id, parent_id = ?parent_id, "comment created");
    Ok(Comment { comment_id, post_id, author_id, content, parent_id, created_at })
  }

  async fn thread_rows(&self, post_id: PostId) -> Result<Vec<ThreadRow>> {
    let post_str = encode_uuid(post_id.as_uuid());

    let raws = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM posts WHERE post_id = ?1", &post_str)? {
          return Ok(None);
        }
        let mut stmt = conn.prepare(THREAD_SELECT)?;
        let rows = stmt
          .query_map([&post_str], RawThreadRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    let Some(raws) = raws else {
      return Err(CoreError::PostNotFound(post_id).into());
    };
    raws.into_iter().map(RawThreadRow::into_thread_row).collect()
  }

  // ── Reactions ─────────────────────────────────────────────────────────────

  async fn apply_reaction(
    &self,
    user_id: UserId,
    target: Target,
    polarity: Polarity,
  ) -> Result<ReactionOutcome> {
    let reaction_id = encode_uuid(ReactionId::new().as_uuid());
    let user_str    = encode_uuid(user_id.as_uuid());
    let kind_str    = encode_target_kind(target.kind());
    let target_str  = encode_uuid(target.id());
    let now_str     = encode_dt(Utc::now());

    let (state, likes, dislikes) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !target_exists(&tx, target)? {
          return Ok(Err(Error::Core(CoreError::TargetNotFound(target))));
        }

        let existing: Option<String> = tx
          .query_row(
            "SELECT polarity FROM reactions
             WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3",
            rusqlite::params![user_str, kind_str, target_str],
            |r| r.get(0),
          )
          .optional()?;
        let current = match existing.as_deref().map(decode_polarity).transpose() {
          Ok(p) => ReactionState::from(p),
          Err(e) => return Ok(Err(e)),
        };

        let (next, effect) = current.apply(polarity);
        match effect {
          ReactionEffect::Insert(p) => {
            let inserted = tx.execute(
              "INSERT INTO reactions (
                 reaction_id, user_id, target_type, target_id, polarity, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                reaction_id,
                user_str,
                kind_str,
                target_str,
                encode_polarity(p),
                now_str,
              ],
            );
            match inserted {
              Ok(_) => {}
              Err(e) if is_unique_violation(&e) => {
                return Ok(Err(Error::DuplicateReaction(target)));
              }
              Err(e) => return Err(e.into()),
            }
          }
          ReactionEffect::Update(p) => {
            tx.execute(
              "UPDATE reactions SET polarity = ?1, updated_at = ?2
               WHERE user_id = ?3 AND target_type = ?4 AND target_id = ?5",
              rusqlite::params![encode_polarity(p), now_str, user_str, kind_str, target_str],
            )?;
          }
          ReactionEffect::Delete => {
            tx.execute(
              "DELETE FROM reactions
               WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3",
              rusqlite::params![user_str, kind_str, target_str],
            )?;
          }
        }

        let (likes, dislikes) = count_reactions(&tx, target)?;
        tx.commit()?;
        Ok(Ok((next, likes, dislikes)))
      })
      .await??;

    let counts = decode_counts(likes, dislikes)?;
    tracing::debug!(%user_id, %target, ?polarity, ?state, "reaction applied");
    Ok(ReactionOutcome { state, counts })
  }

  async fn reaction_counts(&self, target: Target) -> Result<ReactionCounts> {
    let counted = self
      .conn
      .call(move |conn| {
        if !target_exists(conn, target)? {
          return Ok(None);
        }
        Ok(Some(count_reactions(conn, target)?))
      })
      .await?;

    let Some((likes, dislikes)) = counted else {
      return Err(CoreError::TargetNotFound(target).into());
    };
    decode_counts(likes, dislikes)
  }

  async fn reaction_of(&self, user_id: UserId, target: Target) -> Result<Option<Reaction>> {
    let user_str   = encode_uuid(user_id.as_uuid());
    let kind_str   = encode_target_kind(target.kind());
    let target_str = encode_uuid(target.id());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT reaction_id, user_id, target_type, target_id, polarity, updated_at
               FROM reactions
               WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3",
              rusqlite::params![user_str, kind_str, target_str],
              |r| {
                Ok(RawReaction {
                  reaction_id: r.get(0)?,
                  user_id:     r.get(1)?,
                  target_type: r.get(2)?,
                  target_id:   r.get(3)?,
                  polarity:    r.get(4)?,
                  updated_at:  r.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReaction::into_reaction).transpose()
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn session_user(&self, token: &str) -> Result<Option<UserId>> {
    let token   = token.to_owned();
    let now_str = encode_dt(Utc::now());

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM sessions
               WHERE token = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
              rusqlite::params![token, now_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|s| decode_uuid(&s).map(UserId::from))
      .transpose()
  }
}
