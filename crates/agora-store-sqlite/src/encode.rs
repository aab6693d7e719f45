//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with nanosecond precision and a
//! `Z` suffix, so they compare correctly as text. UUIDs are stored as
//! hyphenated lowercase strings.

use std::collections::BTreeSet;

use agora_core::{
  comment::{Comment, ThreadRow},
  post::{Post, PostSummary},
  reaction::{Polarity, Reaction, ReactionCounts, Target, TargetKind},
  user::User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Reactions ───────────────────────────────────────────────────────────────

pub fn encode_target_kind(k: TargetKind) -> &'static str {
  match k {
    TargetKind::Post => "post",
    TargetKind::Comment => "comment",
  }
}

pub fn decode_target_kind(s: &str) -> Result<TargetKind> {
  match s {
    "post" => Ok(TargetKind::Post),
    "comment" => Ok(TargetKind::Comment),
    other => Err(Error::Decode(format!("unknown target type: {other:?}"))),
  }
}

pub fn encode_polarity(p: Polarity) -> &'static str {
  match p {
    Polarity::Like => "like",
    Polarity::Dislike => "dislike",
  }
}

pub fn decode_polarity(s: &str) -> Result<Polarity> {
  match s {
    "like" => Ok(Polarity::Like),
    "dislike" => Ok(Polarity::Dislike),
    other => Err(Error::Decode(format!("unknown polarity: {other:?}"))),
  }
}

/// `SUM` over an empty group is NULL and the callers `COALESCE` it to zero,
/// so a negative value can only mean a corrupt row.
pub fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Decode(format!("negative count: {n}")))
}

pub fn decode_counts(likes: i64, dislikes: i64) -> Result<ReactionCounts> {
  Ok(ReactionCounts {
    like_count:    decode_count(likes)?,
    dislike_count: decode_count(dislikes)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:      String,
  pub display_name: String,
  pub created_at:   String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?.into(),
      display_name: self.display_name,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// A `posts` row joined with its author, its categories, and its reaction
/// aggregates.
pub struct RawPost {
  pub post_id:       String,
  pub author_id:     String,
  pub title:         String,
  pub body:          String,
  pub created_at:    String,
  pub author_name:   String,
  pub like_count:    i64,
  pub dislike_count: i64,
  pub categories:    Vec<String>,
}

impl RawPost {
  /// Column order matches [`crate::store::POST_SUMMARY_SELECT`]; categories
  /// are filled in by a second query.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:       row.get(0)?,
      author_id:     row.get(1)?,
      title:         row.get(2)?,
      body:          row.get(3)?,
      created_at:    row.get(4)?,
      author_name:   row.get(5)?,
      like_count:    row.get(6)?,
      dislike_count: row.get(7)?,
      categories:    Vec::new(),
    })
  }

  pub fn into_summary(self) -> Result<PostSummary> {
    let post = Post {
      post_id:    decode_uuid(&self.post_id)?.into(),
      author_id:  decode_uuid(&self.author_id)?.into(),
      title:      self.title,
      body:       self.body,
      categories: self.categories.into_iter().collect::<BTreeSet<_>>(),
      created_at: decode_dt(&self.created_at)?,
    };
    Ok(PostSummary {
      post,
      author_name: self.author_name,
      counts: decode_counts(self.like_count, self.dislike_count)?,
    })
  }
}

/// A `comments` row joined with its author and reaction aggregates.
pub struct RawThreadRow {
  pub comment_id:    String,
  pub post_id:       String,
  pub author_id:     String,
  pub content:       String,
  pub parent_id:     Option<String>,
  pub created_at:    String,
  pub author_name:   String,
  pub like_count:    i64,
  pub dislike_count: i64,
}

impl RawThreadRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:    row.get(0)?,
      post_id:       row.get(1)?,
      author_id:     row.get(2)?,
      content:       row.get(3)?,
      parent_id:     row.get(4)?,
      created_at:    row.get(5)?,
      author_name:   row.get(6)?,
      like_count:    row.get(7)?,
      dislike_count: row.get(8)?,
    })
  }

  pub fn into_thread_row(self) -> Result<ThreadRow> {
    let parent_id = self
      .parent_id
      .as_deref()
      .map(decode_uuid)
      .transpose()?
      .map(Into::into);

    let comment = Comment {
      comment_id: decode_uuid(&self.comment_id)?.into(),
      post_id: decode_uuid(&self.post_id)?.into(),
      author_id: decode_uuid(&self.author_id)?.into(),
      content: self.content,
      parent_id,
      created_at: decode_dt(&self.created_at)?,
    };
    Ok(ThreadRow {
      comment,
      author_name: self.author_name,
      counts: decode_counts(self.like_count, self.dislike_count)?,
    })
  }
}

/// Raw strings read directly from a `reactions` row.
pub struct RawReaction {
  pub reaction_id: String,
  pub user_id:     String,
  pub target_type: String,
  pub target_id:   String,
  pub polarity:    String,
  pub updated_at:  String,
}

impl RawReaction {
  pub fn into_reaction(self) -> Result<Reaction> {
    let kind = decode_target_kind(&self.target_type)?;
    Ok(Reaction {
      reaction_id: decode_uuid(&self.reaction_id)?.into(),
      user_id:     decode_uuid(&self.user_id)?.into(),
      target:      Target::from_parts(kind, decode_uuid(&self.target_id)?),
      polarity:    decode_polarity(&self.polarity)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let late = early + chrono::Duration::nanoseconds(1);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn unknown_polarity_is_a_decode_error() {
    assert!(matches!(decode_polarity("meh"), Err(Error::Decode(_))));
    assert!(matches!(decode_target_kind("user"), Err(Error::Decode(_))));
  }
}
