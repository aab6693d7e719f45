//! Users and the resolved identity of a caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, id::UserId};

/// A registered user. Registration and credentials live outside this crate;
/// only the stable id and display name are needed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:      UserId,
  pub display_name: String,
  pub created_at:   DateTime<Utc>,
}

/// Who is making a request, as reported by the
/// [`IdentityResolver`](crate::identity::IdentityResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
  Anonymous,
  User(UserId),
}

impl Identity {
  pub fn user_id(&self) -> Option<UserId> {
    match self {
      Self::User(id) => Some(*id),
      Self::Anonymous => None,
    }
  }

  /// The user id, or [`Error::Unauthorized`] for anonymous callers.
  pub fn require_user(&self) -> Result<UserId> {
    self.user_id().ok_or(Error::Unauthorized)
  }
}
