//! The authenticated principal and the role → counting-strategy table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  #[default]
  Regular,
  Expert,
  Moderator,
  Admin,
}

/// The identity making a request, as resolved by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub id:   Uuid,
  pub role: Role,
}

/// What the pending-count badge measures for a given role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingStrategy {
  /// Published, unsolved questions across the whole platform, regardless of
  /// author. This is "work available", not a personal notification count.
  GlobalUnsolvedCount,
  /// Replies by other users to the principal's own questions inside the
  /// rolling reply window.
  PersonalRecentReplyCount,
}

impl CountingStrategy {
  pub fn for_role(role: Role) -> Self {
    match role {
      Role::Expert | Role::Moderator | Role::Admin => Self::GlobalUnsolvedCount,
      Role::Regular => Self::PersonalRecentReplyCount,
    }
  }
}
