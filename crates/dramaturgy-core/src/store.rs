//! Collaborator traits: the forum/notification store and the identity
//! provider.
//!
//! Implemented by storage backends (e.g. `dramaturgy-store-sqlite`). The
//! aggregator and the HTTP layer depend on these abstractions only.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  notification::{Notification, NotificationQuery},
  principal::Principal,
};

/// Read access to questions and replies, plus read/update access to
/// notifications.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait ForumStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Counting ──────────────────────────────────────────────────────────

  /// Number of questions that are published and not yet solved.
  fn count_open_questions(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Number of replies to questions authored by `author_id`, written by
  /// someone else, with `created_at >= since`.
  fn count_replies_to_author_since(
    &self,
    author_id: Uuid,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Notifications addressed to `query.user_id`, newest first, with their
  /// question/reply/actor projections resolved.
  fn list_notifications<'a>(
    &'a self,
    query: &'a NotificationQuery,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + 'a;

  /// Mark the given notifications read, restricted to those owned by
  /// `owner`. IDs owned by anyone else are ignored. Either every permitted
  /// row is updated or none is.
  ///
  /// Returns the number of rows that transitioned from unread to read.
  fn mark_read<'a>(
    &'a self,
    owner: Uuid,
    ids: &'a [Uuid],
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Mark every unread notification owned by `owner` read.
  fn mark_all_read(
    &self,
    owner: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

/// Resolves session tokens to principals.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up an unexpired session by the SHA-256 hex digest of its token.
  fn resolve_session<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + 'a;
}
