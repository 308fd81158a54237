//! Notification events and the projections attached to them in the feed.
//!
//! Events are created by other parts of the platform and start unread. The
//! only mutation this service performs is the `Unread → Read` transition,
//! scoped to the recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a notification was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
  Reply,
  Mention,
  FlagResolved,
  QuestionSolved,
  System,
}

// ─── Projections ─────────────────────────────────────────────────────────────

/// Minimal view of the question a notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRef {
  pub id:    Uuid,
  pub title: String,
}

/// Minimal view of the reply a notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
  pub id:   Uuid,
  pub body: String,
}

/// Public profile of the user whose action raised the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
  pub id:       Uuid,
  pub name:     Option<String>,
  pub username: String,
  pub image:    Option<String>,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A notification as returned in a user's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id:         Uuid,
  /// Recipient.
  pub user_id:    Uuid,
  pub kind:       NotificationKind,
  pub message:    String,
  pub read:       bool,
  /// Set once, at the `Unread → Read` transition.
  pub read_at:    Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub question:   Option<QuestionRef>,
  pub reply:      Option<ReplyRef>,
  pub actor:      Option<ActorRef>,
}

/// Input used by collaborators to raise a notification. Always stored unread.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id:     Uuid,
  pub kind:        NotificationKind,
  pub message:     String,
  pub question_id: Option<Uuid>,
  pub reply_id:    Option<Uuid>,
  pub actor_id:    Option<Uuid>,
  pub created_at:  DateTime<Utc>,
}

impl NewNotification {
  pub fn new(user_id: Uuid, kind: NotificationKind, message: impl Into<String>) -> Self {
    Self {
      user_id,
      kind,
      message: message.into(),
      question_id: None,
      reply_id: None,
      actor_id: None,
      created_at: Utc::now(),
    }
  }
}

/// Storage-level query for a user's feed. Built by the aggregator from
/// validated [`ListParams`](crate::params::ListParams).
#[derive(Debug, Clone)]
pub struct NotificationQuery {
  pub user_id:     Uuid,
  pub unread_only: bool,
  pub limit:       u32,
}
