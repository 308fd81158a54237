//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that lexicographic comparison in SQL matches
//! chronological order. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use dramaturgy_core::{
  forum::{QuestionStatus, User},
  notification::{ActorRef, Notification, NotificationKind, QuestionRef, ReplyRef},
  principal::{Principal, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

fn unknown(column: &'static str, value: &str) -> Error {
  Error::UnknownVariant { column, value: value.to_owned() }
}

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Regular => "REGULAR",
    Role::Expert => "EXPERT",
    Role::Moderator => "MODERATOR",
    Role::Admin => "ADMIN",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "REGULAR" => Ok(Role::Regular),
    "EXPERT" => Ok(Role::Expert),
    "MODERATOR" => Ok(Role::Moderator),
    "ADMIN" => Ok(Role::Admin),
    other => Err(unknown("role", other)),
  }
}

pub fn encode_question_status(s: QuestionStatus) -> &'static str {
  match s {
    QuestionStatus::Draft => "DRAFT",
    QuestionStatus::Published => "PUBLISHED",
    QuestionStatus::Closed => "CLOSED",
    QuestionStatus::Archived => "ARCHIVED",
  }
}

pub fn encode_notification_kind(k: NotificationKind) -> &'static str {
  match k {
    NotificationKind::Reply => "REPLY",
    NotificationKind::Mention => "MENTION",
    NotificationKind::FlagResolved => "FLAG_RESOLVED",
    NotificationKind::QuestionSolved => "QUESTION_SOLVED",
    NotificationKind::System => "SYSTEM",
  }
}

pub fn decode_notification_kind(s: &str) -> Result<NotificationKind> {
  match s {
    "REPLY" => Ok(NotificationKind::Reply),
    "MENTION" => Ok(NotificationKind::Mention),
    "FLAG_RESOLVED" => Ok(NotificationKind::FlagResolved),
    "QUESTION_SOLVED" => Ok(NotificationKind::QuestionSolved),
    "SYSTEM" => Ok(NotificationKind::System),
    other => Err(unknown("notification kind", other)),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `notifications` row joined with its projections.
pub struct RawNotification {
  pub notification_id: String,
  pub user_id:         String,
  pub kind:            String,
  pub message:         String,
  pub is_read:         bool,
  pub read_at:         Option<String>,
  pub created_at:      String,
  // questions join
  pub question_id:     Option<String>,
  pub question_title:  Option<String>,
  // replies join
  pub reply_id:        Option<String>,
  pub reply_body:      Option<String>,
  // users join (actor)
  pub actor_id:        Option<String>,
  pub actor_name:      Option<String>,
  pub actor_username:  Option<String>,
  pub actor_image:     Option<String>,
}

impl RawNotification {
  pub const COLUMNS: &'static str = "
    n.notification_id, n.user_id, n.kind, n.message, n.is_read, n.read_at,
    n.created_at,
    q.question_id, q.title,
    r.reply_id, r.body,
    a.user_id, a.name, a.username, a.image";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      user_id:         row.get(1)?,
      kind:            row.get(2)?,
      message:         row.get(3)?,
      is_read:         row.get(4)?,
      read_at:         row.get(5)?,
      created_at:      row.get(6)?,
      question_id:     row.get(7)?,
      question_title:  row.get(8)?,
      reply_id:        row.get(9)?,
      reply_body:      row.get(10)?,
      actor_id:        row.get(11)?,
      actor_name:      row.get(12)?,
      actor_username:  row.get(13)?,
      actor_image:     row.get(14)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    let question = match (self.question_id, self.question_title) {
      (Some(id), Some(title)) => Some(QuestionRef { id: decode_uuid(&id)?, title }),
      _ => None,
    };
    let reply = match (self.reply_id, self.reply_body) {
      (Some(id), Some(body)) => Some(ReplyRef { id: decode_uuid(&id)?, body }),
      _ => None,
    };
    let actor = match (self.actor_id, self.actor_username) {
      (Some(id), Some(username)) => Some(ActorRef {
        id: decode_uuid(&id)?,
        name: self.actor_name,
        username,
        image: self.actor_image,
      }),
      _ => None,
    };

    Ok(Notification {
      id: decode_uuid(&self.notification_id)?,
      user_id: decode_uuid(&self.user_id)?,
      kind: decode_notification_kind(&self.kind)?,
      message: self.message,
      read: self.is_read,
      read_at: self.read_at.as_deref().map(decode_dt).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      question,
      reply,
      actor,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub name:       Option<String>,
  pub image:      Option<String>,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         decode_uuid(&self.user_id)?,
      username:   self.username,
      name:       self.name,
      image:      self.image,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// `(user_id, role)` as read from a session lookup.
pub fn decode_principal(user_id: &str, role: &str) -> Result<Principal> {
  Ok(Principal { id: decode_uuid(user_id)?, role: decode_role(role)? })
}
