//! Users, questions and replies.
//!
//! These records are owned by the rest of the platform. The notification
//! service only reads them, except for the `New*` inputs used by collaborators
//! (and tests) to populate a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::{Principal, Role};

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:         Uuid,
  pub username:   String,
  pub name:       Option<String>,
  pub image:      Option<String>,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn principal(&self) -> Principal {
    Principal { id: self.id, role: self.role }
  }
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub name:     Option<String>,
  pub image:    Option<String>,
  pub role:     Role,
}

impl NewUser {
  pub fn new(username: impl Into<String>, role: Role) -> Self {
    Self { username: username.into(), name: None, image: None, role }
  }
}

// ─── Questions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
  #[default]
  Draft,
  Published,
  Closed,
  Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id:         Uuid,
  pub author_id:  Uuid,
  pub title:      String,
  pub body:       String,
  pub status:     QuestionStatus,
  pub is_solved:  bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
  pub author_id:  Uuid,
  pub title:      String,
  pub body:       String,
  pub status:     QuestionStatus,
  pub is_solved:  bool,
  pub created_at: DateTime<Utc>,
}

impl NewQuestion {
  /// A published, unsolved question created now.
  pub fn published(author_id: Uuid, title: impl Into<String>) -> Self {
    Self {
      author_id,
      title: title.into(),
      body: String::new(),
      status: QuestionStatus::Published,
      is_solved: false,
      created_at: Utc::now(),
    }
  }
}

// ─── Replies ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
  pub id:          Uuid,
  pub question_id: Uuid,
  pub author_id:   Uuid,
  pub body:        String,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReply {
  pub question_id: Uuid,
  pub author_id:   Uuid,
  pub body:        String,
  /// Stored as given; collaborators normally pass the current time.
  pub created_at:  DateTime<Utc>,
}

impl NewReply {
  pub fn new(question_id: Uuid, author_id: Uuid, body: impl Into<String>) -> Self {
    Self { question_id, author_id, body: body.into(), created_at: Utc::now() }
  }

  pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
    self.created_at = created_at;
    self
  }
}
