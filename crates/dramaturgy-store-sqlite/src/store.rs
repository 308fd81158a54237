//! [`SqliteStore`]: the SQLite implementation of [`ForumStore`] and
//! [`IdentityProvider`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use dramaturgy_core::{
  forum::{NewQuestion, NewReply, NewUser, Question, Reply, User},
  notification::{NewNotification, Notification, NotificationQuery},
  principal::Principal,
  store::{ForumStore, IdentityProvider},
};

use crate::{
  Result,
  encode::{
    RawNotification, RawUser, decode_principal, encode_dt, encode_notification_kind,
    encode_question_status, encode_role, encode_uuid,
  },
  schema::SCHEMA,
};

/// Number of IDs bound per `UPDATE ... IN (...)` statement. Keeps well under
/// SQLite's host-parameter limit.
const MARK_READ_CHUNK: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

/// The platform's forum and notification tables in a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
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
    Ok(())
  }

  // ── Collaborator writes ─────────────────────────────────────────────────
  //
  // Users, questions, replies and notifications are created by the rest of
  // the platform. These methods exist so that collaborators sharing this
  // database (and tests) can populate it.

  pub async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      id:         Uuid::new_v4(),
      username:   input.username,
      name:       input.name,
      image:      input.image,
      role:       input.role,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(user.id);
    let username = user.username.clone();
    let name     = user.name.clone();
    let image    = user.image.clone();
    let role_str = encode_role(user.role);
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, name, image, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, username, name, image, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    let username = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, username, name, image, role, created_at
             FROM users WHERE username = ?1",
            rusqlite::params![username],
            |row| {
              Ok(RawUser {
                user_id:    row.get(0)?,
                username:   row.get(1)?,
                name:       row.get(2)?,
                image:      row.get(3)?,
                role:       row.get(4)?,
                created_at: row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  pub async fn add_question(&self, input: NewQuestion) -> Result<Question> {
    let question = Question {
      id:         Uuid::new_v4(),
      author_id:  input.author_id,
      title:      input.title,
      body:       input.body,
      status:     input.status,
      is_solved:  input.is_solved,
      created_at: input.created_at,
    };

    let id_str     = encode_uuid(question.id);
    let author_str = encode_uuid(question.author_id);
    let title      = question.title.clone();
    let body       = question.body.clone();
    let status_str = encode_question_status(question.status);
    let is_solved  = question.is_solved;
    let at_str     = encode_dt(question.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions
             (question_id, author_id, title, body, status, is_solved, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, author_str, title, body, status_str, is_solved, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(question)
  }

  pub async fn add_reply(&self, input: NewReply) -> Result<Reply> {
    let reply = Reply {
      id:          Uuid::new_v4(),
      question_id: input.question_id,
      author_id:   input.author_id,
      body:        input.body,
      created_at:  input.created_at,
    };

    let id_str       = encode_uuid(reply.id);
    let question_str = encode_uuid(reply.question_id);
    let author_str   = encode_uuid(reply.author_id);
    let body         = reply.body.clone();
    let at_str       = encode_dt(reply.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO replies (reply_id, question_id, author_id, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, question_str, author_str, body, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(reply)
  }

  /// Raise a notification. It is always stored unread.
  pub async fn add_notification(&self, input: NewNotification) -> Result<Uuid> {
    let id = Uuid::new_v4();

    let id_str       = encode_uuid(id);
    let user_str     = encode_uuid(input.user_id);
    let kind_str     = encode_notification_kind(input.kind);
    let message      = input.message;
    let at_str       = encode_dt(input.created_at);
    let question_str = input.question_id.map(encode_uuid);
    let reply_str    = input.reply_id.map(encode_uuid);
    let actor_str    = input.actor_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, user_id, kind, message, is_read, read_at,
             created_at, question_id, reply_id, actor_id
           ) VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            user_str,
            kind_str,
            message,
            at_str,
            question_str,
            reply_str,
            actor_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(id)
  }

  /// Fetch a single notification regardless of owner.
  pub async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
    let id_str = encode_uuid(id);
    let sql = format!(
      "SELECT {}
       FROM notifications n
       LEFT JOIN questions q ON q.question_id = n.question_id
       LEFT JOIN replies   r ON r.reply_id    = n.reply_id
       LEFT JOIN users     a ON a.user_id     = n.actor_id
       WHERE n.notification_id = ?1",
      RawNotification::COLUMNS
    );

    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params![id_str], RawNotification::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  /// Register a session for `user_id`. Only the token's digest is stored.
  pub async fn create_session(
    &self,
    user_id:    Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let user_str    = encode_uuid(user_id);
    let hash        = token_hash.to_owned();
    let created_str = encode_dt(Utc::now());
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![hash, user_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ForumStore impl ─────────────────────────────────────────────────────────

impl ForumStore for SqliteStore {
  type Error = crate::Error;

  // ── Counting ──────────────────────────────────────────────────────────────

  async fn count_open_questions(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM questions
           WHERE status = 'PUBLISHED' AND is_solved = 0",
          [],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or_default())
  }

  async fn count_replies_to_author_since(
    &self,
    author_id: Uuid,
    since:     DateTime<Utc>,
  ) -> Result<u64> {
    let author_str = encode_uuid(author_id);
    let since_str  = encode_dt(since);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*)
           FROM replies r
           JOIN questions q ON q.question_id = r.question_id
           WHERE q.author_id  = ?1
             AND r.author_id != ?1
             AND r.created_at >= ?2",
          rusqlite::params![author_str, since_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or_default())
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn list_notifications(&self, query: &NotificationQuery) -> Result<Vec<Notification>> {
    let user_str    = encode_uuid(query.user_id);
    let unread_only = query.unread_only;
    let limit       = i64::from(query.limit);
    let sql = format!(
      "SELECT {}
       FROM notifications n
       LEFT JOIN questions q ON q.question_id = n.question_id
       LEFT JOIN replies   r ON r.reply_id    = n.reply_id
       LEFT JOIN users     a ON a.user_id     = n.actor_id
       WHERE n.user_id = ?1
         AND (?2 = 0 OR n.is_read = 0)
       ORDER BY n.created_at DESC, n.notification_id DESC
       LIMIT ?3",
      RawNotification::COLUMNS
    );

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, unread_only, limit],
            RawNotification::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_read(&self, owner: Uuid, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64> {
    if ids.is_empty() {
      return Ok(0);
    }

    let owner_str = encode_uuid(owner);
    let at_str    = encode_dt(at);
    let id_strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let updated: usize = self
      .conn
      .call(move |conn| {
        // Ownership is part of the predicate; all chunks commit together.
        let tx = conn.transaction()?;
        let mut updated = 0;
        for chunk in id_strs.chunks(MARK_READ_CHUNK) {
          let placeholders = (0..chunk.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
          let sql = format!(
            "UPDATE notifications
             SET is_read = 1, read_at = ?1
             WHERE user_id = ?2
               AND is_read = 0
               AND notification_id IN ({placeholders})"
          );
          let params = [&at_str, &owner_str].into_iter().chain(chunk.iter());
          updated += tx.execute(&sql, rusqlite::params_from_iter(params))?;
        }
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    Ok(updated as u64)
  }

  async fn mark_all_read(&self, owner: Uuid, at: DateTime<Utc>) -> Result<u64> {
    let owner_str = encode_uuid(owner);
    let at_str    = encode_dt(at);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications
           SET is_read = 1, read_at = ?1
           WHERE user_id = ?2 AND is_read = 0",
          rusqlite::params![at_str, owner_str],
        )?)
      })
      .await?;

    Ok(updated as u64)
  }
}

// ─── IdentityProvider impl ───────────────────────────────────────────────────

impl IdentityProvider for SqliteStore {
  type Error = crate::Error;

  async fn resolve_session(
    &self,
    token_hash: &str,
    now:        DateTime<Utc>,
  ) -> Result<Option<Principal>> {
    let hash    = token_hash.to_owned();
    let now_str = encode_dt(now);

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT u.user_id, u.role
             FROM sessions s
             JOIN users u ON u.user_id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            rusqlite::params![hash, now_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    row
      .map(|(user_id, role)| decode_principal(&user_id, &role))
      .transpose()
  }
}
