//! Typed request parameters and the aggregator's configuration.
//!
//! Raw query strings and JSON bodies are turned into these types before any
//! store access, so a malformed request never reaches the database.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for the notification endpoints, deserialised from the
/// `[notifications]` table of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  /// Feed length when `limit` is absent or not an integer.
  pub default_limit:     u32,
  /// Upper bound on `limit`; larger requests are clamped.
  pub max_limit:         u32,
  /// Rolling window for the personal reply count, in days.
  pub reply_window_days: u32,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self { default_limit: 10, max_limit: 100, reply_window_days: 7 }
  }
}

impl NotificationConfig {
  /// `None` when the configured window does not fit a [`Duration`].
  pub fn reply_window(&self) -> Option<Duration> {
    Duration::try_days(i64::from(self.reply_window_days))
  }

  /// Start of the reply window ending at `now`. A window reaching past the
  /// representable range starts at [`DateTime::<Utc>::MIN_UTC`].
  pub fn reply_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    self
      .reply_window()
      .and_then(|window| now.checked_sub_signed(window))
      .unwrap_or(DateTime::<Utc>::MIN_UTC)
  }
}

// ─── Feed parameters ─────────────────────────────────────────────────────────

/// A validated feed length: always in `1..=max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationLimit(u32);

impl NotificationLimit {
  /// Interpret the raw `limit` query value.
  ///
  /// - absent or not an integer → `config.default_limit`
  /// - zero or negative → [`Error::InvalidInput`]
  /// - above `config.max_limit` → clamped to `config.max_limit`
  pub fn parse(raw: Option<&str>, config: &NotificationConfig) -> Result<Self> {
    let Some(n) = raw.and_then(|s| s.trim().parse::<i64>().ok()) else {
      return Ok(Self(config.default_limit.clamp(1, config.max_limit.max(1))));
    };
    if n < 1 {
      return Err(Error::InvalidInput(format!(
        "limit must be a positive integer, got {n}"
      )));
    }
    let capped = n.min(i64::from(config.max_limit.max(1)));
    Ok(Self(u32::try_from(capped).unwrap_or(config.max_limit)))
  }

  pub fn get(self) -> u32 { self.0 }
}

/// Validated parameters for the notification feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
  pub limit:       NotificationLimit,
  pub unread_only: bool,
}

impl ListParams {
  /// `unread_only` is set only when the raw value is exactly `"true"`.
  pub fn from_raw(
    limit: Option<&str>,
    unread_only: Option<&str>,
    config: &NotificationConfig,
  ) -> Result<Self> {
    Ok(Self {
      limit:       NotificationLimit::parse(limit, config)?,
      unread_only: unread_only == Some("true"),
    })
  }
}

// ─── Mark-read body ──────────────────────────────────────────────────────────

/// A validated mark-read request: a deduplicated, non-empty-on-input set of
/// notification IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkReadRequest {
  ids: Vec<Uuid>,
}

impl MarkReadRequest {
  /// Validate a `{"notificationIds": [...]}` body.
  ///
  /// The field must be a non-empty array of strings. Strings that are not
  /// UUIDs cannot name any notification and are dropped, exactly like IDs
  /// that belong to another user.
  pub fn from_json(body: &Value) -> Result<Self> {
    let items = body
      .get("notificationIds")
      .ok_or_else(|| Error::InvalidInput("notificationIds is required".into()))?
      .as_array()
      .ok_or_else(|| Error::InvalidInput("notificationIds must be an array".into()))?;

    if items.is_empty() {
      return Err(Error::InvalidInput("notificationIds must not be empty".into()));
    }

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
      let s = item.as_str().ok_or_else(|| {
        Error::InvalidInput("notificationIds must contain only strings".into())
      })?;
      if let Ok(id) = Uuid::parse_str(s) {
        ids.push(id);
      }
    }
    ids.sort_unstable();
    ids.dedup();

    Ok(Self { ids })
  }

  pub fn ids(&self) -> &[Uuid] { &self.ids }
}
