//! JSON REST API for The Dramaturgy notification service.
//!
//! Exposes an axum [`Router`] backed by any store implementing
//! [`ForumStore`] and [`IdentityProvider`]. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", dramaturgy_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod notifications;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use dramaturgy_core::{
  Aggregator,
  params::NotificationConfig,
  store::{ForumStore, IdentityProvider},
};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  /// Used directly only for session resolution.
  pub store:      Arc<S>,
  pub aggregator: Arc<Aggregator<S>>,
}

impl<S: ForumStore> AppState<S> {
  pub fn new(store: Arc<S>, config: NotificationConfig) -> Self {
    let aggregator = Arc::new(Aggregator::new(store.clone(), config));
    Self { store, aggregator }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), aggregator: self.aggregator.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the notification API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ForumStore + IdentityProvider + 'static,
{
  Router::new()
    .route("/notifications", get(notifications::list::<S>))
    .route("/notifications/count", get(notifications::count::<S>))
    .route("/notifications/mark-read", post(notifications::mark_read::<S>))
    .route("/notifications/mark-all-read", post(notifications::mark_all_read::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{Duration, Utc};
  use dramaturgy_core::{
    forum::{NewQuestion, NewReply, NewUser, QuestionStatus, User},
    notification::{NewNotification, Notification, NotificationKind, NotificationQuery},
    principal::{Principal, Role},
  };
  use dramaturgy_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use crate::auth::{generate_token, hash_token};

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState::new(Arc::new(store), NotificationConfig::default())
  }

  /// Create a user with a live session and return it with its bearer token.
  async fn login(state: &AppState<SqliteStore>, username: &str, role: Role) -> (User, String) {
    let user = state.store.add_user(NewUser::new(username, role)).await.unwrap();
    let token = generate_token();
    state
      .store
      .create_session(user.id, &hash_token(&token), Utc::now() + Duration::hours(1))
      .await
      .unwrap();
    (user, token)
  }

  async fn send(
    state:  &AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<&str>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    if body.is_some() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder
      .body(Body::from(body.unwrap_or_default().to_string()))
      .unwrap();
    let resp = api_router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
  }

  async fn notify(state: &AppState<SqliteStore>, user: &User, message: &str) -> Uuid {
    state
      .store
      .add_notification(NewNotification::new(user.id, NotificationKind::Reply, message))
      .await
      .unwrap()
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn every_endpoint_requires_a_session() {
    let state = make_state().await;
    for (method, uri, body) in [
      ("GET", "/notifications/count", None),
      ("GET", "/notifications", None),
      ("POST", "/notifications/mark-read", Some(r#"{"notificationIds":["x"]}"#)),
      ("POST", "/notifications/mark-all-read", None),
    ] {
      let (status, json) = send(&state, method, uri, None, body).await;
      assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
      assert_eq!(json["error"], "unauthorized");

      let (status, _) = send(&state, method, uri, Some("not-a-session"), body).await;
      assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} with bad token");
    }
  }

  #[tokio::test]
  async fn session_cookie_is_accepted() {
    let state = make_state().await;
    let (_, token) = login(&state, "p", Role::Regular).await;
    let req = Request::builder()
      .uri("/notifications/count")
      .header(header::COOKIE, format!("dramaturgy_session={token}"))
      .body(Body::empty())
      .unwrap();
    let resp = api_router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Count ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn regular_count_is_recent_replies_from_others() {
    let state = make_state().await;
    let (p, token) = login(&state, "p", Role::Regular).await;
    let b = state.store.add_user(NewUser::new("b", Role::Regular)).await.unwrap();
    let c = state.store.add_user(NewUser::new("c", Role::Regular)).await.unwrap();
    let q = state
      .store
      .add_question(NewQuestion::published(p.id, "Q"))
      .await
      .unwrap();

    let now = Utc::now();
    for reply in [
      NewReply::new(q.id, b.id, "yesterday").at(now - Duration::days(1)),
      NewReply::new(q.id, c.id, "ten days ago").at(now - Duration::days(10)),
      NewReply::new(q.id, p.id, "self").at(now),
    ] {
      state.store.add_reply(reply).await.unwrap();
    }

    let (status, json) = send(&state, "GET", "/notifications/count", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "count": 1 }));
  }

  #[tokio::test]
  async fn expert_count_is_global_open_questions() {
    let state = make_state().await;
    let (_, token) = login(&state, "expert", Role::Expert).await;
    let author = state.store.add_user(NewUser::new("a", Role::Regular)).await.unwrap();

    state.store.add_question(NewQuestion::published(author.id, "open")).await.unwrap();
    state.store.add_question(NewQuestion::published(author.id, "open too")).await.unwrap();
    let mut draft = NewQuestion::published(author.id, "draft");
    draft.status = QuestionStatus::Draft;
    state.store.add_question(draft).await.unwrap();

    let (status, json) = send(&state, "GET", "/notifications/count", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
  }

  // ── List ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_honours_limit_and_unread_only() {
    let state = make_state().await;
    let (p, token) = login(&state, "p", Role::Regular).await;
    let (other, _) = login(&state, "other", Role::Regular).await;

    let mut ids = Vec::new();
    for i in 0..8 {
      let mut n = NewNotification::new(p.id, NotificationKind::Reply, format!("n{i}"));
      n.created_at = Utc::now() - Duration::minutes(i);
      ids.push(state.store.add_notification(n).await.unwrap());
    }
    notify(&state, &other, "foreign").await;
    state.store.mark_read(p.id, &ids[..2], Utc::now()).await.unwrap();

    let (status, json) = send(
      &state,
      "GET",
      "/notifications?limit=5&unreadOnly=true",
      Some(&token),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let items = json["notifications"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    let messages: Vec<_> = items.iter().map(|n| n["message"].as_str().unwrap()).collect();
    assert_eq!(messages, ["n2", "n3", "n4", "n5", "n6"]);
    for n in items {
      assert_eq!(n["read"], false);
      assert_eq!(n["userId"], p.id.to_string());
    }
  }

  #[tokio::test]
  async fn list_limit_defaults_and_caps() {
    let state = make_state().await;
    let (p, token) = login(&state, "p", Role::Regular).await;
    for i in 0..12 {
      notify(&state, &p, &format!("n{i}")).await;
    }

    for (uri, expected) in [
      ("/notifications", 10),
      ("/notifications?limit=abc", 10),
      ("/notifications?limit=5abc", 10),
      ("/notifications?limit=1&limit=2", 1),
      ("/notifications?limit=2&unreadOnly=true&limit=abc", 2),
      ("/notifications?limit=3", 3),
      ("/notifications?limit=1000", 12),
      ("/notifications?unreadOnly=TRUE", 10),
    ] {
      let (status, json) = send(&state, "GET", uri, Some(&token), None).await;
      assert_eq!(status, StatusCode::OK, "{uri}");
      assert_eq!(json["notifications"].as_array().unwrap().len(), expected, "{uri}");
    }

    let (status, json) = send(&state, "GET", "/notifications?limit=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("limit"));
  }

  // ── Mark read ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn mark_read_only_touches_own_notifications() {
    let state = make_state().await;
    let (p, token) = login(&state, "p", Role::Regular).await;
    let (other, _) = login(&state, "other", Role::Regular).await;
    let mine = notify(&state, &p, "mine").await;
    let theirs = notify(&state, &other, "theirs").await;

    let body = json!({ "notificationIds": [mine, theirs] }).to_string();
    for _ in 0..2 {
      let (status, json) =
        send(&state, "POST", "/notifications/mark-read", Some(&token), Some(&body)).await;
      assert_eq!(status, StatusCode::OK);
      assert_eq!(json, json!({ "success": true }));
    }

    assert!(state.store.get_notification(mine).await.unwrap().unwrap().read);
    assert!(!state.store.get_notification(theirs).await.unwrap().unwrap().read);
  }

  #[tokio::test]
  async fn mark_read_rejects_malformed_bodies() {
    let state = make_state().await;
    let (p, token) = login(&state, "p", Role::Regular).await;
    let mine = notify(&state, &p, "mine").await;

    for body in [
      r#"{"notificationIds":[]}"#,
      r#"{"notificationIds":"all"}"#,
      r#"{}"#,
      r#"not json"#,
    ] {
      let (status, json) =
        send(&state, "POST", "/notifications/mark-read", Some(&token), Some(body)).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
      assert!(json["error"].is_string(), "{body}");
    }

    assert!(!state.store.get_notification(mine).await.unwrap().unwrap().read);
  }

  #[tokio::test]
  async fn mark_all_read_clears_own_feed() {
    let state = make_state().await;
    let (p, token) = login(&state, "p", Role::Regular).await;
    let (other, _) = login(&state, "other", Role::Regular).await;
    notify(&state, &p, "a").await;
    notify(&state, &p, "b").await;
    let theirs = notify(&state, &other, "c").await;

    let (status, _) =
      send(&state, "POST", "/notifications/mark-all-read", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) =
      send(&state, "GET", "/notifications?unreadOnly=true", Some(&token), None).await;
    assert!(json["notifications"].as_array().unwrap().is_empty());
    assert!(!state.store.get_notification(theirs).await.unwrap().unwrap().read);
  }

  // ── Storage failures ────────────────────────────────────────────────────────

  // Resolves every session to an admin, then fails every store call.
  struct FailingStore;

  fn outage() -> std::io::Error {
    std::io::Error::other("database is locked: /var/lib/dramaturgy/forum.db")
  }

  impl ForumStore for FailingStore {
    type Error = std::io::Error;

    async fn count_open_questions(&self) -> Result<u64, Self::Error> {
      Err(outage())
    }

    async fn count_replies_to_author_since(
      &self,
      _author_id: Uuid,
      _since: chrono::DateTime<Utc>,
    ) -> Result<u64, Self::Error> {
      Err(outage())
    }

    async fn list_notifications(
      &self,
      _query: &NotificationQuery,
    ) -> Result<Vec<Notification>, Self::Error> {
      Err(outage())
    }

    async fn mark_read(
      &self,
      _owner: Uuid,
      _ids: &[Uuid],
      _at: chrono::DateTime<Utc>,
    ) -> Result<u64, Self::Error> {
      Err(outage())
    }

    async fn mark_all_read(
      &self,
      _owner: Uuid,
      _at: chrono::DateTime<Utc>,
    ) -> Result<u64, Self::Error> {
      Err(outage())
    }
  }

  impl IdentityProvider for FailingStore {
    type Error = std::io::Error;

    async fn resolve_session(
      &self,
      _token_hash: &str,
      _now: chrono::DateTime<Utc>,
    ) -> Result<Option<Principal>, Self::Error> {
      Ok(Some(Principal { id: Uuid::new_v4(), role: Role::Admin }))
    }
  }

  #[tokio::test]
  async fn storage_failure_is_an_opaque_500() {
    let state = AppState::new(Arc::new(FailingStore), NotificationConfig::default());
    let id = Uuid::new_v4().to_string();
    let mark_read = json!({ "notificationIds": [id] }).to_string();

    for (method, uri, body) in [
      ("GET", "/notifications/count", None),
      ("GET", "/notifications", None),
      ("POST", "/notifications/mark-read", Some(mark_read.as_str())),
      ("POST", "/notifications/mark-all-read", None),
    ] {
      let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer anything");
      if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
      }
      let req = builder.body(Body::from(body.unwrap_or_default().to_string())).unwrap();
      let resp = api_router(state.clone()).oneshot(req).await.unwrap();
      assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");

      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
      let json: Value = serde_json::from_slice(&bytes).unwrap();
      assert_eq!(json, json!({ "error": "internal server error" }), "{method} {uri}");
    }
  }
}
