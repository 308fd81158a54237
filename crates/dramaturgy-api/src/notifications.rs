//! Handlers for `/notifications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications/count` | Role-dependent badge count |
//! | `GET`  | `/notifications` | Optional `limit` (default 10) and `unreadOnly=true` |
//! | `POST` | `/notifications/mark-read` | Body: `{"notificationIds":[...]}` |
//! | `POST` | `/notifications/mark-all-read` | No body |

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
};
use dramaturgy_core::{
  Error,
  notification::Notification,
  params::{ListParams, MarkReadRequest},
  store::{ForumStore, IdentityProvider},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, auth::CurrentPrincipal, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
  pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
  pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
  pub success: bool,
}

// ─── Count ────────────────────────────────────────────────────────────────────

/// `GET /notifications/count`
pub async fn count<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<CountResponse>, ApiError>
where
  S: ForumStore + IdentityProvider + 'static,
{
  let count = state.aggregator.pending_count(&principal).await?;
  Ok(Json(CountResponse { count }))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// Raw query values. Kept as strings so that an unparsable `limit` falls back
/// to the default instead of rejecting the request. A repeated key keeps its
/// first value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
  pub limit:       Option<String>,
  pub unread_only: Option<String>,
}

impl ListQuery {
  pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
    let mut query = Self::default();
    for (key, value) in pairs {
      let slot = match key.as_str() {
        "limit" => &mut query.limit,
        "unreadOnly" => &mut query.unread_only,
        _ => continue,
      };
      slot.get_or_insert(value);
    }
    query
  }
}

/// `GET /notifications[?limit=<n>][&unreadOnly=true]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError>
where
  S: ForumStore + IdentityProvider + 'static,
{
  let Query(pairs) = query.map_err(|e| Error::InvalidInput(e.body_text()))?;
  let query = ListQuery::from_pairs(pairs);
  let params = ListParams::from_raw(
    query.limit.as_deref(),
    query.unread_only.as_deref(),
    state.aggregator.config(),
  )?;
  let notifications = state.aggregator.list(&principal, params).await?;
  Ok(Json(ListResponse { notifications }))
}

// ─── Mark read ────────────────────────────────────────────────────────────────

/// `POST /notifications/mark-read` — body: `{"notificationIds":["<uuid>", ...]}`
///
/// IDs that are unknown or belong to another user are ignored.
pub async fn mark_read<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError>
where
  S: ForumStore + IdentityProvider + 'static,
{
  let Json(body) = body.map_err(|e| Error::InvalidInput(e.body_text()))?;
  let request = MarkReadRequest::from_json(&body)?;
  state.aggregator.mark_read(&principal, &request).await?;
  Ok(Json(SuccessResponse { success: true }))
}

/// `POST /notifications/mark-all-read`
pub async fn mark_all_read<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<SuccessResponse>, ApiError>
where
  S: ForumStore + IdentityProvider + 'static,
{
  state.aggregator.mark_all_read(&principal).await?;
  Ok(Json(SuccessResponse { success: true }))
}
