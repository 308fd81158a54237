//! The notification aggregator.
//!
//! Answers "how many items need my attention" and "what is my feed" for an
//! authenticated principal, and marks the principal's own notifications
//! read. Holds no mutable state: every call is an independent read or a
//! single scoped update against the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  notification::{Notification, NotificationQuery},
  params::{ListParams, MarkReadRequest, NotificationConfig},
  principal::{CountingStrategy, Principal},
  store::ForumStore,
};

pub struct Aggregator<S> {
  store:  Arc<S>,
  config: NotificationConfig,
}

impl<S: ForumStore> Aggregator<S> {
  pub fn new(store: Arc<S>, config: NotificationConfig) -> Self {
    Self { store, config }
  }

  pub fn config(&self) -> &NotificationConfig { &self.config }

  // ── Pending count ─────────────────────────────────────────────────────

  /// Badge count for `principal`, evaluated against the current time.
  pub async fn pending_count(&self, principal: &Principal) -> Result<u64> {
    self.pending_count_at(principal, Utc::now()).await
  }

  /// Badge count for `principal` as of `now`.
  ///
  /// The reply-window cutoff is computed once from `now` and the store
  /// compares with `created_at >= cutoff`.
  pub async fn pending_count_at(
    &self,
    principal: &Principal,
    now: DateTime<Utc>,
  ) -> Result<u64> {
    let strategy = CountingStrategy::for_role(principal.role);
    let count = match strategy {
      CountingStrategy::GlobalUnsolvedCount => {
        self.store.count_open_questions().await
      }
      CountingStrategy::PersonalRecentReplyCount => {
        let since = self.config.reply_window_start(now);
        self.store.count_replies_to_author_since(principal.id, since).await
      }
    }
    .map_err(Error::storage("pending_count"))?;

    tracing::debug!(user_id = %principal.id, ?strategy, count, "pending count");
    Ok(count)
  }

  // ── Feed ──────────────────────────────────────────────────────────────

  pub async fn list(
    &self,
    principal: &Principal,
    params: ListParams,
  ) -> Result<Vec<Notification>> {
    let query = NotificationQuery {
      user_id:     principal.id,
      unread_only: params.unread_only,
      limit:       params.limit.get(),
    };
    self
      .store
      .list_notifications(&query)
      .await
      .map_err(Error::storage("list_notifications"))
  }

  // ── Mark read ─────────────────────────────────────────────────────────

  /// Mark the requested notifications read. Only the principal's own
  /// notifications are touched; the ownership filter is part of the store
  /// update itself.
  pub async fn mark_read(
    &self,
    principal: &Principal,
    request: &MarkReadRequest,
  ) -> Result<u64> {
    if request.ids().is_empty() {
      return Ok(0);
    }
    let updated = self
      .store
      .mark_read(principal.id, request.ids(), Utc::now())
      .await
      .map_err(Error::storage("mark_read"))?;

    tracing::debug!(
      user_id = %principal.id,
      requested = request.ids().len(),
      updated,
      "marked notifications read"
    );
    Ok(updated)
  }

  pub async fn mark_all_read(&self, principal: &Principal) -> Result<u64> {
    let updated = self
      .store
      .mark_all_read(principal.id, Utc::now())
      .await
      .map_err(Error::storage("mark_all_read"))?;

    tracing::debug!(user_id = %principal.id, updated, "marked all notifications read");
    Ok(updated)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::{Duration, TimeZone as _};
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use crate::{
    notification::NotificationKind,
    principal::Role,
  };

  // A store that records what the aggregator asked for.
  #[derive(Default)]
  struct RecordingStore {
    open_questions: u64,
    reply_times:    Vec<DateTime<Utc>>,
    since_seen:     Mutex<Vec<DateTime<Utc>>>,
    queries:        Mutex<Vec<NotificationQuery>>,
    marked:         Mutex<Vec<(Uuid, Vec<Uuid>)>>,
    fail:           bool,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("disk on fire")]
  struct Boom;

  impl ForumStore for RecordingStore {
    type Error = Boom;

    async fn count_open_questions(&self) -> Result<u64, Boom> {
      if self.fail { return Err(Boom); }
      Ok(self.open_questions)
    }

    async fn count_replies_to_author_since(
      &self,
      _author_id: Uuid,
      since: DateTime<Utc>,
    ) -> Result<u64, Boom> {
      self.since_seen.lock().unwrap().push(since);
      Ok(self.reply_times.iter().filter(|t| **t >= since).count() as u64)
    }

    async fn list_notifications(
      &self,
      query: &NotificationQuery,
    ) -> Result<Vec<Notification>, Boom> {
      self.queries.lock().unwrap().push(query.clone());
      Ok(vec![Notification {
        id:         Uuid::new_v4(),
        user_id:    query.user_id,
        kind:       NotificationKind::System,
        message:    "welcome".into(),
        read:       false,
        read_at:    None,
        created_at: Utc::now(),
        question:   None,
        reply:      None,
        actor:      None,
      }])
    }

    async fn mark_read(
      &self,
      owner: Uuid,
      ids: &[Uuid],
      _at: DateTime<Utc>,
    ) -> Result<u64, Boom> {
      if self.fail { return Err(Boom); }
      self.marked.lock().unwrap().push((owner, ids.to_vec()));
      Ok(ids.len() as u64)
    }

    async fn mark_all_read(&self, _owner: Uuid, _at: DateTime<Utc>) -> Result<u64, Boom> {
      Ok(0)
    }
  }

  fn aggregator(store: RecordingStore) -> Aggregator<RecordingStore> {
    Aggregator::new(Arc::new(store), NotificationConfig::default())
  }

  fn principal(role: Role) -> Principal {
    Principal { id: Uuid::new_v4(), role }
  }

  #[tokio::test]
  async fn privileged_roles_see_global_open_questions() {
    let agg = aggregator(RecordingStore { open_questions: 4, ..Default::default() });
    for role in [Role::Expert, Role::Moderator, Role::Admin] {
      assert_eq!(agg.pending_count(&principal(role)).await.unwrap(), 4);
    }
    assert!(agg.store.since_seen.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn regular_users_count_replies_in_window() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let store = RecordingStore {
      open_questions: 99,
      reply_times: vec![
        now - Duration::days(1),
        now - Duration::days(7),
        now - Duration::days(7) - Duration::seconds(1),
        now - Duration::days(10),
      ],
      ..Default::default()
    };
    let agg = aggregator(store);

    let count = agg.pending_count_at(&principal(Role::Regular), now).await.unwrap();
    assert_eq!(count, 2, "boundary reply at exactly now-7d is included");
    assert_eq!(
      agg.store.since_seen.lock().unwrap().as_slice(),
      &[now - Duration::days(7)]
    );
  }

  #[tokio::test]
  async fn oversized_reply_window_counts_everything() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let store = RecordingStore {
      reply_times: vec![now - Duration::days(1), now - Duration::days(40_000)],
      ..Default::default()
    };
    let config = NotificationConfig { reply_window_days: u32::MAX, ..Default::default() };
    let agg = Aggregator::new(Arc::new(store), config);

    let count = agg.pending_count_at(&principal(Role::Regular), now).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(
      agg.store.since_seen.lock().unwrap().as_slice(),
      &[DateTime::<Utc>::MIN_UTC]
    );
  }

  #[tokio::test]
  async fn storage_failure_is_tagged_with_operation() {
    let agg = aggregator(RecordingStore { fail: true, ..Default::default() });
    let err = agg.pending_count(&principal(Role::Admin)).await.unwrap_err();
    assert!(matches!(err, Error::Storage { operation: "pending_count", .. }));
  }

  #[tokio::test]
  async fn list_scopes_query_to_principal() {
    let agg = aggregator(RecordingStore::default());
    let p = principal(Role::Regular);
    let params = ListParams::from_raw(Some("5"), Some("true"), agg.config()).unwrap();

    let items = agg.list(&p, params).await.unwrap();
    assert!(items.iter().all(|n| n.user_id == p.id));

    let queries = agg.store.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].user_id, p.id);
    assert_eq!(queries[0].limit, 5);
    assert!(queries[0].unread_only);
  }

  #[tokio::test]
  async fn mark_read_passes_owner_to_store() {
    let agg = aggregator(RecordingStore::default());
    let p = principal(Role::Regular);
    let id = Uuid::new_v4();
    let req = MarkReadRequest::from_json(&json!({ "notificationIds": [id.to_string()] })).unwrap();

    agg.mark_read(&p, &req).await.unwrap();
    assert_eq!(agg.store.marked.lock().unwrap().as_slice(), &[(p.id, vec![id])]);
  }

  #[tokio::test]
  async fn mark_read_with_only_malformed_ids_skips_store() {
    let agg = aggregator(RecordingStore { fail: true, ..Default::default() });
    let req = MarkReadRequest::from_json(&json!({ "notificationIds": ["x"] })).unwrap();
    assert_eq!(agg.mark_read(&principal(Role::Regular), &req).await.unwrap(), 0);
  }
}
