use super::database::CloudDatabase;
use crate::error::{CloudError, Result, StoreErrorKind};
use crate::model::{Record, RecordId};
use crate::query::{compare_records, QueryCursor, QueryOperation};
use crate::subscription::{Notification, NotificationReason, Subscription};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Largest page the store hands out when the caller sets no smaller limit.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Open cursors kept before the oldest is expired.
pub const DEFAULT_CURSOR_LIMIT: usize = 64;

#[derive(Default)]
struct MemState {
    /// Insertion order is the store's natural result order.
    records: Vec<Record>,
    /// Cursor token and the records still to be delivered, oldest first.
    cursors: VecDeque<(String, Vec<Record>)>,
    subscriptions: BTreeMap<String, Subscription>,
    notifications: Vec<Notification>,
    offline: bool,
    fail_next: VecDeque<(StoreErrorKind, String)>,
    requests: usize,
    next_id: u64,
    next_tag: u64,
}

impl MemState {
    fn position(&self, record_id: &RecordId) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.record_id().as_ref() == Some(record_id))
    }

    fn take_cursor(&mut self, token: &str) -> Option<Vec<Record>> {
        let pos = self.cursors.iter().position(|(t, _)| t == token)?;
        self.cursors.remove(pos).map(|(_, rest)| rest)
    }

    fn open_cursor(&mut self, rest: Vec<Record>, limit: usize) -> QueryCursor {
        let token = Uuid::new_v4().to_string();
        self.cursors.push_back((token.clone(), rest));
        while self.cursors.len() > limit {
            if let Some((expired, _)) = self.cursors.pop_front() {
                debug!(cursor = %expired, "expired query cursor");
            }
        }
        QueryCursor::new(token)
    }

    fn notify(&mut self, record: &Record, reason: NotificationReason) {
        let Some(record_id) = record.record_id() else {
            return;
        };
        let fired: Vec<Notification> = self
            .subscriptions
            .values()
            .filter(|s| s.record_type == record.record_type())
            .filter(|s| s.options.fires_on(reason))
            .filter(|s| s.predicate.matches(record))
            .map(|s| Notification {
                subscription_id: s.subscription_id.clone(),
                record_id: record_id.clone(),
                reason,
                alert_body: s.notification_info.alert_body.clone(),
            })
            .collect();
        self.notifications.extend(fired);
    }
}

/// In-memory record store.
///
/// Behaves like a remote store for the purposes of the DAO stack: it names
/// records, tracks change tags, pages query results behind single-use cursors
/// and fires subscription notifications. Failures can be injected for tests.
///
/// Uses `parking_lot::Mutex`; no lock is held across an await point.
pub struct MemDatabase {
    state: Mutex<MemState>,
    batch_limit: usize,
    cursor_limit: usize,
    owner_name: Option<String>,
    id_prefix: Option<String>,
    latency: Option<Duration>,
}

impl Default for MemDatabase {
    fn default() -> Self {
        Self {
            state: Mutex::new(MemState::default()),
            batch_limit: DEFAULT_BATCH_LIMIT,
            cursor_limit: DEFAULT_CURSOR_LIMIT,
            owner_name: Some("_defaultOwner".to_string()),
            id_prefix: None,
            latency: None,
        }
    }
}

impl MemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size used when the caller gives no (or a larger) limit.
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit.max(1);
        self
    }

    /// Open cursors kept at once. Continuing an expired cursor fails with
    /// `InvalidArguments`.
    pub fn with_cursor_limit(mut self, cursor_limit: usize) -> Self {
        self.cursor_limit = cursor_limit.max(1);
        self
    }

    /// Owning principal stamped on new records. `None` simulates a store
    /// that does not report ownership.
    pub fn with_owner(mut self, owner_name: Option<String>) -> Self {
        self.owner_name = owner_name;
        self
    }

    /// Name new records `{prefix}1`, `{prefix}2`, ... instead of UUIDs.
    pub fn with_sequential_ids(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    /// Delay every request, so completions arrive on a runtime worker later.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    // --- Failure injection ---

    /// Fail every request with `NetworkUnavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Fail the next request with the given store error. Queues up.
    pub fn fail_next(&self, kind: StoreErrorKind, message: impl Into<String>) {
        self.state
            .lock()
            .fail_next
            .push_back((kind, message.into()));
    }

    // --- Inspection ---

    /// Number of requests that reached the store, failed or not.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn records_of_type(&self, record_type: &str) -> Vec<Record> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|r| r.record_type() == record_type)
            .cloned()
            .collect()
    }

    pub fn open_cursor_count(&self) -> usize {
        self.state.lock().cursors.len()
    }

    pub fn subscription_ids(&self) -> Vec<String> {
        self.state.lock().subscriptions.keys().cloned().collect()
    }

    /// Drain the notifications fired so far.
    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.state.lock().notifications)
    }

    async fn begin(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        state.requests += 1;
        if state.offline {
            return Err(CloudError::store(
                StoreErrorKind::NetworkUnavailable,
                "the store is not reachable",
            ));
        }
        if let Some((kind, message)) = state.fail_next.pop_front() {
            return Err(CloudError::store(kind, message));
        }
        Ok(())
    }

    fn next_record_name(&self, state: &mut MemState) -> String {
        state.next_id += 1;
        match &self.id_prefix {
            Some(prefix) => format!("{}{}", prefix, state.next_id),
            None => Uuid::new_v4().to_string(),
        }
    }

    fn page_size(&self, results_limit: Option<usize>) -> usize {
        match results_limit {
            Some(limit) if limit > 0 => limit.min(self.batch_limit),
            _ => self.batch_limit,
        }
    }
}

#[async_trait]
impl CloudDatabase for MemDatabase {
    async fn save_record(&self, record: Record) -> Result<Record> {
        self.begin().await?;
        let mut state = self.state.lock();
        let now = Utc::now();
        state.next_tag += 1;
        let tag = state.next_tag.to_string();

        let existing = record.record_id().and_then(|id| state.position(&id));
        if let Some(pos) = existing {
            let stored = &state.records[pos];
            if stored.record_type() != record.record_type() {
                return Err(CloudError::store(
                    StoreErrorKind::InvalidArguments,
                    format!(
                        "record type {} does not match stored type {}",
                        record.record_type(),
                        stored.record_type()
                    ),
                ));
            }
            if let Some(sent) = record.change_tag() {
                if stored.change_tag() != Some(sent) {
                    return Err(CloudError::store(
                        StoreErrorKind::ServerRecordChanged,
                        "the record was modified on the server",
                    ));
                }
            }
            let created_at = stored.created_at().unwrap_or(now);
            let owner = stored.owner_name().map(str::to_string);
            let name = stored.record_name().unwrap_or_default().to_string();

            let mut saved = record;
            saved.assign_identity(name, owner);
            saved.set_change_tag(tag);
            saved.set_timestamps(created_at, now);
            state.records[pos] = saved.clone();
            state.notify(&saved, NotificationReason::RecordUpdated);
            return Ok(saved);
        }

        let name = match record.record_name() {
            Some(name) => name.to_string(),
            None => self.next_record_name(&mut state),
        };
        let mut saved = record;
        saved.assign_identity(name, self.owner_name.clone());
        saved.set_change_tag(tag);
        saved.set_timestamps(now, now);
        state.records.push(saved.clone());
        state.notify(&saved, NotificationReason::RecordCreated);
        Ok(saved)
    }

    async fn fetch_record(&self, record_id: &RecordId) -> Result<Option<Record>> {
        self.begin().await?;
        let state = self.state.lock();
        Ok(state.position(record_id).map(|pos| state.records[pos].clone()))
    }

    async fn delete_record(&self, record_id: &RecordId) -> Result<RecordId> {
        self.begin().await?;
        let mut state = self.state.lock();
        let Some(pos) = state.position(record_id) else {
            return Err(CloudError::store(
                StoreErrorKind::UnknownItem,
                format!("record {} does not exist", record_id),
            ));
        };
        let removed = state.records.remove(pos);
        state.notify(&removed, NotificationReason::RecordDeleted);
        Ok(record_id.clone())
    }

    async fn run_query(
        &self,
        operation: QueryOperation,
        on_record: &mut (dyn FnMut(Record) + Send),
    ) -> Result<Option<QueryCursor>> {
        self.begin().await?;
        let page_size = self.page_size(operation.results_limit());

        let (batch, cursor) = {
            let mut state = self.state.lock();
            let mut matched = match operation {
                QueryOperation::Start { query, .. } => {
                    let mut matched: Vec<Record> = state
                        .records
                        .iter()
                        .filter(|r| r.record_type() == query.record_type)
                        .filter(|r| query.predicate.matches(r))
                        .cloned()
                        .collect();
                    matched.sort_by(|a, b| compare_records(a, b, &query.sort));
                    matched
                }
                QueryOperation::Continue { cursor, .. } => {
                    state.take_cursor(cursor.token()).ok_or_else(|| {
                        CloudError::store(
                            StoreErrorKind::InvalidArguments,
                            format!("cursor {} is no longer valid", cursor),
                        )
                    })?
                }
            };

            let rest = if matched.len() > page_size {
                matched.split_off(page_size)
            } else {
                Vec::new()
            };
            let cursor = if rest.is_empty() {
                None
            } else {
                Some(state.open_cursor(rest, self.cursor_limit))
            };
            (matched, cursor)
        };

        for record in batch {
            on_record(record);
            tokio::task::yield_now().await;
        }
        Ok(cursor)
    }

    async fn save_subscription(&self, subscription: Subscription) -> Result<Subscription> {
        self.begin().await?;
        let mut state = self.state.lock();
        state
            .subscriptions
            .insert(subscription.subscription_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn delete_subscription(&self, subscription_id: &str) -> Result<String> {
        self.begin().await?;
        let mut state = self.state.lock();
        match state.subscriptions.remove(subscription_id) {
            Some(_) => Ok(subscription_id.to_string()),
            None => Err(CloudError::store(
                StoreErrorKind::UnknownItem,
                format!("subscription {} does not exist", subscription_id),
            )),
        }
    }
}
