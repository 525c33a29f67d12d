use super::database::CloudDatabase;
use crate::error::Result;
use crate::fields::Predicate;
use crate::model::{Record, RecordId};
use crate::query::{Page, Query, QueryCursor, QueryOperation, SortDescriptor};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The transport operation a lifecycle notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Insert,
    Update,
    Delete,
    Fetch,
    Query,
    ContinueQuery,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestKind::Insert => "insert",
            RequestKind::Update => "update",
            RequestKind::Delete => "delete",
            RequestKind::Fetch => "fetch",
            RequestKind::Query => "query",
            RequestKind::ContinueQuery => "continue_query",
        };
        f.write_str(label)
    }
}

/// Request-lifecycle hook, typically driving a progress indicator.
///
/// Called once before and once after every transport request, success or
/// failure. Notifications of concurrent requests interleave freely, so
/// implementations should count rather than nest.
pub trait RequestObserver: Send + Sync {
    fn will_start_request(&self, request: RequestKind);

    fn did_end_request(&self, request: RequestKind);
}

/// Observer that counts lifecycle notifications.
#[derive(Debug, Default)]
pub struct ActivityCounter {
    started: AtomicUsize,
    ended: AtomicUsize,
}

impl ActivityCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn ended(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }

    /// Requests started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.started().saturating_sub(self.ended())
    }
}

impl RequestObserver for ActivityCounter {
    fn will_start_request(&self, _request: RequestKind) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn did_end_request(&self, _request: RequestKind) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

/// Remote record transport.
///
/// Wraps a [`CloudDatabase`] handle, issues single-record and query requests,
/// and brackets each one with observer notifications. Query results are
/// accumulated as the store streams them and handed back as one [`Page`].
pub struct CloudContext<D: ?Sized> {
    database: Arc<D>,
    observer: RwLock<Option<Arc<dyn RequestObserver>>>,
}

impl<D: CloudDatabase + ?Sized> CloudContext<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self {
            database,
            observer: RwLock::new(None),
        }
    }

    pub fn database(&self) -> &Arc<D> {
        &self.database
    }

    /// Replace the observer slot. `None` clears it.
    pub fn set_observer(&self, observer: Option<Arc<dyn RequestObserver>>) {
        *self.observer.write() = observer;
    }

    pub fn observer(&self) -> Option<Arc<dyn RequestObserver>> {
        self.observer.read().clone()
    }

    pub async fn insert_record(&self, record: Record) -> Result<Record> {
        self.track(RequestKind::Insert, self.database.save_record(record))
            .await
    }

    pub async fn update_record(&self, record: Record) -> Result<Record> {
        self.track(RequestKind::Update, self.database.save_record(record))
            .await
    }

    pub async fn delete_record(&self, record_id: &RecordId) -> Result<RecordId> {
        self.track(RequestKind::Delete, self.database.delete_record(record_id))
            .await
    }

    pub async fn fetch_record(&self, record_id: &RecordId) -> Result<Option<Record>> {
        self.track(RequestKind::Fetch, self.database.fetch_record(record_id))
            .await
    }

    /// Start a query. A missing predicate matches every record of the entity.
    pub async fn query(
        &self,
        entity_name: &str,
        predicate: Option<Predicate>,
        sort: &[SortDescriptor],
        results_limit: Option<usize>,
    ) -> Result<Page<Record>> {
        let operation = QueryOperation::Start {
            query: Query::new(entity_name, predicate, sort),
            results_limit,
        };
        self.run_query(RequestKind::Query, operation).await
    }

    /// Fetch the page after `cursor`. The cursor is consumed.
    pub async fn continue_query(
        &self,
        cursor: QueryCursor,
        results_limit: Option<usize>,
    ) -> Result<Page<Record>> {
        let operation = QueryOperation::Continue {
            cursor,
            results_limit,
        };
        self.run_query(RequestKind::ContinueQuery, operation).await
    }

    async fn run_query(&self, kind: RequestKind, operation: QueryOperation) -> Result<Page<Record>> {
        self.track(kind, async move {
            let mut records = Vec::new();
            let mut accumulate = |record: Record| records.push(record);
            let cursor = self.database.run_query(operation, &mut accumulate).await?;
            Ok(Page::new(records, cursor))
        })
        .await
    }

    async fn track<R, F>(&self, kind: RequestKind, request: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let observer = self.observer();
        if let Some(observer) = &observer {
            observer.will_start_request(kind);
        }
        debug!(request = %kind, "request starting");

        let result = request.await;

        debug!(request = %kind, ok = result.is_ok(), "request finished");
        if let Some(observer) = &observer {
            observer.did_end_request(kind);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorKind;
    use crate::fields::Value;
    use crate::model::ZoneId;
    use crate::store::MemDatabase;

    fn setup() -> (Arc<MemDatabase>, CloudContext<MemDatabase>, Arc<ActivityCounter>) {
        let db = Arc::new(MemDatabase::new().with_sequential_ids("R"));
        let context = CloudContext::new(db.clone());
        let counter = Arc::new(ActivityCounter::new());
        context.set_observer(Some(counter.clone()));
        (db, context, counter)
    }

    fn note(tag: &str) -> Record {
        let mut record = Record::new("Note", ZoneId::default());
        record.set("tag", Value::from(tag));
        record
    }

    #[tokio::test]
    async fn test_observer_brackets_every_request() {
        let (_db, context, counter) = setup();
        let saved = context.insert_record(note("x")).await.unwrap();
        context
            .fetch_record(&saved.record_id().unwrap())
            .await
            .unwrap();
        context.query("Note", None, &[], None).await.unwrap();

        assert_eq!(counter.started(), 3);
        assert_eq!(counter.ended(), 3);
        assert_eq!(counter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_observer_sees_failed_requests_too() {
        let (db, context, counter) = setup();
        db.fail_next(StoreErrorKind::NotAuthenticated, "no account");
        let err = context.insert_record(note("x")).await.unwrap_err();

        assert_eq!(err.store_kind(), Some(StoreErrorKind::NotAuthenticated));
        assert_eq!(counter.started(), 1);
        assert_eq!(counter.ended(), 1);
    }

    #[tokio::test]
    async fn test_query_without_predicate_matches_all() {
        let (_db, context, _) = setup();
        context.insert_record(note("x")).await.unwrap();
        context.insert_record(note("y")).await.unwrap();
        let page = context.query("Note", None, &[], None).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_continue_query_follows_cursor() {
        let (_db, context, _) = setup();
        for tag in ["a", "b", "c"] {
            context.insert_record(note(tag)).await.unwrap();
        }
        let first = context.query("Note", None, &[], Some(2)).await.unwrap();
        assert_eq!(first.len(), 2);
        let cursor = first.cursor.unwrap();

        let second = context.continue_query(cursor, Some(2)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(second.cursor.is_none());
    }

    #[tokio::test]
    async fn test_cleared_observer_is_not_called() {
        let (_db, context, counter) = setup();
        context.set_observer(None);
        context.insert_record(note("x")).await.unwrap();
        assert_eq!(counter.started(), 0);
    }
}
