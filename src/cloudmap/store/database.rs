use crate::error::Result;
use crate::model::{Record, RecordId};
use crate::query::{QueryCursor, QueryOperation};
use crate::subscription::Subscription;
use async_trait::async_trait;

/// Connection handle to one database scope of the remote store.
///
/// This trait handles the "how" of talking to the store, while the DAO layers
/// handle the "what" (shape conversion, cursors, preconditions). The embedding
/// application creates and authenticates the handle; the core only borrows it.
///
/// Implementations report every failure as [`CloudError::Store`]
/// (crate::error::CloudError::Store) and must not panic.
#[async_trait]
pub trait CloudDatabase: Send + Sync {
    // --- Records ---

    /// Insert a new record or update an existing one.
    ///
    /// An unnamed record is created and named by the store. A named record
    /// carrying a change tag is rejected with `ServerRecordChanged` if the
    /// stored copy has moved on.
    async fn save_record(&self, record: Record) -> Result<Record>;

    /// Returns Ok(None) if the store has no such record.
    async fn fetch_record(&self, record_id: &RecordId) -> Result<Option<Record>>;

    /// Returns the id of the deleted record.
    async fn delete_record(&self, record_id: &RecordId) -> Result<RecordId>;

    // --- Queries ---

    /// Run one page of a query, handing each matched record to `on_record`
    /// as it arrives. Resolves once the page is exhausted, with a cursor when
    /// more results remain.
    async fn run_query(
        &self,
        operation: QueryOperation,
        on_record: &mut (dyn FnMut(Record) + Send),
    ) -> Result<Option<QueryCursor>>;

    // --- Subscriptions ---

    async fn save_subscription(&self, subscription: Subscription) -> Result<Subscription>;

    /// Returns the id of the deleted subscription.
    async fn delete_subscription(&self, subscription_id: &str) -> Result<String>;
}
