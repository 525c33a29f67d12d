use crate::error::{CloudError, Result};
use crate::fields::{
    is_reserved_key, Predicate, Value, OWNER_NAME_KEY, RECORD_NAME_KEY, ZONE_NAME_KEY,
};
use crate::model::{Record, RecordId, Row, ZoneId};
use crate::query::{Page, QueryCursor, SortDescriptor};
use crate::store::{CloudContext, CloudDatabase, RequestObserver};
use std::sync::Arc;

/// Map record accessor.
///
/// Same surface as the transport, but in terms of [`Row`]s: string-keyed
/// attribute maps carrying the reserved identity keys. New records are created
/// in the accessor's zone.
pub struct CloudMapDao<D: ?Sized> {
    context: CloudContext<D>,
    zone_id: ZoneId,
}

impl<D: CloudDatabase + ?Sized> CloudMapDao<D> {
    /// Accessor over `database` writing to the default zone.
    pub fn new(database: Arc<D>) -> Self {
        Self::with_zone(database, ZoneId::default())
    }

    pub fn with_zone(database: Arc<D>, zone_id: ZoneId) -> Self {
        Self::from_context(CloudContext::new(database), zone_id)
    }

    pub fn from_context(context: CloudContext<D>, zone_id: ZoneId) -> Self {
        Self { context, zone_id }
    }

    pub fn context(&self) -> &CloudContext<D> {
        &self.context
    }

    pub fn zone_id(&self) -> &ZoneId {
        &self.zone_id
    }

    pub fn set_observer(&self, observer: Option<Arc<dyn RequestObserver>>) {
        self.context.set_observer(observer);
    }

    /// Create a record of `entity_name` from `fields` and return the store's
    /// copy, identity keys included.
    pub async fn insert_entity(&self, entity_name: &str, fields: &Row) -> Result<Row> {
        let mut record = Record::new(entity_name, self.zone_id.clone());
        copy_fields(&mut record, fields);
        let saved = self.context.insert_record(record).await?;
        Ok(flatten(&saved))
    }

    /// Overlay `fields` onto the stored record and save it.
    ///
    /// Attributes not named in `fields` keep their stored value. Fails with
    /// [`CloudError::RecordNotFound`] when the store has no such record.
    pub async fn update_entity(&self, record_id: &RecordId, fields: &Row) -> Result<Row> {
        let mut record = self
            .context
            .fetch_record(record_id)
            .await?
            .ok_or_else(|| CloudError::RecordNotFound(record_id.clone()))?;
        copy_fields(&mut record, fields);
        let saved = self.context.update_record(record).await?;
        Ok(flatten(&saved))
    }

    /// Delete by record name within the accessor's zone.
    pub async fn delete_with_record_name(&self, record_name: &str) -> Result<RecordId> {
        let record_id = RecordId::new(record_name, self.zone_id.clone());
        self.delete_entity(&record_id).await
    }

    pub async fn delete_entity(&self, record_id: &RecordId) -> Result<RecordId> {
        self.context.delete_record(record_id).await
    }

    /// `Ok(None)` when the store has no such record.
    pub async fn fetch_entity(&self, record_id: &RecordId) -> Result<Option<Row>> {
        let record = self.context.fetch_record(record_id).await?;
        Ok(record.as_ref().map(flatten))
    }

    pub async fn find_rows(
        &self,
        entity_name: &str,
        predicate: Option<Predicate>,
        sort: &[SortDescriptor],
        results_limit: Option<usize>,
    ) -> Result<Page<Row>> {
        let page = self
            .context
            .query(entity_name, predicate, sort, results_limit)
            .await?;
        Ok(flatten_page(page))
    }

    pub async fn find_next_rows(
        &self,
        cursor: QueryCursor,
        results_limit: Option<usize>,
    ) -> Result<Page<Row>> {
        let page = self.context.continue_query(cursor, results_limit).await?;
        Ok(flatten_page(page))
    }
}

/// Identity keys plus every attribute the record holds.
///
/// Record name and zone are always present for a saved record; the owner only
/// when the store reported one.
pub fn flatten(record: &Record) -> Row {
    let mut row = Row::new();
    if let Some(name) = record.record_name() {
        row.insert(RECORD_NAME_KEY.to_string(), Value::from(name));
    }
    row.insert(
        ZONE_NAME_KEY.to_string(),
        Value::from(record.zone_id().zone_name.as_str()),
    );
    if let Some(owner) = record.owner_name() {
        row.insert(OWNER_NAME_KEY.to_string(), Value::from(owner));
    }
    for (key, value) in record.fields() {
        if !is_reserved_key(key) {
            row.insert(key.clone(), value.clone());
        }
    }
    row
}

fn flatten_page(page: Page<Record>) -> Page<Row> {
    let items = page.items.iter().map(flatten).collect();
    Page::new(items, page.cursor)
}

fn copy_fields(record: &mut Record, fields: &Row) {
    for (key, value) in fields {
        if !is_reserved_key(key) {
            record.set(key.clone(), value.clone());
        }
    }
}
