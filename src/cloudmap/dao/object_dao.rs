use super::map_dao::CloudMapDao;
use crate::config::CloudConfig;
use crate::domain::{apply_row, register_entity, to_row, DomainRecord};
use crate::error::{CloudError, Result};
use crate::fields::{Predicate, RECORD_NAME_KEY};
use crate::model::{RecordId, Row};
use crate::query::{Page, QueryCursor, SortDescriptor};
use crate::store::{CloudDatabase, RequestObserver};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces a fresh, empty `T` to materialize a row into. `None` means the
/// type cannot be built right now; the row is skipped.
pub type Factory<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;

/// Generic object DAO over a [`DomainRecord`] type.
///
/// Converts `T` to rows through its field table and back through the
/// factory, so no per-type DAO code is needed.
///
/// Two query surfaces are offered:
/// - [`find_page`](Self::find_page) / [`find_next_page`](Self::find_next_page)
///   hand the cursor to the caller.
/// - [`find`](Self::find) / [`find_all`](Self::find_all) /
///   [`find_next`](Self::find_next) keep one cursor per DAO. Each find replaces
///   it, each failure clears it. With concurrent finds on the same DAO the
///   last one to complete wins.
pub struct CloudObjectDao<T, D: ?Sized> {
    map_dao: CloudMapDao<D>,
    factory: Factory<T>,
    entity_name: String,
    results_limit: Option<usize>,
    cursor: Mutex<Option<QueryCursor>>,
}

impl<T: DomainRecord, D: CloudDatabase + ?Sized> CloudObjectDao<T, D> {
    /// DAO over `database` writing to the default zone.
    ///
    /// Fails if `T`'s field table is invalid or its entity name is taken by
    /// another type.
    pub fn new<F>(database: Arc<D>, factory: F) -> Result<Self>
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self::with_map_dao(CloudMapDao::new(database), factory)
    }

    pub fn with_map_dao<F>(map_dao: CloudMapDao<D>, factory: F) -> Result<Self>
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let entity_name = register_entity::<T>()?;
        Ok(Self {
            map_dao,
            factory: Box::new(factory),
            entity_name,
            results_limit: None,
            cursor: Mutex::new(None),
        })
    }

    /// DAO using the configured zone and default page size.
    pub fn from_config<F>(database: Arc<D>, config: &CloudConfig, factory: F) -> Result<Self>
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let map_dao = CloudMapDao::with_zone(database, config.zone_id());
        Ok(Self::with_map_dao(map_dao, factory)?.with_results_limit(config.results_limit))
    }

    /// Page size for find calls that pass no limit.
    pub fn with_results_limit(mut self, results_limit: Option<usize>) -> Self {
        self.results_limit = results_limit;
        self
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn map_dao(&self) -> &CloudMapDao<D> {
        &self.map_dao
    }

    pub fn set_observer(&self, observer: Option<Arc<dyn RequestObserver>>) {
        self.map_dao.set_observer(observer);
    }

    /// The cursor [`find_next`](Self::find_next) would continue from.
    pub fn current_cursor(&self) -> Option<QueryCursor> {
        self.cursor.lock().clone()
    }

    // --- Single objects ---

    /// Insert `object` and return a new instance built from the store's copy.
    pub async fn insert(&self, object: &T) -> Result<T> {
        let row = to_row(object);
        let saved = self.map_dao.insert_entity(&self.entity_name, &row).await?;
        self.materialize_one(&saved)
    }

    /// Save `object`'s non-empty fields over the stored record.
    ///
    /// Fields that are empty on `object` keep their stored value.
    pub async fn update(&self, object: &T) -> Result<T> {
        let record_id = object.record_id().ok_or(CloudError::InvalidRecordId)?;
        let saved = self
            .map_dao
            .update_entity(&record_id, &to_row(object))
            .await?;
        self.materialize_one(&saved)
    }

    /// Returns the id of the deleted record. Deleting a record the store no
    /// longer has reports the store's error.
    pub async fn delete(&self, object: &T) -> Result<RecordId> {
        let record_id = object.record_id().ok_or(CloudError::InvalidRecordId)?;
        self.map_dao.delete_entity(&record_id).await
    }

    // --- Explicit cursors ---

    pub async fn find_page(
        &self,
        predicate: Option<Predicate>,
        sort: &[SortDescriptor],
        results_limit: Option<usize>,
    ) -> Result<Page<T>> {
        let rows = self
            .map_dao
            .find_rows(
                &self.entity_name,
                predicate,
                sort,
                results_limit.or(self.results_limit),
            )
            .await?;
        Ok(self.materialize_page(rows))
    }

    pub async fn find_next_page(
        &self,
        cursor: QueryCursor,
        results_limit: Option<usize>,
    ) -> Result<Page<T>> {
        let rows = self
            .map_dao
            .find_next_rows(cursor, results_limit.or(self.results_limit))
            .await?;
        Ok(self.materialize_page(rows))
    }

    // --- Stored cursor ---

    /// Start a query, replacing any stored cursor.
    pub async fn find(
        &self,
        predicate: Option<Predicate>,
        sort: &[SortDescriptor],
        results_limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let result = self.find_page(predicate, sort, results_limit).await;
        self.keep_cursor(result)
    }

    pub async fn find_all(&self, sort: &[SortDescriptor]) -> Result<Vec<T>> {
        self.find(None, sort, None).await
    }

    pub async fn find_all_objects(&self) -> Result<Vec<T>> {
        self.find_all(&[]).await
    }

    /// Continue the last query. Empty, not an error, when no cursor is held.
    pub async fn find_next(&self, results_limit: Option<usize>) -> Result<Vec<T>> {
        let cursor = self.cursor.lock().take();
        let Some(cursor) = cursor else {
            return Ok(Vec::new());
        };
        let result = self.find_next_page(cursor, results_limit).await;
        self.keep_cursor(result)
    }

    fn keep_cursor(&self, result: Result<Page<T>>) -> Result<Vec<T>> {
        let mut stored = self.cursor.lock();
        match result {
            Ok(page) => {
                debug!(entity = %self.entity_name, has_more = page.has_more(), "stored cursor updated");
                *stored = page.cursor;
                Ok(page.items)
            }
            Err(err) => {
                *stored = None;
                Err(err)
            }
        }
    }

    // --- Materialization ---

    fn materialize(&self, row: &Row) -> Option<T> {
        let mut object = (self.factory)()?;
        apply_row(&mut object, row);
        Some(object)
    }

    fn materialize_one(&self, row: &Row) -> Result<T> {
        self.materialize(row)
            .ok_or_else(|| CloudError::Materialization(self.entity_name.clone()))
    }

    fn materialize_page(&self, page: Page<Row>) -> Page<T> {
        let items = page
            .items
            .iter()
            .filter_map(|row| {
                let object = self.materialize(row);
                if object.is_none() {
                    warn!(
                        entity = %self.entity_name,
                        record = ?row.get(RECORD_NAME_KEY),
                        "skipping row that could not be materialized"
                    );
                }
                object
            })
            .collect();
        Page::new(items, page.cursor)
    }
}

impl<T: DomainRecord + Default, D: CloudDatabase + ?Sized> CloudObjectDao<T, D> {
    /// DAO whose factory is `T::default`.
    pub fn with_default(database: Arc<D>) -> Result<Self> {
        Self::new(database, || Some(T::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainRecord;
    use crate::error::StoreErrorKind;
    use crate::model::ZoneId;
    use crate::store::{ActivityCounter, MemDatabase};
    use crate::test_utils::{sequential_database, Child, Parent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<MemDatabase>, CloudObjectDao<Parent, MemDatabase>) {
        let db = sequential_database();
        let dao = CloudObjectDao::with_default(db.clone()).unwrap();
        (db, dao)
    }

    fn parent(name: &str, rank: i64) -> Parent {
        Parent {
            string_attribute: Some(name.to_string()),
            int_attribute: Some(rank),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_returns_new_linked_instance() {
        let (_db, dao) = setup();
        let transient = parent("abc", 1);
        let saved = dao.insert(&transient).await.unwrap();

        assert!(!transient.identity().is_linked());
        assert_eq!(saved.identity().record_name(), Some("R1"));
        assert_eq!(saved.identity().zone_name(), Some("_defaultZone"));
        assert_eq!(saved.identity().owner_name(), Some("_defaultOwner"));
        assert_eq!(saved.string_attribute.as_deref(), Some("abc"));
        assert_eq!(saved.int_attribute, Some(1));
    }

    #[tokio::test]
    async fn test_update_refreshes_and_keeps_empty_fields() {
        let (_db, dao) = setup();
        let saved = dao.insert(&parent("abc", 1)).await.unwrap();

        let mut edit = saved.clone();
        edit.int_attribute = Some(2);
        edit.string_attribute = None;
        let updated = dao.update(&edit).await.unwrap();

        assert_eq!(updated.identity(), saved.identity());
        assert_eq!(updated.int_attribute, Some(2));
        assert_eq!(updated.string_attribute.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_update_and_delete_need_an_identifier() {
        let (db, dao) = setup();
        let counter = Arc::new(ActivityCounter::new());
        dao.set_observer(Some(counter.clone()));

        let transient = parent("abc", 1);
        assert!(matches!(
            dao.update(&transient).await,
            Err(CloudError::InvalidRecordId)
        ));
        assert!(matches!(
            dao.delete(&transient).await,
            Err(CloudError::InvalidRecordId)
        ));
        assert_eq!(counter.started(), 0);
        assert_eq!(db.request_count(), 0);
    }

    #[tokio::test]
    async fn test_update_of_deleted_record_is_not_found() {
        let (_db, dao) = setup();
        let saved = dao.insert(&parent("abc", 1)).await.unwrap();
        dao.delete(&saved).await.unwrap();

        let err = dao.update(&saved).await.unwrap_err();
        assert!(matches!(err, CloudError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_find_clears_stored_cursor() {
        let (db, dao) = setup();
        for n in 0..3 {
            dao.insert(&parent("p", n)).await.unwrap();
        }
        dao.find(None, &[], Some(1)).await.unwrap();
        assert!(dao.current_cursor().is_some());

        db.fail_next(StoreErrorKind::NetworkUnavailable, "offline");
        assert!(dao.find(None, &[], Some(1)).await.is_err());
        assert!(dao.current_cursor().is_none());
        assert!(dao.find_next(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_cursor_pages_do_not_touch_stored_cursor() {
        let (_db, dao) = setup();
        for n in 0..3 {
            dao.insert(&parent("p", n)).await.unwrap();
        }
        let first = dao
            .find_page(None, &[SortDescriptor::ascending("int_attribute")], Some(2))
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(dao.current_cursor().is_none());

        let rest = dao
            .find_next_page(first.cursor.unwrap(), Some(2))
            .await
            .unwrap();
        assert_eq!(rest.items[0].int_attribute, Some(2));
        assert!(!rest.has_more());
    }

    #[tokio::test]
    async fn test_default_results_limit_applies_when_none_given() {
        let db = Arc::new(MemDatabase::new());
        let config = CloudConfig {
            zone_name: "Z1".into(),
            results_limit: Some(2),
            ..Default::default()
        };
        let dao: CloudObjectDao<Parent, _> =
            CloudObjectDao::from_config(db, &config, || Some(Parent::default())).unwrap();
        for n in 0..3 {
            dao.insert(&parent("p", n)).await.unwrap();
        }
        let found = dao.find_all_objects().await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].identity().zone_name(), Some("Z1"));
        assert_eq!(dao.find_next(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_factory_failure_skips_rows_in_lists() {
        let db = Arc::new(MemDatabase::new());
        let writer: CloudObjectDao<Child, _> = CloudObjectDao::with_default(db.clone()).unwrap();
        for n in 0..4 {
            let child = Child {
                string_attribute: Some(format!("c{}", n)),
                ..Default::default()
            };
            writer.insert(&child).await.unwrap();
        }

        // Builds every other object.
        let calls = AtomicUsize::new(0);
        let reader: CloudObjectDao<Child, _> = CloudObjectDao::new(db, move || {
            (calls.fetch_add(1, Ordering::SeqCst) % 2 == 0).then(Child::default)
        })
        .unwrap();

        let found = reader.find_all_objects().await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_factory_failure_on_insert_is_materialization_error() {
        let db = Arc::new(MemDatabase::new());
        let dao: CloudObjectDao<Child, _> = CloudObjectDao::new(db.clone(), || None).unwrap();
        let err = dao.insert(&Child::default()).await.unwrap_err();
        assert!(matches!(err, CloudError::Materialization(ref entity) if entity == "Child"));
        // The record was still written.
        assert_eq!(db.record_count(), 1);
    }

    #[tokio::test]
    async fn test_references_round_trip_through_the_store() {
        let db = Arc::new(MemDatabase::new());
        let parents: CloudObjectDao<Parent, _> = CloudObjectDao::with_default(db.clone()).unwrap();
        let children: CloudObjectDao<Child, _> = CloudObjectDao::with_default(db).unwrap();

        let parent = parents.insert(&parent("abc", 1)).await.unwrap();
        let reference = parent.as_reference_with_delete_action().unwrap();
        let child = Child {
            string_attribute: Some("kid".into()),
            ref_to_parent: Some(reference.clone()),
            ..Default::default()
        };
        children.insert(&child).await.unwrap();

        let found = children
            .find(Some(Predicate::eq("ref_to_parent", reference)), &[], None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].ref_to_parent.as_ref().map(|r| &r.record_id),
            parent.record_id().as_ref()
        );
        assert_eq!(
            parent.record_id().map(|id| id.zone_id),
            Some(ZoneId::default())
        );
    }
}
