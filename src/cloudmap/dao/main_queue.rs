use super::object_dao::CloudObjectDao;
use crate::domain::DomainRecord;
use crate::error::Result;
use crate::fields::Predicate;
use crate::main_context::MainContext;
use crate::model::RecordId;
use crate::query::SortDescriptor;
use crate::store::CloudDatabase;
use std::sync::Arc;

/// Callback-style surface over a [`CloudObjectDao`].
///
/// Every call returns immediately; the completion receives the result on the
/// [`MainContext`] thread.
pub struct MainQueueDao<T, D: ?Sized> {
    dao: Arc<CloudObjectDao<T, D>>,
    main: MainContext,
}

impl<T, D> MainQueueDao<T, D>
where
    T: DomainRecord,
    D: CloudDatabase + ?Sized + 'static,
{
    pub fn new(dao: Arc<CloudObjectDao<T, D>>, main: MainContext) -> Self {
        Self { dao, main }
    }

    pub fn dao(&self) -> &Arc<CloudObjectDao<T, D>> {
        &self.dao
    }

    pub fn main_context(&self) -> &MainContext {
        &self.main
    }

    pub fn insert<C>(&self, object: T, completion: C)
    where
        C: FnOnce(Result<T>) + Send + 'static,
    {
        let dao = self.dao.clone();
        self.main
            .resume(async move { dao.insert(&object).await }, completion);
    }

    pub fn update<C>(&self, object: T, completion: C)
    where
        C: FnOnce(Result<T>) + Send + 'static,
    {
        let dao = self.dao.clone();
        self.main
            .resume(async move { dao.update(&object).await }, completion);
    }

    pub fn delete<C>(&self, object: T, completion: C)
    where
        C: FnOnce(Result<RecordId>) + Send + 'static,
    {
        let dao = self.dao.clone();
        self.main
            .resume(async move { dao.delete(&object).await }, completion);
    }

    pub fn find<C>(
        &self,
        predicate: Option<Predicate>,
        sort: Vec<SortDescriptor>,
        results_limit: Option<usize>,
        completion: C,
    ) where
        C: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let dao = self.dao.clone();
        self.main.resume(
            async move { dao.find(predicate, &sort, results_limit).await },
            completion,
        );
    }

    pub fn find_all<C>(&self, sort: Vec<SortDescriptor>, completion: C)
    where
        C: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let dao = self.dao.clone();
        self.main
            .resume(async move { dao.find_all(&sort).await }, completion);
    }

    pub fn find_next<C>(&self, results_limit: Option<usize>, completion: C)
    where
        C: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let dao = self.dao.clone();
        self.main
            .resume(async move { dao.find_next(results_limit).await }, completion);
    }
}
