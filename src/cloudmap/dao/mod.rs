//! # DAO Layers
//!
//! Two accessors stacked on the [`CloudContext`](crate::store::CloudContext)
//! transport, each changing the payload shape:
//!
//! ```text
//! CloudObjectDao<T>   T  <──>  Row      (field tables + factory)
//!       │
//! CloudMapDao         Row <──> Record   (identity keys, attribute copy)
//!       │
//! CloudContext        Record <──> store (lifecycle hooks, paging)
//! ```
//!
//! Errors travel up unchanged. Only two are raised here: `InvalidRecordId`
//! (update or delete of an unlinked object, before any request) and
//! `RecordNotFound` (update of a record the store does not have).
//!
//! [`MainQueueDao`] wraps the object DAO for consumers that want callbacks
//! delivered on the [`MainContext`](crate::main_context::MainContext).

mod main_queue;
mod map_dao;
mod object_dao;

pub use main_queue::MainQueueDao;
pub use map_dao::{flatten, CloudMapDao};
pub use object_dao::{CloudObjectDao, Factory};
