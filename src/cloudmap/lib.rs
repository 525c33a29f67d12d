//! # Cloudmap Architecture
//!
//! Cloudmap maps **typed domain objects** onto records of a remote,
//! schema-less record store and back, hiding the store's paged query protocol
//! behind a uniform CRUD/query surface that works for any record type.
//!
//! ## The Three-Layer Stack
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Object DAO (dao::CloudObjectDao<T>)                        │
//! │  - T <──> Row through the type's field table                │
//! │  - Factory-built instances, stored or explicit cursors      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Map DAO (dao::CloudMapDao)                                 │
//! │  - Row <──> Record, reserved identity keys                  │
//! │  - Fetch-then-overlay updates                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport (store::CloudContext)                            │
//! │  - One request per call, lifecycle hook around each         │
//! │  - Streams query results into a Page                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                 store::CloudDatabase (remote or MemDatabase)
//! ```
//!
//! Each layer is a set of `async fn`s returning [`Result`](error::Result).
//! Errors travel up unchanged; the only ones raised locally are
//! `InvalidRecordId` and `RecordNotFound`.
//!
//! ## Delivering on One Context
//!
//! Consumers that need every completion on a single serial context (a UI
//! thread, typically) wrap the object DAO in a [`MainQueueDao`]. It runs each
//! call on the tokio runtime and posts the completion to the
//! [`MainContext`] thread.
//!
//! ## Declaring a Domain Type
//!
//! ```ignore
//! #[derive(Default)]
//! struct Note {
//!     identity: RecordIdentity,
//!     title: Option<String>,
//!     tags: Option<Vec<String>>,
//! }
//!
//! impl DomainRecord for Note {
//!     fn fields() -> &'static [FieldDescriptor<Self>] {
//!         record_fields!(Note { title: String, tags: Vec<String> })
//!     }
//!     fn identity(&self) -> &RecordIdentity { &self.identity }
//!     fn identity_mut(&mut self) -> &mut RecordIdentity { &mut self.identity }
//! }
//!
//! let notes = CloudObjectDao::<Note, _>::with_default(database)?;
//! let saved = notes.insert(&Note { title: Some("hi".into()), ..Default::default() }).await?;
//! ```
//!
//! ## Module Overview
//!
//! - [`dao`]: map and object DAOs, plus the main-context facade
//! - [`store`]: store handle trait, transport, in-memory store
//! - [`domain`]: the domain record trait, identity, entity names
//! - [`fields`]: values, field descriptors, predicates
//! - [`model`]: native record shapes
//! - [`query`]: sort order, cursors, pages
//! - [`subscription`]: push subscriptions
//! - [`main_context`]: the designated completion context
//! - [`config`]: configuration management
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: error types

pub mod config;
pub mod dao;
pub mod domain;
pub mod error;
pub mod fields;
pub mod logging;
pub mod main_context;
pub mod model;
pub mod query;
pub mod store;
pub mod subscription;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::CloudConfig;
pub use dao::{CloudMapDao, CloudObjectDao, MainQueueDao};
pub use domain::{DomainRecord, RecordIdentity};
pub use error::{CloudError, Result, StoreErrorKind};
pub use fields::{FieldDescriptor, Predicate, Value};
pub use main_context::MainContext;
pub use model::{Record, RecordId, Row, ZoneId};
pub use query::{Page, QueryCursor, SortDescriptor};
pub use store::{CloudContext, CloudDatabase, MemDatabase, RequestObserver};
pub use subscription::CloudSubscriptions;
