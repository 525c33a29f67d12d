//! # Store Layer
//!
//! Everything that talks to the remote record store.
//!
//! ## Components
//!
//! - **[`CloudDatabase`]**: the connection handle trait. One implementation per
//!   store; the embedding application creates and authenticates it.
//! - **[`CloudContext`]**: the transport. Issues requests through a handle,
//!   brackets each one with [`RequestObserver`] notifications and accumulates
//!   streamed query results into a [`Page`](crate::query::Page).
//! - **[`MemDatabase`]**: an in-memory store with record naming, change tags,
//!   store-side paging, subscriptions and failure injection.
//!
//! ## Request Lifecycle
//!
//! ```text
//! will_start_request(kind)
//!     -> CloudDatabase call (may stream records)
//! did_end_request(kind)
//!     -> Result returned to the map layer
//! ```
//!
//! Both notifications fire for failed requests as well. Requests that a DAO
//! rejects locally (missing record identifier) never reach this layer and
//! produce no notifications.

mod context;
mod database;
mod mem_database;

pub use context::{ActivityCounter, CloudContext, RequestKind, RequestObserver};
pub use database::CloudDatabase;
pub use mem_database::{MemDatabase, DEFAULT_BATCH_LIMIT, DEFAULT_CURSOR_LIMIT};
