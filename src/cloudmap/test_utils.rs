//! Shared domain fixtures for tests.
//!
//! `Parent` covers every scalar kind; `Child` points at a parent through a
//! reference. Both register under their own entity names, so other tests
//! should not declare types with these names.

use crate::domain::{DomainRecord, RecordIdentity};
use crate::fields::{FieldDescriptor, Location, Reference};
use crate::record_fields;
use crate::store::MemDatabase;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parent {
    pub identity: RecordIdentity,
    pub string_attribute: Option<String>,
    pub double_attribute: Option<f64>,
    pub int_attribute: Option<i64>,
    pub date_time_attribute: Option<DateTime<Utc>>,
    pub location_attribute: Option<Location>,
    pub string_list_attribute: Option<Vec<String>>,
}

impl DomainRecord for Parent {
    fn fields() -> &'static [FieldDescriptor<Self>] {
        record_fields!(Parent {
            string_attribute: String,
            double_attribute: f64,
            int_attribute: i64,
            date_time_attribute: DateTime<Utc>,
            location_attribute: Location,
            string_list_attribute: Vec<String>,
        })
    }

    fn identity(&self) -> &RecordIdentity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut RecordIdentity {
        &mut self.identity
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Child {
    pub identity: RecordIdentity,
    pub ref_to_parent: Option<Reference>,
    pub string_attribute: Option<String>,
}

impl DomainRecord for Child {
    fn fields() -> &'static [FieldDescriptor<Self>] {
        record_fields!(Child {
            ref_to_parent: Reference,
            string_attribute: String,
        })
    }

    fn identity(&self) -> &RecordIdentity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut RecordIdentity {
        &mut self.identity
    }
}

/// In-memory store naming records `R1`, `R2`, ...
pub fn sequential_database() -> Arc<MemDatabase> {
    Arc::new(MemDatabase::new().with_sequential_ids("R"))
}

/// Held by tests that read or write process environment variables.
pub static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());
