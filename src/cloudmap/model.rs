//! # Native Record Model
//!
//! These are the shapes the remote store speaks: a [`Record`] is a named
//! attribute bag of a given record type, addressed by a [`RecordId`]
//! (record name + [`ZoneId`]).
//!
//! A freshly built record has no name. The store assigns one on the first
//! successful save, together with the owning principal and a change tag used
//! for conflict detection. Domain code never sets those; only the store (or a
//! store implementation) does, through the `assign_*` / `set_*` methods below.

use crate::fields::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// String-keyed attribute mapping: the shape the map DAO speaks.
///
/// Besides domain attributes a row carries the reserved identity keys
/// ([`RECORD_NAME_KEY`](crate::fields::RECORD_NAME_KEY) and friends).
pub type Row = BTreeMap<String, Value>;

/// Zone used when nothing else is configured.
pub const DEFAULT_ZONE_NAME: &str = "_defaultZone";

/// Identifies a partition (zone) of the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId {
    pub zone_name: String,
}

impl ZoneId {
    pub fn new(zone_name: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
        }
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new(DEFAULT_ZONE_NAME)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.zone_name)
    }
}

/// Identifies a record: unique name within a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    pub record_name: String,
    pub zone_id: ZoneId,
}

impl RecordId {
    pub fn new(record_name: impl Into<String>, zone_id: ZoneId) -> Self {
        Self {
            record_name: record_name.into(),
            zone_id,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone_id, self.record_name)
    }
}

/// A record as held by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    record_type: String,
    record_name: Option<String>,
    zone_id: ZoneId,
    owner_name: Option<String>,
    change_tag: Option<String>,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// A new, unsaved record. The store names it on insert.
    pub fn new(record_type: impl Into<String>, zone_id: ZoneId) -> Self {
        Self {
            record_type: record_type.into(),
            record_name: None,
            zone_id,
            owner_name: None,
            change_tag: None,
            created_at: None,
            modified_at: None,
            fields: BTreeMap::new(),
        }
    }

    /// A record addressing an existing identifier, with no attributes.
    pub fn with_id(record_type: impl Into<String>, record_id: RecordId) -> Self {
        let mut record = Self::new(record_type, record_id.zone_id);
        record.record_name = Some(record_id.record_name);
        record
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn record_name(&self) -> Option<&str> {
        self.record_name.as_deref()
    }

    pub fn zone_id(&self) -> &ZoneId {
        &self.zone_id
    }

    /// `None` until the store has assigned a name.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_name
            .as_ref()
            .map(|name| RecordId::new(name.clone(), self.zone_id.clone()))
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    pub fn change_tag(&self) -> Option<&str> {
        self.change_tag.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn is_saved(&self) -> bool {
        self.record_name.is_some()
    }

    // --- Store-side bookkeeping ---

    /// Name the record and record its owner. Store implementations only.
    pub fn assign_identity(&mut self, record_name: impl Into<String>, owner_name: Option<String>) {
        self.record_name = Some(record_name.into());
        if owner_name.is_some() {
            self.owner_name = owner_name;
        }
    }

    /// Store implementations only.
    pub fn set_change_tag(&mut self, tag: impl Into<String>) {
        self.change_tag = Some(tag.into());
    }

    /// Store implementations only.
    pub fn set_timestamps(&mut self, created_at: DateTime<Utc>, modified_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.modified_at = Some(modified_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_identity() {
        let record = Record::new("Parent", ZoneId::default());
        assert!(!record.is_saved());
        assert_eq!(record.record_id(), None);
        assert_eq!(record.zone_id().zone_name, DEFAULT_ZONE_NAME);
    }

    #[test]
    fn test_with_id_addresses_existing_record() {
        let id = RecordId::new("R1", ZoneId::new("Z1"));
        let record = Record::with_id("Parent", id.clone());
        assert_eq!(record.record_id(), Some(id));
        assert_eq!(record.keys().count(), 0);
    }

    #[test]
    fn test_assign_identity_keeps_known_owner() {
        let mut record = Record::new("Parent", ZoneId::default());
        record.assign_identity("R1", Some("alice".into()));
        record.assign_identity("R1", None);
        assert_eq!(record.owner_name(), Some("alice"));
        assert_eq!(record.record_name(), Some("R1"));
    }

    #[test]
    fn test_record_id_displays_zone_and_name() {
        let id = RecordId::new("R1", ZoneId::new("Z1"));
        assert_eq!(id.to_string(), "Z1/R1");
    }
}
