//! # Domain Record Base Type
//!
//! Every type the object DAO maps implements [`DomainRecord`]: a `'static`
//! field table, access to its [`RecordIdentity`] and (derived) entity name.
//!
//! ## Entity Names
//!
//! The entity name defaults to the unqualified Rust type name
//! (`app::model::Parent` becomes `Parent`). Names are registered process-wide
//! when a DAO is built; two different types claiming the same name is an
//! error, since they would share records in the store.
//!
//! ## Identity
//!
//! Record name, zone and owner are assigned only by the mapping machinery from
//! a store response. Domain code reads them but cannot set them.

use crate::error::{CloudError, Result};
use crate::fields::{
    validate_fields, FieldDescriptor, Reference, ReferenceAction, Value, OWNER_NAME_KEY,
    RECORD_NAME_KEY, ZONE_NAME_KEY,
};
use crate::model::{Record, RecordId, Row, ZoneId};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIdentity {
    record_name: Option<String>,
    zone_name: Option<String>,
    owner_name: Option<String>,
}

impl RecordIdentity {
    pub fn record_name(&self) -> Option<&str> {
        self.record_name.as_deref()
    }

    pub fn zone_name(&self) -> Option<&str> {
        self.zone_name.as_deref()
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    /// The record this object was materialized from, if any.
    ///
    /// An empty record name counts as absent. A missing zone falls back to the
    /// default zone.
    pub fn record_id(&self) -> Option<RecordId> {
        let name = self.record_name.as_deref().filter(|n| !n.is_empty())?;
        let zone = self
            .zone_name
            .as_deref()
            .map(ZoneId::new)
            .unwrap_or_default();
        Some(RecordId::new(name, zone))
    }

    pub fn is_linked(&self) -> bool {
        self.record_id().is_some()
    }

    pub(crate) fn assign(
        &mut self,
        record_name: Option<String>,
        zone_name: Option<String>,
        owner_name: Option<String>,
    ) {
        self.record_name = record_name;
        self.zone_name = zone_name;
        self.owner_name = owner_name;
    }
}

pub trait DomainRecord: Sized + Send + Sync + 'static {
    /// Mapped fields. Must not use reserved keys or repeat a name.
    fn fields() -> &'static [FieldDescriptor<Self>];

    fn identity(&self) -> &RecordIdentity;

    fn identity_mut(&mut self) -> &mut RecordIdentity;

    fn entity_name() -> String {
        entity_name_of::<Self>()
    }

    fn record_id(&self) -> Option<RecordId> {
        self.identity().record_id()
    }

    /// Identity-only native record, or `None` for an unlinked object.
    fn as_record(&self) -> Option<Record> {
        let record_id = self.record_id()?;
        let entity_name = Self::entity_name();
        if entity_name.is_empty() {
            return None;
        }
        Some(Record::with_id(entity_name, record_id))
    }

    fn as_reference(&self, action: ReferenceAction) -> Option<Reference> {
        self.as_record()
            .and_then(|record| record.record_id())
            .map(|record_id| Reference::new(record_id, action))
    }

    /// Reference that deletes the referencing record along with this one.
    fn as_reference_with_delete_action(&self) -> Option<Reference> {
        self.as_reference(ReferenceAction::DeleteSelf)
    }

    fn as_reference_without_action(&self) -> Option<Reference> {
        self.as_reference(ReferenceAction::NoAction)
    }
}

/// Unqualified type name with generic arguments stripped.
pub fn entity_name_of<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

static ENTITY_REGISTRY: Lazy<Mutex<HashMap<String, (TypeId, &'static str)>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Validate `T`'s field table and claim its entity name.
///
/// Registering the same type again is a no-op.
pub fn register_entity<T: DomainRecord>() -> Result<String> {
    let name = T::entity_name();
    validate_fields(&name, T::fields())?;

    let mut registry = ENTITY_REGISTRY.lock();
    match registry.get(&name) {
        Some((type_id, existing)) if *type_id != TypeId::of::<T>() => {
            Err(CloudError::EntityNameCollision {
                name,
                existing: existing.to_string(),
            })
        }
        Some(_) => Ok(name),
        None => {
            registry.insert(name.clone(), (TypeId::of::<T>(), type_name::<T>()));
            debug!(entity = %name, rust_type = type_name::<T>(), "registered entity");
            Ok(name)
        }
    }
}

/// Rust type currently registered under `entity_name`.
pub fn registered_type(entity_name: &str) -> Option<&'static str> {
    ENTITY_REGISTRY
        .lock()
        .get(entity_name)
        .map(|(_, type_name)| *type_name)
}

/// Flatten an object: identity keys when linked, then every non-empty field.
pub fn to_row<T: DomainRecord>(object: &T) -> Row {
    let mut row = Row::new();
    let identity = object.identity();
    if let Some(name) = identity.record_name() {
        row.insert(RECORD_NAME_KEY.to_string(), Value::from(name));
    }
    if let Some(zone) = identity.zone_name() {
        row.insert(ZONE_NAME_KEY.to_string(), Value::from(zone));
    }
    if let Some(owner) = identity.owner_name() {
        row.insert(OWNER_NAME_KEY.to_string(), Value::from(owner));
    }
    for field in T::fields() {
        if let Some(value) = field.read(object) {
            row.insert(field.name.to_string(), value);
        }
    }
    row
}

/// Copy a row onto an object by name.
///
/// Identity is taken from the reserved keys. Unknown keys are ignored, fields
/// absent from the row keep their current value, and values of the wrong kind
/// are dropped.
pub fn apply_row<T: DomainRecord>(object: &mut T, row: &Row) {
    let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);
    object
        .identity_mut()
        .assign(text(RECORD_NAME_KEY), text(ZONE_NAME_KEY), text(OWNER_NAME_KEY));

    for field in T::fields() {
        let Some(value) = row.get(field.name) else {
            continue;
        };
        if !field.write(object, value.clone()) {
            debug!(
                entity = %T::entity_name(),
                field = field.name,
                expected = ?field.kind,
                found = ?value.kind(),
                "ignoring value of the wrong kind"
            );
        }
    }
}
