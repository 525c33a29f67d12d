//! Field descriptor tables.
//!
//! Each domain type declares its mapped fields once, as a `'static` table of
//! [`FieldDescriptor`]s. Generic code walks the table to turn an object into a
//! row and back, so no per-type DAO code is needed.
//!
//! Descriptors are usually written with [`record_fields!`](crate::record_fields),
//! which covers the common `Option<X>` field shape:
//!
//! ```ignore
//! impl DomainRecord for Parent {
//!     fn fields() -> &'static [FieldDescriptor<Self>] {
//!         record_fields!(Parent {
//!             string_attribute: String,
//!             int_attribute: i64,
//!             location_attribute: Location,
//!         })
//!     }
//!     // identity accessors ...
//! }
//! ```

use super::{is_reserved_key, Location, Reference, Value, ValueKind};
use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub type Getter<T> = fn(&T) -> Option<Value>;
pub type Setter<T> = fn(&mut T, Value);

/// Name, kind and accessors for one mapped field of `T`.
pub struct FieldDescriptor<T: 'static> {
    pub name: &'static str,
    pub kind: ValueKind,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T: 'static> FieldDescriptor<T> {
    pub const fn new(name: &'static str, kind: ValueKind, get: Getter<T>, set: Setter<T>) -> Self {
        Self {
            name,
            kind,
            get,
            set,
        }
    }

    /// Current value, or `None` when the field is empty.
    pub fn read(&self, object: &T) -> Option<Value> {
        (self.get)(object)
    }

    /// Assign `value` if its kind fits the field. Returns whether it was assigned.
    pub fn write(&self, object: &mut T, value: Value) -> bool {
        if !self.kind.accepts(&value) {
            return false;
        }
        let value = match (self.kind, value) {
            (ValueKind::Double, Value::Int(v)) => Value::Double(v as f64),
            (_, v) => v,
        };
        (self.set)(object, value);
        true
    }
}

/// Reject tables that reuse a reserved key or declare a name twice.
pub fn validate_fields<T>(entity: &str, fields: &[FieldDescriptor<T>]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if is_reserved_key(field.name) {
            return Err(CloudError::ReservedField {
                entity: entity.to_string(),
                field: field.name.to_string(),
            });
        }
        if !seen.insert(field.name) {
            return Err(CloudError::DuplicateField {
                entity: entity.to_string(),
                field: field.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Rust types that map onto exactly one [`ValueKind`].
pub trait FieldValue: Sized {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.into_string()
    }
}

impl FieldValue for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int()
    }
}

impl FieldValue for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_double()
    }
}

impl FieldValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_timestamp()
    }
}

impl FieldValue for Location {
    const KIND: ValueKind = ValueKind::Location;

    fn into_value(self) -> Value {
        Value::Location(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_location()
    }
}

impl FieldValue for Vec<String> {
    const KIND: ValueKind = ValueKind::StringList;

    fn into_value(self) -> Value {
        Value::StringList(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.into_string_list()
    }
}

impl FieldValue for Reference {
    const KIND: ValueKind = ValueKind::Reference;

    fn into_value(self) -> Value {
        Value::Reference(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.into_reference()
    }
}

/// Build a `'static` descriptor table for `Option<X>` fields, where `X`
/// implements [`FieldValue`]. The attribute name is the Rust field name and
/// `X::KIND` is the field kind.
///
/// ```ignore
/// record_fields!(Child { string_attribute: String, ref_to_parent: Reference })
/// ```
#[macro_export]
macro_rules! record_fields {
    ($ty:ty { $($field:ident : $value:ty),* $(,)? }) => {{
        const FIELDS: &[$crate::fields::FieldDescriptor<$ty>] = &[
            $(
                $crate::fields::FieldDescriptor::new(
                    stringify!($field),
                    <$value as $crate::fields::FieldValue>::KIND,
                    |object: &$ty| {
                        object
                            .$field
                            .clone()
                            .map(<$value as $crate::fields::FieldValue>::into_value)
                    },
                    |object: &mut $ty, value: $crate::fields::Value| {
                        object.$field = <$value as $crate::fields::FieldValue>::from_value(value);
                    },
                ),
            )*
        ];
        FIELDS
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::RECORD_NAME_KEY;

    #[derive(Default)]
    struct Sample {
        title: Option<String>,
        score: Option<f64>,
    }

    const SAMPLE_FIELDS: &[FieldDescriptor<Sample>] = crate::record_fields!(Sample {
        title: String,
        score: f64,
    });

    #[test]
    fn test_read_skips_empty_fields() {
        let sample = Sample {
            title: Some("t".into()),
            score: None,
        };
        assert_eq!(SAMPLE_FIELDS[0].read(&sample), Some(Value::from("t")));
        assert_eq!(SAMPLE_FIELDS[1].read(&sample), None);
    }

    #[test]
    fn test_write_checks_kind() {
        let mut sample = Sample::default();
        assert!(!SAMPLE_FIELDS[0].write(&mut sample, Value::Int(1)));
        assert_eq!(sample.title, None);
        assert!(SAMPLE_FIELDS[0].write(&mut sample, Value::from("ok")));
        assert_eq!(sample.title.as_deref(), Some("ok"));
    }

    #[test]
    fn test_write_widens_int_into_double_field() {
        let mut sample = Sample::default();
        assert!(SAMPLE_FIELDS[1].write(&mut sample, Value::Int(4)));
        assert_eq!(sample.score, Some(4.0));
    }

    #[test]
    fn test_validate_rejects_reserved_and_duplicate_names() {
        const RESERVED: &[FieldDescriptor<Sample>] = &[FieldDescriptor::new(
            RECORD_NAME_KEY,
            ValueKind::String,
            |_: &Sample| None,
            |_: &mut Sample, _: Value| {},
        )];
        assert!(matches!(
            validate_fields("Sample", RESERVED),
            Err(CloudError::ReservedField { .. })
        ));

        const TWICE: &[FieldDescriptor<Sample>] = crate::record_fields!(Sample {
            title: String,
            title: String,
        });
        assert!(matches!(
            validate_fields("Sample", TWICE),
            Err(CloudError::DuplicateField { .. })
        ));

        assert!(validate_fields("Sample", SAMPLE_FIELDS).is_ok());
    }
}
