//! # Field System
//!
//! Everything that describes a record's attributes independently of any
//! particular domain type:
//!
//! - **Values** ([`Value`], [`ValueKind`]): what an attribute can hold
//! - **Descriptors** ([`FieldDescriptor`]): how a domain type exposes its fields
//! - **Predicates** ([`Predicate`]): how queries select records by attribute
//!
//! ## Value Kinds
//!
//! | Kind | Rust type | Notes |
//! |------|-----------|-------|
//! | `String` | `String` | |
//! | `Int` | `i64` | |
//! | `Double` | `f64` | accepts `Int` on assignment |
//! | `Bool` | `bool` | |
//! | `Timestamp` | `DateTime<Utc>` | |
//! | `Location` | [`Location`] | latitude / longitude |
//! | `StringList` | `Vec<String>` | ordered |
//! | `Reference` | [`Reference`] | target id + delete action |
//!
//! ## Reserved Keys
//!
//! Rows (string-keyed value maps) carry three bookkeeping keys next to the
//! domain attributes. No domain field may use them.

mod descriptor;
mod predicate;
mod value;

pub use descriptor::{validate_fields, FieldDescriptor, FieldValue, Getter, Setter};
pub use predicate::{CompareOp, Predicate};
pub use value::{Location, Reference, ReferenceAction, Value, ValueKind};

/// Row key holding the record identifier.
pub const RECORD_NAME_KEY: &str = "_record_name";
/// Row key holding the partition (zone) identifier.
pub const ZONE_NAME_KEY: &str = "_zone_name";
/// Row key holding the owning principal, when the store reports one.
pub const OWNER_NAME_KEY: &str = "_owner_name";

pub const RESERVED_KEYS: &[&str] = &[RECORD_NAME_KEY, ZONE_NAME_KEY, OWNER_NAME_KEY];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}
