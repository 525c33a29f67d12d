//! Attribute value types.
//!
//! A record attribute holds exactly one [`Value`]. The set of variants is the
//! set of shapes the remote store can persist natively; anything else has to be
//! encoded into one of these by the domain type's field descriptors.

use crate::model::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// What the store does to the referencing record when the target is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceAction {
    /// Delete the referencing record along with the target.
    DeleteSelf,
    /// Leave the referencing record alone.
    NoAction,
    /// A store-specific policy, passed through by name.
    Custom(String),
}

/// A link to another record, usable as a foreign-key style attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub record_id: RecordId,
    pub action: ReferenceAction,
}

impl Reference {
    pub fn new(record_id: RecordId, action: ReferenceAction) -> Self {
        Self { record_id, action }
    }
}

/// Runtime representation of an attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Location(Location),
    StringList(Vec<String>),
    Reference(Reference),
}

/// The kind of value a field holds, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Int,
    Double,
    Bool,
    Timestamp,
    Location,
    StringList,
    Reference,
}

impl ValueKind {
    /// Whether a value can be assigned to a field of this kind.
    ///
    /// Numbers are interchangeable in one direction only: an integer fits a
    /// double field, a double never narrows into an integer field.
    pub fn accepts(self, value: &Value) -> bool {
        let kind = value.kind();
        kind == self || (self == ValueKind::Double && kind == ValueKind::Int)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::Bool(_) => ValueKind::Bool,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Location(_) => ValueKind::Location,
            Value::StringList(_) => ValueKind::StringList,
            Value::Reference(_) => ValueKind::Reference,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to doubles.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<Location> {
        match self {
            Value::Location(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Value::StringList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string_list(self) -> Option<Vec<String>> {
        match self {
            Value::StringList(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_reference(self) -> Option<Reference> {
        match self {
            Value::Reference(v) => Some(v),
            _ => None,
        }
    }

    /// Order two values of compatible kinds.
    ///
    /// Returns `None` when the kinds cannot be ordered against each other
    /// (e.g. a string and a bool, or two locations).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
                self.as_double()?.partial_cmp(&other.as_double()?)
            }
            _ => None,
        }
    }

    /// Total order used to sort query results.
    ///
    /// Values group by kind first: bools, numbers, strings, timestamps,
    /// locations, string lists, references. Ints and doubles share a group and
    /// compare by numeric value, with NaN after every other number. Locations,
    /// string lists and references tie within their group.
    pub fn sort_order(&self, other: &Value) -> Ordering {
        let group = self.sort_group().cmp(&other.sort_group());
        if group != Ordering::Equal {
            return group;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => compare_doubles(*a, *b),
            (Value::Int(a), Value::Double(b)) => compare_int_double(*a, *b),
            (Value::Double(a), Value::Int(b)) => compare_int_double(*b, *a).reverse(),
            _ => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    fn sort_group(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Double(_) => 1,
            Value::String(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Location(_) => 4,
            Value::StringList(_) => 5,
            Value::Reference(_) => 6,
        }
    }

    /// Equality used by predicates: numbers compare across int/double,
    /// references compare by target only.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Reference(a), Value::Reference(b)) => a.record_id == b.record_id,
            (Value::Location(a), Value::Location(b)) => a == b,
            (Value::StringList(a), Value::StringList(b)) => a == b,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

fn compare_doubles(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact for integers past 2^53, where `a as f64` rounds.
fn compare_int_double(a: i64, b: f64) -> Ordering {
    if b.is_nan() {
        return Ordering::Less;
    }
    match (a as f64).partial_cmp(&b) {
        Some(Ordering::Equal) => a.cmp(&(b as i64)),
        Some(ordering) => ordering,
        None => Ordering::Less,
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Location> for Value {
    fn from(v: Location) -> Self {
        Value::Location(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringList(v)
    }
}

impl From<Reference> for Value {
    fn from(v: Reference) -> Self {
        Value::Reference(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ZoneId;

    #[test]
    fn test_double_field_accepts_int_but_not_the_reverse() {
        assert!(ValueKind::Double.accepts(&Value::Int(3)));
        assert!(!ValueKind::Int.accepts(&Value::Double(3.0)));
        assert!(!ValueKind::String.accepts(&Value::Int(3)));
    }

    #[test]
    fn test_numbers_compare_across_kinds() {
        assert_eq!(
            Value::Int(2).compare(&Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert!(Value::Int(4).matches(&Value::Double(4.0)));
    }

    #[test]
    fn test_unrelated_kinds_do_not_compare() {
        assert_eq!(Value::from("a").compare(&Value::Bool(true)), None);
        assert!(!Value::from("true").matches(&Value::Bool(true)));
    }

    #[test]
    fn test_references_match_by_target_only() {
        let id = RecordId::new("R1", ZoneId::default());
        let a = Value::Reference(Reference::new(id.clone(), ReferenceAction::DeleteSelf));
        let b = Value::Reference(Reference::new(id, ReferenceAction::NoAction));
        assert!(a.matches(&b));
    }

    #[test]
    fn test_accessors_reject_other_kinds() {
        let v = Value::StringList(vec!["a".into()]);
        assert_eq!(v.as_string_list(), Some(&["a".to_string()][..]));
        assert_eq!(v.as_str(), None);
        assert_eq!(Value::Int(7).as_double(), Some(7.0));
        assert_eq!(Value::Double(7.5).as_int(), None);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Value::Int(5)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":5}"#);
    }

    fn mixed_values() -> Vec<Value> {
        vec![
            Value::Int(1),
            Value::from("s"),
            Value::Int(0),
            Value::Double(f64::NAN),
            Value::Double(0.5),
            Value::Bool(true),
            Value::Int(i64::MIN),
            Value::Double(f64::NEG_INFINITY),
            Value::Int(9_007_199_254_740_993),
            Value::Double(9_007_199_254_740_992.0),
            Value::StringList(vec!["a".into()]),
            Value::Location(Location::new(1.0, 2.0)),
        ]
    }

    #[test]
    fn test_sort_order_is_a_total_order() {
        let values = mixed_values();
        for a in &values {
            for b in &values {
                assert_eq!(a.sort_order(b), b.sort_order(a).reverse(), "{a:?} vs {b:?}");
                for c in &values {
                    if a.sort_order(b) != Ordering::Greater && b.sort_order(c) != Ordering::Greater {
                        assert_ne!(a.sort_order(c), Ordering::Greater, "{a:?} {b:?} {c:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_sort_order_places_nan_after_numbers_and_groups_kinds() {
        let nan = Value::Double(f64::NAN);
        assert_eq!(nan.sort_order(&Value::Double(f64::INFINITY)), Ordering::Greater);
        assert_eq!(nan.sort_order(&Value::Int(i64::MAX)), Ordering::Greater);
        assert_eq!(nan.sort_order(&nan), Ordering::Equal);
        assert_eq!(nan.sort_order(&Value::from("a")), Ordering::Less);
        assert_eq!(Value::Int(1).sort_order(&Value::from("0")), Ordering::Less);
        assert_eq!(Value::Bool(true).sort_order(&Value::Int(0)), Ordering::Less);
        assert_eq!(
            Value::Int(9_007_199_254_740_993).sort_order(&Value::Double(9_007_199_254_740_992.0)),
            Ordering::Greater
        );
    }
}
