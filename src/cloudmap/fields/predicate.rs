//! Query predicates.
//!
//! A [`Predicate`] selects records by attribute values. The store evaluates
//! it remotely; [`Predicate::matches`] is the reference evaluation used by the
//! in-memory store and by subscriptions.

use super::Value;
use crate::model::Record;
use std::cmp::Ordering;

/// Comparison operator for [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record of the entity.
    All,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Field equals any of the values.
    In { field: String, values: Vec<Value> },
    /// String-list field contains the element.
    Contains { field: String, element: String },
    /// String field starts with the prefix.
    BeginsWith { field: String, prefix: String },
    And(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    pub fn contains(field: impl Into<String>, element: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            element: element.into(),
        }
    }

    pub fn begins_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Predicate::BeginsWith {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// Conjunction with another predicate, flattening nested `And`s.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluate against a record.
    ///
    /// A comparison on an attribute the record does not hold is false,
    /// including `Ne`.
    pub fn matches(&self, record: &Record) -> bool {
        self.evaluate(&|field| record.get(field))
    }

    fn evaluate<'a>(&self, lookup: &dyn Fn(&str) -> Option<&'a Value>) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Compare { field, op, value } => {
                let Some(actual) = lookup(field) else {
                    return false;
                };
                compare_values(actual, *op, value)
            }
            Predicate::In { field, values } => {
                let Some(actual) = lookup(field) else {
                    return false;
                };
                values.iter().any(|v| actual.matches(v))
            }
            Predicate::Contains { field, element } => lookup(field)
                .and_then(Value::as_string_list)
                .is_some_and(|list| list.iter().any(|item| item == element)),
            Predicate::BeginsWith { field, prefix } => lookup(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Predicate::And(parts) => parts.iter().all(|p| p.evaluate(lookup)),
            Predicate::Not(inner) => !inner.evaluate(lookup),
        }
    }
}

fn compare_values(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    let ordering = actual.compare(expected);
    match op {
        CompareOp::Eq => actual.matches(expected),
        CompareOp::Ne => !actual.matches(expected),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}
