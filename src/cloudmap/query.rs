//! Queries, sort order and paging.
//!
//! A query names an entity, a [`Predicate`] and a sort order. The store returns
//! at most one page per request; when more results remain it hands out a
//! [`QueryCursor`], an opaque token valid for exactly one continuation.

use crate::fields::Predicate;
use crate::model::Record;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: true,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: false,
        }
    }
}

/// Store-issued continuation token. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryCursor(String);

impl QueryCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub record_type: String,
    pub predicate: Predicate,
    pub sort: Vec<SortDescriptor>,
}

impl Query {
    /// A missing predicate matches every record of the type.
    pub fn new(
        record_type: impl Into<String>,
        predicate: Option<Predicate>,
        sort: &[SortDescriptor],
    ) -> Self {
        Self {
            record_type: record_type.into(),
            predicate: predicate.unwrap_or(Predicate::All),
            sort: sort.to_vec(),
        }
    }
}

/// What a single query request asks the store to do.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperation {
    Start {
        query: Query,
        results_limit: Option<usize>,
    },
    Continue {
        cursor: QueryCursor,
        results_limit: Option<usize>,
    },
}

impl QueryOperation {
    pub fn results_limit(&self) -> Option<usize> {
        match self {
            QueryOperation::Start { results_limit, .. }
            | QueryOperation::Continue { results_limit, .. } => *results_limit,
        }
    }
}

/// One page of results plus the cursor for the next one, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<QueryCursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, cursor: Option<QueryCursor>) -> Self {
        Self { items, cursor }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Order records by the sort descriptors, in priority order.
///
/// Records missing a sort key come first in ascending order. Present values
/// compare by [`Value::sort_order`](crate::fields::Value::sort_order), a
/// total order over mixed kinds and NaN.
pub fn compare_records(a: &Record, b: &Record, sort: &[SortDescriptor]) -> Ordering {
    for descriptor in sort {
        let ordering = match (a.get(&descriptor.key), b.get(&descriptor.key)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.sort_order(y),
        };
        let ordering = if descriptor.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
