use crate::model::RecordId;
use std::fmt;
use thiserror::Error;

/// Failure categories reported by a remote store.
///
/// The core never produces these itself (apart from the in-memory store);
/// they travel up every layer untouched inside [`CloudError::Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    NetworkUnavailable,
    NotAuthenticated,
    QuotaExceeded,
    /// The record changed on the server since it was last fetched.
    ServerRecordChanged,
    /// The store has no item with the requested identifier.
    UnknownItem,
    InvalidArguments,
    ServiceUnavailable,
    Internal,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StoreErrorKind::NetworkUnavailable => "network unavailable",
            StoreErrorKind::NotAuthenticated => "not authenticated",
            StoreErrorKind::QuotaExceeded => "quota exceeded",
            StoreErrorKind::ServerRecordChanged => "server record changed",
            StoreErrorKind::UnknownItem => "unknown item",
            StoreErrorKind::InvalidArguments => "invalid arguments",
            StoreErrorKind::ServiceUnavailable => "service unavailable",
            StoreErrorKind::Internal => "internal error",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid record identifier")]
    InvalidRecordId,

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Store error ({kind}): {message}")]
    Store {
        kind: StoreErrorKind,
        message: String,
    },

    #[error("Could not build a {0} from the store response")]
    Materialization(String),

    #[error("Field '{field}' of {entity} uses a reserved key")]
    ReservedField { entity: String, field: String },

    #[error("Field '{field}' is declared twice on {entity}")]
    DuplicateField { entity: String, field: String },

    #[error("Entity name '{name}' is already used by {existing}")]
    EntityNameCollision { name: String, existing: String },

    #[error("Main context is no longer running")]
    MainContextClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    pub fn store(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        CloudError::Store {
            kind,
            message: message.into(),
        }
    }

    /// The store kind, when this error came from the store.
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            CloudError::Store { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for both the locally detected and the store-reported "no such record".
    ///
    /// Callers that want delete to behave idempotently can treat this as success.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::RecordNotFound(_)
                | CloudError::Store {
                    kind: StoreErrorKind::UnknownItem,
                    ..
                }
        )
    }

    /// Precondition failures are raised before any request reaches the store.
    pub fn is_precondition(&self) -> bool {
        matches!(self, CloudError::InvalidRecordId)
    }
}

impl From<confique::Error> for CloudError {
    fn from(err: confique::Error) -> Self {
        CloudError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ZoneId;

    #[test]
    fn test_not_found_covers_local_and_store_variants() {
        let local = CloudError::RecordNotFound(RecordId::new("R1", ZoneId::default()));
        let remote = CloudError::store(StoreErrorKind::UnknownItem, "gone");
        let other = CloudError::store(StoreErrorKind::QuotaExceeded, "full");

        assert!(local.is_not_found());
        assert!(remote.is_not_found());
        assert!(!other.is_not_found());
    }

    #[test]
    fn test_store_message_includes_kind() {
        let err = CloudError::store(StoreErrorKind::NotAuthenticated, "no account");
        assert_eq!(
            err.to_string(),
            "Store error (not authenticated): no account"
        );
        assert_eq!(err.store_kind(), Some(StoreErrorKind::NotAuthenticated));
    }

    #[test]
    fn test_only_invalid_id_is_a_precondition() {
        assert!(CloudError::InvalidRecordId.is_precondition());
        assert!(!CloudError::MainContextClosed.is_precondition());
    }
}
