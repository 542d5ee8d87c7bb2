use rust_decimal::Decimal;
use stockbook_ledger::LedgerError;
use thiserror::Error;

/// Result alias for posting and master-data operations.
pub type PostingResult<T> = Result<T, PostingError>;

/// Failures a posting request can end in.
#[derive(Debug, Error)]
pub enum PostingError {
    #[error("caller identity is required")]
    Unauthorized,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },
    /// Storage failure; the atomic unit, if started, was rolled back.
    #[error("server error: {0}")]
    Server(#[from] LedgerError),
}

impl PostingError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True when the store was busy and the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server(err) if err.is_transient())
    }

    /// True for server-side failures, false for rejections of the request.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_storage_is_transient() {
        let busy = PostingError::from(LedgerError::Busy("database is locked".into()));
        assert!(busy.is_transient());
        assert!(busy.is_server());
        let storage = PostingError::from(LedgerError::Storage("disk I/O error".into()));
        assert!(!storage.is_transient());
        assert!(!PostingError::Unauthorized.is_server());
    }

    #[test]
    fn not_found_names_entity() {
        let err = PostingError::not_found("supplier", "s-9");
        assert_eq!(err.to_string(), "supplier s-9 not found");
    }
}
