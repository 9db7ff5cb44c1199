//! Domain error type shared across layers.

use crate::outbox::OutboxError;
use crate::transaction::TransactionError;

/// Error type for catalog operations.
///
/// The interface layer maps these onto gRPC status codes once, at the
/// facade boundary; everything below propagates them unwrapped.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("author not found")]
    AuthorNotFound,

    #[error("book not found")]
    BookNotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("outbox error: {0}")]
    Outbox(#[from] OutboxError),
}

impl DomainError {
    /// True for the lookup-miss variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::AuthorNotFound | DomainError::BookNotFound)
    }
}
