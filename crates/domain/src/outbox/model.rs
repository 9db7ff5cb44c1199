//! Outbox event model.

use crate::transaction::TransactionError;

/// Tag selecting the handler that interprets an outbox payload.
///
/// `Undefined` is reserved: well-behaved producers never write it, and the
/// dispatcher reports handler resolution failure when it shows up (for
/// instance through row corruption or a forward-compat stub).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutboxKind {
    Undefined,
    Book,
    Author,
}

impl OutboxKind {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxKind::Book => "book",
            OutboxKind::Author => "author",
            OutboxKind::Undefined => "undefined",
        }
    }

    /// Parse a stored tag. Unknown tags load as `Undefined` so corrupt
    /// rows surface as handler-resolution failures instead of being
    /// silently dropped.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "book" => OutboxKind::Book,
            "author" => OutboxKind::Author,
            _ => OutboxKind::Undefined,
        }
    }
}

impl std::fmt::Display for OutboxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for outbox operations.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported outbox kind: {0}")]
    UnsupportedKind(OutboxKind),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("store error: {message}")]
    Store { message: String },
}

/// A leased outbox record handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub idempotency_key: String,
    pub kind: OutboxKind,
    pub payload: Vec<u8>,
    /// Number of leases taken on the record so far, this one included.
    pub attempts: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        for kind in [OutboxKind::Book, OutboxKind::Author] {
            assert_eq!(OutboxKind::from_tag(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_tag_loads_as_undefined() {
        assert_eq!(OutboxKind::from_tag("provider"), OutboxKind::Undefined);
        assert_eq!(OutboxKind::from_tag(""), OutboxKind::Undefined);
    }

    #[test]
    fn kind_display_matches_stored_tag() {
        assert_eq!(OutboxKind::Book.to_string(), "book");
        assert_eq!(OutboxKind::Author.to_string(), "author");
        assert_eq!(OutboxKind::Undefined.to_string(), "undefined");
    }

    #[test]
    fn unsupported_kind_error_names_the_kind() {
        let err = OutboxError::UnsupportedKind(OutboxKind::Undefined);
        assert!(err.to_string().contains("undefined"));
    }
}
