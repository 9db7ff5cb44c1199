//! Transaction session and the transactor port.
//!
//! A use case obtains a [`TxSession`] from the [`Transactor`] and threads
//! it through every repository call that must join the same unit of work.
//! [`with_tx`] scopes the session: commit when the body succeeds, rollback
//! (via drop) when it fails.

use std::future::Future;

use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, Transaction};

use crate::error::DomainError;

/// Error type for transaction handling.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no transaction is active on this session")]
    NotActive,
}

/// A unit-of-work handle passed through repositories.
///
/// Wraps a live PostgreSQL transaction. A *detached* session carries no
/// transaction; test doubles hand one out so ports can be exercised
/// without a database, and `conn()` on it fails with
/// [`TransactionError::NotActive`].
pub struct TxSession {
    tx: Option<Transaction<'static, Postgres>>,
}

impl TxSession {
    /// Wrap a live transaction.
    pub fn active(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A session with no backing transaction.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    /// Borrow the underlying connection for query execution.
    pub fn conn(&mut self) -> Result<&mut PgConnection, TransactionError> {
        self.tx.as_deref_mut().ok_or(TransactionError::NotActive)
    }

    /// Commit the unit of work. A detached session commits trivially.
    pub async fn commit(mut self) -> Result<(), TransactionError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Roll the unit of work back. Dropping the session has the same
    /// effect; this variant surfaces the error.
    pub async fn rollback(mut self) -> Result<(), TransactionError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

/// Port for opening units of work.
#[async_trait]
pub trait Transactor: Send + Sync {
    async fn begin(&self) -> Result<TxSession, TransactionError>;
}

/// Run `body` inside a fresh transaction.
///
/// The body takes ownership of the session and returns it alongside its
/// result; on success the session is committed, the body's error wins over
/// any commit error, and an erroring body rolls back by dropping the
/// session. Exactly one commit or rollback happens per call. Nested
/// composition passes the same session down instead of re-entering
/// `with_tx`.
pub async fn with_tx<F, Fut, T>(transactor: &dyn Transactor, body: F) -> Result<T, DomainError>
where
    F: FnOnce(TxSession) -> Fut + Send,
    Fut: Future<Output = Result<(TxSession, T), DomainError>> + Send,
    T: Send,
{
    let session = transactor.begin().await.map_err(DomainError::Transaction)?;
    let (session, value) = body(session).await?;
    session.commit().await.map_err(DomainError::Transaction)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DetachedTransactor;

    #[async_trait]
    impl Transactor for DetachedTransactor {
        async fn begin(&self) -> Result<TxSession, TransactionError> {
            Ok(TxSession::detached())
        }
    }

    #[tokio::test]
    async fn detached_session_has_no_connection() {
        let mut session = TxSession::detached();
        assert!(!session.is_active());
        assert!(matches!(session.conn(), Err(TransactionError::NotActive)));
    }

    #[tokio::test]
    async fn with_tx_returns_body_value() {
        let out = with_tx(&DetachedTransactor, |session| async move {
            Ok((session, 42))
        })
        .await
        .unwrap();

        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn with_tx_propagates_body_error() {
        let err = with_tx::<_, _, ()>(&DetachedTransactor, |session| async move {
            drop(session);
            Err(DomainError::BookNotFound)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::BookNotFound));
    }

    #[tokio::test]
    async fn detached_commit_is_a_noop() {
        TxSession::detached().commit().await.unwrap();
        TxSession::detached().rollback().await.unwrap();
    }
}
