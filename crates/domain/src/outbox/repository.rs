//! Outbox store port.

use std::time::Duration;

use async_trait::async_trait;

use crate::outbox::model::{OutboxError, OutboxKind, OutboxMessage};
use crate::transaction::TxSession;

/// Persistent queue of pending events with leasing semantics.
///
/// All operations run against the caller's session so producers are atomic
/// with their business writes and the dispatcher holds its lease locks
/// until commit.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Insert an event row inside the caller's transaction.
    ///
    /// A duplicate `idempotency_key` is a silent no-op: a same-key replay
    /// is a producer retry, never a second row. Enqueuing
    /// [`OutboxKind::Undefined`] is a programming error and fails before
    /// touching the store.
    async fn enqueue(
        &self,
        session: &mut TxSession,
        idempotency_key: &str,
        kind: OutboxKind,
        payload: &[u8],
    ) -> Result<(), OutboxError>;

    /// Atomically claim up to `batch_size` eligible records, oldest first.
    ///
    /// A record is eligible when it has not been processed and either was
    /// never leased or its previous lease is older than `in_progress_ttl`.
    /// Selection locks rows with skip-locked semantics so concurrent
    /// leasers obtain disjoint batches. Returns an empty batch when
    /// nothing is eligible.
    async fn lease(
        &self,
        session: &mut TxSession,
        batch_size: usize,
        in_progress_ttl: Duration,
    ) -> Result<Vec<OutboxMessage>, OutboxError>;

    /// Mark the listed keys processed. Unknown or already-processed keys
    /// are ignored; the operation is idempotent.
    async fn acknowledge(
        &self,
        session: &mut TxSession,
        idempotency_keys: &[String],
    ) -> Result<(), OutboxError>;
}
