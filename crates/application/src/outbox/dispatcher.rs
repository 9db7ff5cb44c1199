//! Outbox dispatcher.
//!
//! A pool of workers, each running a serial lease/dispatch/acknowledge
//! loop against the outbox store. Workers share nothing in process; they
//! contend at lease time, where skip-locked selection keeps their batches
//! disjoint. Delivery is at-least-once: anything not acknowledged comes
//! back after the in-progress TTL.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use catalog_domain::{DomainError, HandlerRegistry, OutboxStore, Transactor};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// When false, `start` returns without spawning any workers.
    pub enabled: bool,
    /// Number of parallel workers.
    pub workers: usize,
    /// Maximum records leased per batch.
    pub batch_size: usize,
    /// Inter-poll sleep when idle or after an error.
    pub wait_time: Duration,
    /// Lease duration before a leased record becomes eligible again.
    pub in_progress_ttl: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            workers: 4,
            batch_size: 50,
            wait_time: Duration::from_millis(500),
            in_progress_ttl: Duration::from_secs(30),
        }
    }
}

/// Background worker pool relaying outbox records to their handlers.
#[derive(Clone)]
pub struct OutboxDispatcher {
    transactor: Arc<dyn Transactor>,
    store: Arc<dyn OutboxStore>,
    registry: Arc<dyn HandlerRegistry>,
    settings: DispatcherSettings,
}

impl OutboxDispatcher {
    pub fn new(
        transactor: Arc<dyn Transactor>,
        store: Arc<dyn OutboxStore>,
        registry: Arc<dyn HandlerRegistry>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            transactor,
            store,
            registry,
            settings,
        }
    }

    /// Spawn the worker pool and block until `shutdown` is cancelled and
    /// every worker has drained. Returns immediately when disabled.
    pub async fn start(&self, shutdown: CancellationToken) {
        if !self.settings.enabled {
            info!("outbox dispatcher is disabled");
            return;
        }

        info!(
            workers = self.settings.workers,
            batch_size = self.settings.batch_size,
            "starting outbox dispatcher"
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.settings.workers {
            let dispatcher = self.clone();
            let shutdown = shutdown.clone();
            workers.spawn(async move { dispatcher.run_worker(worker_id, shutdown).await });
        }

        while workers.join_next().await.is_some() {}
        info!("outbox dispatcher stopped");
    }

    async fn run_worker(&self, worker_id: usize, shutdown: CancellationToken) {
        debug!(worker_id, "outbox worker started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            // Fast-drain: skip the inter-poll sleep only after a full,
            // cleanly committed batch.
            let idle = match self.run_batch(&shutdown).await {
                Ok(drained_full_batch) => !drained_full_batch,
                Err(error) => {
                    warn!(worker_id, error = %error, "outbox batch failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.wait_time) => {}
                }
            }
        }

        debug!(worker_id, "outbox worker stopped");
    }

    /// One lease/dispatch/acknowledge cycle inside its own transaction.
    ///
    /// Returns whether a full batch was leased and committed. Dropping the
    /// session on any error path rolls the transaction back; leased rows
    /// then recover through the in-progress TTL.
    async fn run_batch(&self, shutdown: &CancellationToken) -> Result<bool, DomainError> {
        let mut session = self
            .transactor
            .begin()
            .await
            .map_err(DomainError::Transaction)?;

        let batch = self
            .store
            .lease(
                &mut session,
                self.settings.batch_size,
                self.settings.in_progress_ttl,
            )
            .await?;

        if batch.is_empty() {
            session.commit().await.map_err(DomainError::Transaction)?;
            return Ok(false);
        }

        let mut processed = Vec::with_capacity(batch.len());
        for message in &batch {
            if shutdown.is_cancelled() {
                break;
            }

            let handler = match self.registry.resolve(message.kind) {
                Ok(handler) => handler,
                Err(error) => {
                    warn!(
                        idempotency_key = %message.idempotency_key,
                        kind = %message.kind,
                        error = %error,
                        "no handler for outbox kind, leaving record for retry"
                    );
                    continue;
                }
            };

            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = handler.handle(&message.payload) => outcome,
            };

            match outcome {
                Ok(()) => processed.push(message.idempotency_key.clone()),
                Err(error) => {
                    debug!(
                        idempotency_key = %message.idempotency_key,
                        attempts = message.attempts,
                        error = %error,
                        "handler failed, record retries after lease expiry"
                    );
                }
            }
        }

        self.store.acknowledge(&mut session, &processed).await?;

        // Committing also persists the lease stamps of skipped records,
        // so poison records are paced by the TTL instead of spinning.
        session.commit().await.map_err(DomainError::Transaction)?;

        Ok(batch.len() >= self.settings.batch_size)
    }
}
