//! Handler ports for outbox dispatch.
//!
//! The dispatcher never matches on kinds itself: it resolves each leased
//! record through a [`HandlerRegistry`] and invokes the resulting
//! [`KindHandler`]. Adding a kind means adding a registry entry and its
//! handler.

use std::sync::Arc;

use async_trait::async_trait;

use crate::outbox::model::{OutboxError, OutboxKind};

/// Error type for kind handlers.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("sink rejected event: {message}")]
    Sink { message: String },

    #[error("transport error: {message}")]
    Transport { message: String },
}

/// Consumes a payload and performs the externally visible effect.
///
/// Handlers are invoked at least once per event and MUST tolerate replay:
/// an acknowledged batch whose commit is lost is re-leased after the
/// in-progress TTL.
#[async_trait]
pub trait KindHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError>;
}

/// Resolves an event kind to its handler.
///
/// Resolution is synchronous and cheap; it fails for unrecognized kinds,
/// including the reserved [`OutboxKind::Undefined`].
pub trait HandlerRegistry: Send + Sync {
    fn resolve(&self, kind: OutboxKind) -> Result<Arc<dyn KindHandler>, OutboxError>;
}
