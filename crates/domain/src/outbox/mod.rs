//! Transactional outbox: model, store port, and handler ports.

pub mod handler;
pub mod model;
pub mod repository;

pub use handler::{HandlerError, HandlerRegistry, KindHandler};
pub use model::{OutboxError, OutboxKind, OutboxMessage};
pub use repository::OutboxStore;
