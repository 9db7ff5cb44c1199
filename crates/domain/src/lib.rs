//! Domain layer for the catalog service.
//!
//! Holds the entities, the repository and outbox ports, and the
//! transaction session that ties a unit of work together. Adapters live in
//! `catalog-infrastructure`; use cases in `catalog-application`.

pub mod entity;
pub mod error;
pub mod outbox;
pub mod repository;
pub mod transaction;

pub use entity::{Author, Book};
pub use error::DomainError;
pub use outbox::{
    HandlerError, HandlerRegistry, KindHandler, OutboxError, OutboxKind, OutboxMessage,
    OutboxStore,
};
pub use repository::{AuthorRepository, BookRepository};
pub use transaction::{with_tx, TransactionError, Transactor, TxSession};
