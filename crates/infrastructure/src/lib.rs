//! Infrastructure adapters: PostgreSQL persistence and HTTP event sinks.

pub mod persistence;
pub mod sinks;

pub use persistence::{PgTransactor, PostgresCatalogRepository, PostgresOutboxStore};
pub use sinks::{AuthorSinkHandler, BookSinkHandler, StaticHandlerRegistry};
