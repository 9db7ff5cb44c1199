//! PostgreSQL persistence adapters.

pub mod outbox;
pub mod postgres;
pub mod transactor;

pub use outbox::PostgresOutboxStore;
pub use postgres::PostgresCatalogRepository;
pub use transactor::PgTransactor;
