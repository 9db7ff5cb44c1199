//! Repository ports for the catalog entities.
//!
//! Methods that must be atomic with an outbox enqueue take a [`TxSession`]
//! and enlist in the caller's unit of work. Reads and self-contained
//! updates run against the pool directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::{Author, Book};
use crate::error::DomainError;
use crate::transaction::TxSession;

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Insert a new author inside the caller's transaction.
    async fn register_author(
        &self,
        session: &mut TxSession,
        name: &str,
    ) -> Result<Author, DomainError>;

    /// Rename an existing author. Fails with `AuthorNotFound` when the id
    /// is unknown.
    async fn change_author_info(&self, id: Uuid, name: &str) -> Result<Author, DomainError>;

    async fn get_author_info(&self, id: Uuid) -> Result<Author, DomainError>;

    /// All books carrying the author. Cross-book ordering is unspecified.
    async fn get_author_books(&self, id: Uuid) -> Result<Vec<Book>, DomainError>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book and its author relations inside the caller's
    /// transaction. An unknown author id fails with `AuthorNotFound`.
    async fn add_book(
        &self,
        session: &mut TxSession,
        name: &str,
        author_ids: &[Uuid],
    ) -> Result<Book, DomainError>;

    /// Rename a book and replace its author set. Runs in its own
    /// repository-managed transaction.
    async fn update_book(
        &self,
        id: Uuid,
        name: &str,
        author_ids: &[Uuid],
    ) -> Result<Book, DomainError>;

    async fn get_book_info(&self, id: Uuid) -> Result<Book, DomainError>;
}
