//! Library use cases.
//!
//! Write use cases compose a domain write with an outbox enqueue inside a
//! single unit of work; reads and self-contained updates go straight to
//! the repositories.

mod authors;
mod books;


use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use catalog_domain::{Author, AuthorRepository, Book, BookRepository, DomainError, OutboxStore, Transactor};

#[async_trait]
pub trait AuthorUseCase: Send + Sync {
    async fn register_author(&self, name: String) -> Result<Author, DomainError>;
    async fn change_author_info(&self, id: Uuid, name: String) -> Result<Author, DomainError>;
    async fn get_author_info(&self, id: Uuid) -> Result<Author, DomainError>;
    async fn get_author_books(&self, id: Uuid) -> Result<Vec<Book>, DomainError>;
}

#[async_trait]
pub trait BookUseCase: Send + Sync {
    async fn add_book(&self, name: String, author_ids: Vec<Uuid>) -> Result<Book, DomainError>;
    async fn update_book(
        &self,
        id: Uuid,
        name: String,
        author_ids: Vec<Uuid>,
    ) -> Result<Book, DomainError>;
    async fn get_book_info(&self, id: Uuid) -> Result<Book, DomainError>;
}

/// Implements the author and book use cases over the domain ports.
pub struct LibraryService {
    transactor: Arc<dyn Transactor>,
    outbox: Arc<dyn OutboxStore>,
    authors: Arc<dyn AuthorRepository>,
    books: Arc<dyn BookRepository>,
}

impl LibraryService {
    pub fn new(
        transactor: Arc<dyn Transactor>,
        outbox: Arc<dyn OutboxStore>,
        authors: Arc<dyn AuthorRepository>,
        books: Arc<dyn BookRepository>,
    ) -> Self {
        Self {
            transactor,
            outbox,
            authors,
            books,
        }
    }
}
