//! Book use cases.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use catalog_domain::{with_tx, Book, DomainError, OutboxKind};

use super::{BookUseCase, LibraryService};

#[async_trait]
impl BookUseCase for LibraryService {
    async fn add_book(&self, name: String, author_ids: Vec<Uuid>) -> Result<Book, DomainError> {
        info!("adding book");

        let book = with_tx(self.transactor.as_ref(), |mut session| async move {
            let book = self
                .books
                .add_book(&mut session, &name, &author_ids)
                .await?;

            let payload = serde_json::to_vec(&book)?;
            let key = format!("{}_{}", OutboxKind::Book, book.id);
            self.outbox
                .enqueue(&mut session, &key, OutboxKind::Book, &payload)
                .await?;

            Ok((session, book))
        })
        .await?;

        Ok(book)
    }

    async fn update_book(
        &self,
        id: Uuid,
        name: String,
        author_ids: Vec<Uuid>,
    ) -> Result<Book, DomainError> {
        info!(book_id = %id, "updating book");
        self.books.update_book(id, &name, &author_ids).await
    }

    async fn get_book_info(&self, id: Uuid) -> Result<Book, DomainError> {
        self.books.get_book_info(id).await
    }
}
