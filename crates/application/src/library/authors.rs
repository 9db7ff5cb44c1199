//! Author use cases.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use catalog_domain::{with_tx, Author, Book, DomainError, OutboxKind};

use super::{AuthorUseCase, LibraryService};

#[async_trait]
impl AuthorUseCase for LibraryService {
    async fn register_author(&self, name: String) -> Result<Author, DomainError> {
        info!("registering author");

        let author = with_tx(self.transactor.as_ref(), |mut session| async move {
            let author = self.authors.register_author(&mut session, &name).await?;

            let payload = serde_json::to_vec(&author)?;
            let key = format!("{}_{}", OutboxKind::Author, author.id);
            self.outbox
                .enqueue(&mut session, &key, OutboxKind::Author, &payload)
                .await?;

            Ok((session, author))
        })
        .await?;

        Ok(author)
    }

    async fn change_author_info(&self, id: Uuid, name: String) -> Result<Author, DomainError> {
        info!(author_id = %id, "changing author info");
        self.authors.change_author_info(id, &name).await
    }

    async fn get_author_info(&self, id: Uuid) -> Result<Author, DomainError> {
        self.authors.get_author_info(id).await
    }

    async fn get_author_books(&self, id: Uuid) -> Result<Vec<Book>, DomainError> {
        self.authors.get_author_books(id).await
    }
}
