//! HTTP sink handlers.
//!
//! Each handler deserializes its entity payload and POSTs the entity id as
//! `text/plain` to a configured sink URL. A status of 400 or above is a
//! handler failure; retries are driven purely by lease expiry, so the
//! deliveries must stay idempotent on the sink side.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;
use uuid::Uuid;

use catalog_domain::{
    Author, Book, HandlerError, HandlerRegistry, KindHandler, OutboxError, OutboxKind,
};

async fn send_id(client: &Client, url: &str, id: Uuid) -> Result<(), HandlerError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "text/plain")
        .body(id.to_string())
        .send()
        .await
        .map_err(|err| HandlerError::Transport {
            message: err.to_string(),
        })?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(HandlerError::Sink {
            message: format!("http error: {status}"),
        });
    }

    debug!(%id, url, "delivered entity id to sink");
    Ok(())
}

/// Delivers `book` events to the book sink.
pub struct BookSinkHandler {
    client: Client,
    url: String,
}

impl BookSinkHandler {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl KindHandler for BookSinkHandler {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let book: Book = serde_json::from_slice(payload)?;
        send_id(&self.client, &self.url, book.id).await
    }
}

/// Delivers `author` events to the author sink.
pub struct AuthorSinkHandler {
    client: Client,
    url: String,
}

impl AuthorSinkHandler {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl KindHandler for AuthorSinkHandler {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let author: Author = serde_json::from_slice(payload)?;
        send_id(&self.client, &self.url, author.id).await
    }
}

/// The closed kind-to-handler mapping of this service.
pub struct StaticHandlerRegistry {
    book: Arc<dyn KindHandler>,
    author: Arc<dyn KindHandler>,
}

impl StaticHandlerRegistry {
    /// Build the registry over a shared, connection-pooled client.
    pub fn new(client: Client, book_url: String, author_url: String) -> Self {
        Self {
            book: Arc::new(BookSinkHandler::new(client.clone(), book_url)),
            author: Arc::new(AuthorSinkHandler::new(client, author_url)),
        }
    }
}

impl HandlerRegistry for StaticHandlerRegistry {
    fn resolve(&self, kind: OutboxKind) -> Result<Arc<dyn KindHandler>, OutboxError> {
        match kind {
            OutboxKind::Book => Ok(self.book.clone()),
            OutboxKind::Author => Ok(self.author.clone()),
            OutboxKind::Undefined => Err(OutboxError::UnsupportedKind(kind)),
        }
    }
}
