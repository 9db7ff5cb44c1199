//! Catalog service facade.
//!
//! Validates transport input, delegates to the use cases, and maps domain
//! errors to gRPC status codes exactly once: invalid input becomes
//! `InvalidArgument`, lookup misses become `NotFound`, everything else is
//! `Internal`.

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream};
use tonic::{Request, Response, Status};
use tracing::error;
use uuid::Uuid;

use catalog_application::{AuthorUseCase, BookUseCase};
use catalog_domain::{Book, DomainError};
use catalog_proto::catalog_server::Catalog;
use catalog_proto::{
    AddBookRequest, AddBookResponse, ChangeAuthorInfoRequest, ChangeAuthorInfoResponse,
    GetAuthorBooksRequest, GetAuthorInfoRequest, GetAuthorInfoResponse, GetBookInfoRequest,
    GetBookInfoResponse, RegisterAuthorRequest, RegisterAuthorResponse, UpdateBookRequest,
    UpdateBookResponse,
};

pub struct CatalogService {
    authors: Arc<dyn AuthorUseCase>,
    books: Arc<dyn BookUseCase>,
}

impl CatalogService {
    pub fn new(authors: Arc<dyn AuthorUseCase>, books: Arc<dyn BookUseCase>) -> Self {
        Self { authors, books }
    }
}

fn into_status(err: DomainError) -> Status {
    if err.is_not_found() {
        return Status::not_found(err.to_string());
    }
    error!(error = %err, "request failed");
    Status::internal(err.to_string())
}

fn parse_id(field: &str, value: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(value)
        .map_err(|_| Status::invalid_argument(format!("{field} must be a valid uuid")))
}

fn require_name(name: &str) -> Result<(), Status> {
    if name.trim().is_empty() {
        return Err(Status::invalid_argument("name must not be empty"));
    }
    Ok(())
}

fn to_timestamp(at: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

fn to_proto_book(book: &Book) -> catalog_proto::Book {
    catalog_proto::Book {
        id: book.id.to_string(),
        name: book.name.clone(),
        author_ids: book.author_ids.iter().map(Uuid::to_string).collect(),
        created_at: Some(to_timestamp(book.created_at)),
        updated_at: Some(to_timestamp(book.updated_at)),
    }
}

#[tonic::async_trait]
impl Catalog for CatalogService {
    async fn add_book(
        &self,
        request: Request<AddBookRequest>,
    ) -> Result<Response<AddBookResponse>, Status> {
        let request = request.into_inner();
        require_name(&request.name)?;
        if request.author_ids.is_empty() {
            return Err(Status::invalid_argument("author_ids must not be empty"));
        }
        let author_ids = request
            .author_ids
            .iter()
            .map(|id| parse_id("author_ids", id))
            .collect::<Result<Vec<_>, _>>()?;

        let book = self
            .books
            .add_book(request.name, author_ids)
            .await
            .map_err(into_status)?;

        Ok(Response::new(AddBookResponse {
            book: Some(to_proto_book(&book)),
        }))
    }

    async fn update_book(
        &self,
        request: Request<UpdateBookRequest>,
    ) -> Result<Response<UpdateBookResponse>, Status> {
        let request = request.into_inner();
        let id = parse_id("id", &request.id)?;
        require_name(&request.name)?;
        let author_ids = request
            .author_ids
            .iter()
            .map(|id| parse_id("author_ids", id))
            .collect::<Result<Vec<_>, _>>()?;

        self.books
            .update_book(id, request.name, author_ids)
            .await
            .map_err(into_status)?;

        Ok(Response::new(UpdateBookResponse {}))
    }

    async fn get_book_info(
        &self,
        request: Request<GetBookInfoRequest>,
    ) -> Result<Response<GetBookInfoResponse>, Status> {
        let id = parse_id("id", &request.into_inner().id)?;

        let book = self.books.get_book_info(id).await.map_err(into_status)?;

        Ok(Response::new(GetBookInfoResponse {
            book: Some(to_proto_book(&book)),
        }))
    }

    async fn register_author(
        &self,
        request: Request<RegisterAuthorRequest>,
    ) -> Result<Response<RegisterAuthorResponse>, Status> {
        let request = request.into_inner();
        require_name(&request.name)?;

        let author = self
            .authors
            .register_author(request.name)
            .await
            .map_err(into_status)?;

        Ok(Response::new(RegisterAuthorResponse {
            id: author.id.to_string(),
        }))
    }

    async fn change_author_info(
        &self,
        request: Request<ChangeAuthorInfoRequest>,
    ) -> Result<Response<ChangeAuthorInfoResponse>, Status> {
        let request = request.into_inner();
        let id = parse_id("id", &request.id)?;
        require_name(&request.name)?;

        self.authors
            .change_author_info(id, request.name)
            .await
            .map_err(into_status)?;

        Ok(Response::new(ChangeAuthorInfoResponse {}))
    }

    async fn get_author_info(
        &self,
        request: Request<GetAuthorInfoRequest>,
    ) -> Result<Response<GetAuthorInfoResponse>, Status> {
        let id = parse_id("id", &request.into_inner().id)?;

        let author = self
            .authors
            .get_author_info(id)
            .await
            .map_err(into_status)?;

        Ok(Response::new(GetAuthorInfoResponse {
            id: author.id.to_string(),
            name: author.name,
        }))
    }

    type GetAuthorBooksStream =
        Pin<Box<dyn Stream<Item = Result<catalog_proto::Book, Status>> + Send>>;

    async fn get_author_books(
        &self,
        request: Request<GetAuthorBooksRequest>,
    ) -> Result<Response<Self::GetAuthorBooksStream>, Status> {
        let id = parse_id("author_id", &request.into_inner().author_id)?;

        let books = self
            .authors
            .get_author_books(id)
            .await
            .map_err(into_status)?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for book in &books {
                if tx.send(Ok(to_proto_book(book))).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}
