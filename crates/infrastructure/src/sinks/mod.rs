//! HTTP event sinks for dispatched outbox records.

pub mod http;

pub use http::{AuthorSinkHandler, BookSinkHandler, StaticHandlerRegistry};
