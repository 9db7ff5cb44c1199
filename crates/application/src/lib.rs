//! Application layer: use cases and the outbox dispatcher.

pub mod library;
pub mod outbox;

pub use library::{AuthorUseCase, BookUseCase, LibraryService};
pub use outbox::{DispatcherSettings, OutboxDispatcher};
