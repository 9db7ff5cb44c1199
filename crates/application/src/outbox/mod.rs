//! Outbox dispatch: handler resolution and the worker pool.

mod dispatcher;

#[cfg(test)]
mod tests;

pub use dispatcher::{DispatcherSettings, OutboxDispatcher};
