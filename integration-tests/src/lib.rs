//! Integration tests for the threadlog crate
//!
//! These exercise the full path a request-scoped trace takes: contexts are
//! entered and abandoned, anchors are associated as execution proceeds, and
//! the fragments are reconciled into one trace at completion.

#![allow(unused_imports)] // Allow unused imports in integration tests

pub mod request_lifecycle;
pub mod trace_reconciliation;

/// Common test utilities for integration tests
pub mod test_utils {
    use std::sync::Arc;
    use threadlog::{BufferSink, InMemoryContextProvider, LoggerConfig, ThreadLogger};

    /// A logger wired to an in-memory provider and a buffering sink, with
    /// handles to both.
    pub fn test_logger() -> (ThreadLogger, Arc<InMemoryContextProvider>, Arc<BufferSink>) {
        let provider = Arc::new(InMemoryContextProvider::new());
        let sink = Arc::new(BufferSink::new());
        let logger = ThreadLogger::with_provider(LoggerConfig::default(), provider.clone())
            .expect("default config is valid")
            .with_sink(sink.clone());
        (logger, provider, sink)
    }
}
