//! Operation-scoped logging with context correlation and trace reconciliation
//!
//! In a cooperatively scheduled asynchronous runtime one logical operation
//! (say, an inbound request) executes across several discontinuous scopes.
//! Context propagation is usually automatic, but some asynchronous
//! boundaries lose it and the runtime silently starts a fresh context
//! mid-operation, fragmenting what should be one coherent trace.
//!
//! This crate keeps those fragments recoverable:
//! - an anchor ↔ context association graph links a stable per-operation
//!   anchor to every context the operation passed through
//!   ([`AnchorContextGraph`]);
//! - each context accumulates its logs and timers in a
//!   [`ContextLogGrouping`];
//! - at operation completion the [`Reconciler`] walks the connected
//!   component and folds the fragments into one time-ordered trace.
//!
//! The [`ThreadLogger`] facade wires these together behind a level-filtered
//! logging API with named timers.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use threadlog::{AnchorId, InMemoryContextProvider, LoggerConfig, ThreadLogger};
//!
//! # fn main() -> threadlog::Result<()> {
//! let provider = Arc::new(InMemoryContextProvider::new());
//! let logger = ThreadLogger::with_provider(LoggerConfig::default(), provider.clone())?;
//! let request = AnchorId::new();
//!
//! // First continuation of the request.
//! provider.begin();
//! logger.associate(request)?;
//! logger.info("accepted")?;
//! provider.exit();
//!
//! // Propagation broke; the request resumes in a fresh context.
//! provider.begin();
//! logger.associate(request)?;
//! logger.info("completed")?;
//! provider.exit();
//!
//! // Both fragments come back as one trace.
//! let trace = logger.combine_all(Some(request))?;
//! assert_eq!(trace.logs().len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod correlation;
pub mod entry;
pub mod grouping;
pub mod level;
pub mod logger;
pub mod merge;
pub mod reconcile;
pub mod timer;

use once_cell::sync::Lazy;

// Re-export main types for convenience
pub use context::{ContextProvider, GroupingHandle, InMemoryContextProvider};
pub use correlation::{AnchorContextGraph, AnchorId, ContextId, GraphNode};
pub use entry::{CallSite, LogEntry};
pub use grouping::{ContextLogGrouping, GroupingOutput};
pub use level::{DEFAULT_LEVELS, LevelSet};
pub use logger::{BufferSink, LogSink, LoggerConfig, ThreadLogger, TracingSink};
pub use merge::{merge_sorted_by, merge_sorted_by_key};
pub use reconcile::Reconciler;
pub use timer::{Timer, TimerOutput};

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LoggingError>;

/// Logging error types
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// An operation needed the active context and nothing was active.
    #[error("no active context; make sure a context has been entered")]
    NoActiveContext,

    /// Reconciliation traversed the component and found zero groupings.
    #[error("no associated context log groupings found")]
    NothingToReconcile,

    /// A level name outside the configured table was used.
    #[error("unknown log level '{0}'")]
    UnknownLevel(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A message failed to serialize into a log argument.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

static GLOBAL_LOGGER: Lazy<ThreadLogger> = Lazy::new(ThreadLogger::default);

/// Process-wide default logger with the default configuration and the
/// bundled in-memory context provider.
pub fn global() -> &'static ThreadLogger {
    &GLOBAL_LOGGER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            LoggingError::UnknownLevel("fatal".to_string()).to_string(),
            "unknown log level 'fatal'"
        );
        assert!(LoggingError::NoActiveContext.to_string().contains("no active context"));
        assert!(
            LoggingError::NothingToReconcile
                .to_string()
                .contains("groupings")
        );
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error = LoggingError::from(json_error);
        assert!(matches!(error, LoggingError::Serialization(_)));
    }

    #[test]
    fn test_global_logger_is_shared() {
        let a = global() as *const ThreadLogger;
        let b = global() as *const ThreadLogger;
        assert_eq!(a, b);
    }
}
