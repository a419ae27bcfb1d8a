//! Log entry type
//!
//! A [`LogEntry`] is one immutable record captured at a call site: the id of
//! the grouping it was stamped into, a level name, a millisecond epoch
//! timestamp, the structured arguments, and the call site that produced it.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::panic::Location;

/// Source location captured when an entry is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Source file of the logging call.
    pub file: String,
    /// Line of the logging call.
    pub line: u32,
    /// Column of the logging call.
    pub column: u32,
}

impl From<&Location<'_>> for CallSite {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

/// One log record, immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    context_id: String,
    level: String,
    timestamp: i64,
    arguments: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_site: Option<CallSite>,
}

impl LogEntry {
    /// Create an entry stamped with the current wall-clock time and the
    /// caller's source location.
    #[track_caller]
    pub fn new(context_id: impl Into<String>, level: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            context_id: context_id.into(),
            level: level.into(),
            timestamp: Utc::now().timestamp_millis(),
            arguments,
            call_site: Some(Location::caller().into()),
        }
    }

    /// Replace the captured timestamp. Intended for deterministic fixtures.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Drop the captured call site.
    pub fn without_call_site(mut self) -> Self {
        self.call_site = None;
        self
    }

    /// Id of the grouping this entry was stamped into.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Level name.
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Millisecond epoch timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Structured arguments.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Call site, if captured.
    pub fn call_site(&self) -> Option<&CallSite> {
        self.call_site.as_ref()
    }
}
