//! Shared-handle timers
//!
//! A [`Timer`] is a cheaply clonable handle to one measurement: every clone
//! refers to the same underlying state, so the handle stored in a grouping
//! and the handle the caller later ends are the same timer. Membership in a
//! grouping is by timer id, and a timer can be ended exactly once.

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug)]
struct TimerState {
    name: String,
    start: i64,
    end: Option<i64>,
    duration_ms: Option<i64>,
}

/// Handle to one named measurement.
#[derive(Debug, Clone)]
pub struct Timer {
    id: Uuid,
    state: Arc<Mutex<TimerState>>,
}

/// Plain-data projection of a [`Timer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerOutput {
    /// Timer name.
    pub name: String,
    /// Millisecond epoch start time.
    pub start: i64,
    /// Millisecond epoch end time, once ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    /// Elapsed milliseconds, once ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

impl Timer {
    /// Start a timer now.
    pub fn start(name: impl Into<String>) -> Self {
        Self::start_at(name, Utc::now().timestamp_millis())
    }

    /// Start a timer at an explicit millisecond epoch time. Intended for
    /// deterministic fixtures.
    pub fn start_at(name: impl Into<String>, start: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(Mutex::new(TimerState {
                name: name.into(),
                start,
                end: None,
                duration_ms: None,
            })),
        }
    }

    /// Stop the timer. The first call records the end time; later calls
    /// leave it unchanged.
    pub fn end(&self) {
        self.end_at(Utc::now().timestamp_millis());
    }

    /// [`end`](Timer::end) at an explicit millisecond epoch time.
    pub fn end_at(&self, end: i64) {
        let mut state = self.lock();
        if state.end.is_none() {
            state.end = Some(end);
            state.duration_ms = Some(end - state.start);
        }
    }

    /// Identity of this timer, shared by every clone of the handle.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Timer name.
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Millisecond epoch start time.
    pub fn start_time(&self) -> i64 {
        self.lock().start
    }

    /// Whether [`end`](Timer::end) has been called.
    pub fn is_ended(&self) -> bool {
        self.lock().end.is_some()
    }

    /// Project the current state to plain data.
    pub fn output(&self) -> TimerOutput {
        let state = self.lock();
        TimerOutput {
            name: state.name.clone(),
            start: state.start,
            end: state.end,
            duration_ms: state.duration_ms,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Timer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_transition() {
        let timer = Timer::start_at("query", 100);
        assert!(!timer.is_ended());
        timer.end_at(130);
        assert!(timer.is_ended());

        let output = timer.output();
        assert_eq!(output.name, "query");
        assert_eq!(output.start, 100);
        assert_eq!(output.end, Some(130));
        assert_eq!(output.duration_ms, Some(30));
    }

    #[test]
    fn test_second_end_keeps_first() {
        let timer = Timer::start_at("query", 100);
        timer.end_at(130);
        timer.end_at(999);
        assert_eq!(timer.output().end, Some(130));
    }

    #[test]
    fn test_clones_share_state() {
        let timer = Timer::start_at("query", 100);
        let stored = timer.clone();
        assert_eq!(timer, stored);

        timer.end_at(150);
        assert!(stored.is_ended());
        assert_eq!(stored.output().duration_ms, Some(50));
    }

    #[test]
    fn test_output_skips_unset_fields() {
        let timer = Timer::start_at("query", 100);
        let value = serde_json::to_value(timer.output()).unwrap();
        assert!(value.get("end").is_none());
        assert!(value.get("duration_ms").is_none());
    }
}
