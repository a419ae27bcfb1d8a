//! Per-context accumulator of logs and timers
//!
//! Each execution context carries at most one [`ContextLogGrouping`]. When a
//! logical operation is split across several contexts, the fragments are
//! folded back together with [`combine`](ContextLogGrouping::combine), which
//! unions the absorbed context ids and merges logs and timers in ascending
//! time order.

use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::entry::LogEntry;
use crate::merge::merge_sorted_by_key;
use crate::timer::{Timer, TimerOutput};

/// Accumulator for the logs and timers of one execution context.
///
/// Insertion keeps `logs` sorted by timestamp and `timers` sorted by start
/// time. Timestamps are captured at construction on one cooperative thread,
/// so the fast path is a plain append; a late out-of-order arrival is placed
/// at its sorted position. This guarantees the sorted-input precondition of
/// the merge used by [`combine`](ContextLogGrouping::combine).
#[derive(Debug, Clone)]
pub struct ContextLogGrouping {
    context_id: String,
    merged_context_ids: BTreeSet<String>,
    logs: Vec<LogEntry>,
    timers: Vec<Timer>,
}

/// Plain-data projection of a grouping.
///
/// `merged_context_ids` is present only after at least one combine, i.e.
/// when more than one id has been absorbed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupingOutput {
    /// Id of the grouping that produced this projection.
    pub context_id: String,
    /// Log entries in ascending timestamp order.
    pub logs: Vec<LogEntry>,
    /// Timer projections in ascending start order.
    pub timers: Vec<TimerOutput>,
    /// Every absorbed context id, when more than one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_context_ids: Option<Vec<String>>,
}

impl ContextLogGrouping {
    /// Create an empty grouping with a fresh globally-unique context id.
    pub fn new() -> Self {
        let context_id = Uuid::new_v4().to_string();
        let mut merged_context_ids = BTreeSet::new();
        merged_context_ids.insert(context_id.clone());
        Self {
            context_id,
            merged_context_ids,
            logs: Vec::new(),
            timers: Vec::new(),
        }
    }

    /// This grouping's own pre-merge id, stable across combines.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Every context id absorbed into this grouping, own id included.
    pub fn merged_context_ids(&self) -> &BTreeSet<String> {
        &self.merged_context_ids
    }

    /// Live log entries, ascending by timestamp.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Live timer handles, ascending by start time.
    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    /// Append a log entry, keeping the sequence sorted by timestamp.
    pub fn add_log(&mut self, entry: LogEntry) {
        let at = sorted_position(&self.logs, entry.timestamp(), |e| e.timestamp());
        self.logs.insert(at, entry);
    }

    /// Insert a timer, keeping the sequence sorted by start time.
    /// Re-adding a timer already present (by id) is a no-op.
    pub fn add_timer(&mut self, timer: Timer) {
        if self.timers.iter().any(|t| t.id() == timer.id()) {
            return;
        }
        let at = sorted_position(&self.timers, timer.start_time(), |t| t.start_time());
        self.timers.insert(at, timer);
    }

    /// Absorb `other` into this grouping, leaving `other` untouched.
    ///
    /// The receiver's merged id set gains `other`'s own id and everything
    /// `other` had already absorbed; logs and timers are replaced by the
    /// ordered merge of both sides. Folding any collection of fragments
    /// with this operation yields the same id set and the same log/timer
    /// multisets regardless of fold order.
    pub fn combine(&mut self, other: &ContextLogGrouping) {
        self.merged_context_ids.insert(other.context_id.clone());
        self.merged_context_ids
            .extend(other.merged_context_ids.iter().cloned());

        self.logs = merge_sorted_by_key(&self.logs, &other.logs, |e| e.timestamp());
        // Timers are ordered by their projected start so a live handle and
        // an already-ended one compare the same way.
        self.timers = merge_sorted_by_key(&self.timers, &other.timers, |t| t.output().start);
    }

    /// Project the grouping to plain data.
    pub fn output(&self) -> GroupingOutput {
        let merged_context_ids = if self.merged_context_ids.len() > 1 {
            Some(self.merged_context_ids.iter().cloned().collect())
        } else {
            None
        };
        GroupingOutput {
            context_id: self.context_id.clone(),
            logs: self.logs.clone(),
            timers: self.timers.iter().map(Timer::output).collect(),
            merged_context_ids,
        }
    }
}

impl Default for ContextLogGrouping {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion index that keeps `items` sorted ascending by `key`, placing
/// equal keys after the existing ones (stable append order).
fn sorted_position<T, F>(items: &[T], key: i64, get: F) -> usize
where
    F: Fn(&T) -> i64,
{
    match items.last() {
        Some(last) if get(last) > key => items
            .iter()
            .rposition(|item| get(item) <= key)
            .map(|p| p + 1)
            .unwrap_or(0),
        _ => items.len(),
    }
}

#[cfg(test)]
#[path = "grouping_tests.rs"]
mod grouping_tests;
