//! Level-filtered logging facade
//!
//! [`ThreadLogger`] ties the pieces together: it stamps level-filtered
//! entries into the active context's grouping, registers timers, records
//! anchor associations as execution proceeds, and reconciles the whole
//! operation on demand. Every emitted entry is also forwarded to a
//! [`LogSink`] so ungrouped real-time output keeps working.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, trace, warn};

use crate::context::{ContextProvider, InMemoryContextProvider};
use crate::correlation::{AnchorContextGraph, AnchorId, ContextId};
use crate::entry::LogEntry;
use crate::grouping::ContextLogGrouping;
use crate::level::{DEFAULT_LEVELS, LevelSet};
use crate::reconcile::Reconciler;
use crate::timer::Timer;
use crate::Result;

/// Configuration for [`ThreadLogger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Level names, most severe first.
    pub levels: Vec<String>,
    /// Emission threshold as an index into `levels`; defaults to the least
    /// severe level (everything emits).
    pub threshold: Option<usize>,
    /// Accumulate entries and timers into per-context groupings.
    pub group_logs: bool,
    /// Forward each emitted entry to the sink.
    pub emit_to_sink: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.iter().map(|s| s.to_string()).collect(),
            threshold: None,
            group_logs: true,
            emit_to_sink: true,
        }
    }
}

/// Destination for emitted entries.
pub trait LogSink: Send + Sync + std::fmt::Debug {
    /// Deliver one entry.
    fn emit(&self, entry: &LogEntry);
}

/// Default sink: forwards entries to `tracing` at a severity-mapped level.
///
/// The default level names map onto `tracing`'s five levels; names outside
/// the default table are forwarded at debug.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, entry: &LogEntry) {
        let arguments = serde_json::to_string(entry.arguments()).unwrap_or_default();
        let context_id = entry.context_id();
        match entry.level() {
            "error" => error!("[{}] {}", context_id, arguments),
            "warn" => warn!("[{}] {}", context_id, arguments),
            "info" => info!("[{}] {}", context_id, arguments),
            "verbose" | "debug" => debug!("[{}] {}", context_id, arguments),
            "silly" => trace!("[{}] {}", context_id, arguments),
            other => debug!("[{}] ({}) {}", context_id, other, arguments),
        }
    }
}

/// Buffering sink that keeps every emitted entry in memory. Useful for
/// tests and for hosts that drain output themselves.
#[derive(Debug, Default)]
pub struct BufferSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferSink {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Number of entries emitted so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything buffered.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for BufferSink {
    fn emit(&self, entry: &LogEntry) {
        self.lock().push(entry.clone());
    }
}

/// Operation-scoped logger over an association graph and context provider.
#[derive(Debug)]
pub struct ThreadLogger {
    levels: LevelSet,
    group_logs: bool,
    sink: Option<Arc<dyn LogSink>>,
    graph: Arc<AnchorContextGraph>,
    provider: Arc<dyn ContextProvider>,
}

impl ThreadLogger {
    /// Build a logger with the bundled in-memory context provider.
    pub fn new(config: LoggerConfig) -> Result<Self> {
        Self::with_provider(config, Arc::new(InMemoryContextProvider::new()))
    }

    /// Build a logger over an externally supplied context provider.
    pub fn with_provider(config: LoggerConfig, provider: Arc<dyn ContextProvider>) -> Result<Self> {
        let levels = LevelSet::new(&config.levels, config.threshold)?;
        let sink: Option<Arc<dyn LogSink>> = if config.emit_to_sink {
            Some(Arc::new(TracingSink))
        } else {
            None
        };
        Ok(Self {
            levels,
            group_logs: config.group_logs,
            sink,
            graph: Arc::new(AnchorContextGraph::new()),
            provider,
        })
    }

    /// Replace the sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The association graph, for the owning collaborator: traversal via
    /// [`AnchorContextGraph::associated_contexts`] and reclamation via the
    /// `forget_*` calls.
    pub fn graph(&self) -> &AnchorContextGraph {
        &self.graph
    }

    /// The context provider this logger reads the active context from.
    pub fn provider(&self) -> &Arc<dyn ContextProvider> {
        &self.provider
    }

    /// Configured level table.
    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    /// Associate `anchor` with the currently active context.
    ///
    /// Call this every time the operation identified by `anchor` is observed
    /// executing, so contexts created after a propagation break get linked
    /// back to the operation.
    pub fn associate(&self, anchor: AnchorId) -> Result<()> {
        let context = self.provider.active_context()?;
        self.graph.associate(anchor, context);
        Ok(())
    }

    /// Log a single serializable message at `level`.
    #[track_caller]
    pub fn log<S: Serialize>(&self, level: &str, message: S) -> Result<()> {
        self.log_values(level, vec![serde_json::to_value(message)?])
    }

    /// Log pre-built structured arguments at `level`.
    ///
    /// Validates the level name, applies the threshold, stamps the entry
    /// into the active context's grouping, and forwards it to the sink.
    #[track_caller]
    pub fn log_values(&self, level: &str, arguments: Vec<Value>) -> Result<()> {
        if !self.levels.enabled(level)? {
            return Ok(());
        }

        let context = self.provider.active_context()?;
        let handle = self.provider.ensure_grouping(context);
        let mut grouping = handle.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = LogEntry::new(grouping.context_id(), level, arguments);
        if self.group_logs {
            grouping.add_log(entry.clone());
        }
        drop(grouping);

        if let Some(sink) = &self.sink {
            sink.emit(&entry);
        }
        Ok(())
    }

    /// Log at `error`.
    #[track_caller]
    pub fn error<S: Serialize>(&self, message: S) -> Result<()> {
        self.log("error", message)
    }

    /// Log at `warn`.
    #[track_caller]
    pub fn warn<S: Serialize>(&self, message: S) -> Result<()> {
        self.log("warn", message)
    }

    /// Log at `info`.
    #[track_caller]
    pub fn info<S: Serialize>(&self, message: S) -> Result<()> {
        self.log("info", message)
    }

    /// Log at `verbose`.
    #[track_caller]
    pub fn verbose<S: Serialize>(&self, message: S) -> Result<()> {
        self.log("verbose", message)
    }

    /// Log at `debug`.
    #[track_caller]
    pub fn debug<S: Serialize>(&self, message: S) -> Result<()> {
        self.log("debug", message)
    }

    /// Log at `silly`.
    #[track_caller]
    pub fn silly<S: Serialize>(&self, message: S) -> Result<()> {
        self.log("silly", message)
    }

    /// Start a named timer and register it in the active context's
    /// grouping. The returned handle shares state with the stored one.
    pub fn timer_start(&self, name: &str) -> Result<Timer> {
        let timer = Timer::start(name);
        if self.group_logs {
            let context = self.provider.active_context()?;
            let handle = self.provider.ensure_grouping(context);
            handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .add_timer(timer.clone());
        }
        Ok(timer)
    }

    /// Stop `timer`; when `level` is given, also log the timer's projection
    /// at that level. An unknown level name is an error.
    #[track_caller]
    pub fn timer_end(&self, timer: &Timer, level: Option<&str>) -> Result<()> {
        timer.end();
        if let Some(level) = level {
            // Validate eagerly so a bad level name surfaces even when the
            // threshold would have filtered the entry.
            self.levels.severity(level)?;
            self.log_values(level, vec![serde_json::to_value(timer.output())?])?;
        }
        Ok(())
    }

    /// Run `f` under a named timer, logging the measurement at `level` when
    /// given.
    #[track_caller]
    pub fn time<F, R>(&self, name: &str, level: Option<&str>, f: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let timer = self.timer_start(name)?;
        let result = f();
        self.timer_end(&timer, level)?;
        Ok(result)
    }

    /// Await `future` under a named timer, logging the measurement at
    /// `level` when given. The timer spans every suspension of the future.
    pub async fn time_async<Fut>(
        &self,
        name: &str,
        level: Option<&str>,
        future: Fut,
    ) -> Result<Fut::Output>
    where
        Fut: Future,
    {
        let timer = self.timer_start(name)?;
        let output = future.await;
        self.timer_end(&timer, level)?;
        Ok(output)
    }

    /// Reconcile the operation identified by `anchor`, or the operation of
    /// the currently active context when no anchor is given, into a single
    /// time-ordered grouping.
    pub fn combine_all(&self, anchor: Option<AnchorId>) -> Result<ContextLogGrouping> {
        Reconciler::new(self.graph.clone(), self.provider.clone()).combine_all(anchor)
    }

    /// Forget an anchor whose lifetime has ended.
    pub fn forget_anchor(&self, anchor: AnchorId) {
        self.graph.forget_anchor(anchor);
    }

    /// Forget a context whose lifetime has ended.
    pub fn forget_context(&self, context: ContextId) {
        self.graph.forget_context(context);
    }
}

impl Default for ThreadLogger {
    fn default() -> Self {
        Self {
            levels: LevelSet::default(),
            group_logs: true,
            sink: Some(Arc::new(TracingSink)),
            graph: Arc::new(AnchorContextGraph::new()),
            provider: Arc::new(InMemoryContextProvider::new()),
        }
    }
}
