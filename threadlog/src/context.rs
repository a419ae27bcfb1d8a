//! Context provider boundary
//!
//! The propagation mechanism that decides which context is active, and the
//! per-context storage a grouping lives in, are collaborators of the core
//! rather than part of it. [`ContextProvider`] is that boundary;
//! [`InMemoryContextProvider`] is the bundled implementation used by the
//! default logger and the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

use crate::correlation::ContextId;
use crate::grouping::ContextLogGrouping;
use crate::{LoggingError, Result};

/// Shared handle to a stored grouping: the facade appends through it while
/// the reconciler reads it.
pub type GroupingHandle = Arc<Mutex<ContextLogGrouping>>;

/// Access to the currently active context and its attached grouping.
pub trait ContextProvider: Send + Sync + std::fmt::Debug {
    /// The context active right now. Fails with
    /// [`LoggingError::NoActiveContext`] when nothing is active.
    fn active_context(&self) -> Result<ContextId>;

    /// The grouping attached to `context`, if one was ever created.
    fn grouping(&self, context: ContextId) -> Option<GroupingHandle>;

    /// The grouping attached to `context`, created lazily on first use.
    /// At most one grouping ever exists per context.
    fn ensure_grouping(&self, context: ContextId) -> GroupingHandle;
}

#[derive(Debug, Default)]
struct ProviderState {
    // Innermost active context last.
    active: Vec<ContextId>,
    groupings: HashMap<ContextId, GroupingHandle>,
}

/// In-memory [`ContextProvider`] with explicit scope management.
///
/// The embedding runtime (or a test) calls [`enter`](Self::enter) when a
/// continuation starts executing and [`exit`](Self::exit) when it yields;
/// entries nest. Re-entering a previously seen context resumes its stored
/// grouping.
#[derive(Debug, Default)]
pub struct InMemoryContextProvider {
    state: RwLock<ProviderState>,
}

impl InMemoryContextProvider {
    /// Create a provider with no active context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh context and make it active.
    pub fn begin(&self) -> ContextId {
        let context = ContextId::new();
        self.enter(context);
        context
    }

    /// Make `context` the active context, nesting over any current one.
    pub fn enter(&self, context: ContextId) {
        self.write().active.push(context);
        debug!("Entered {}", context);
    }

    /// Leave the innermost active context.
    pub fn exit(&self) {
        if let Some(context) = self.write().active.pop() {
            debug!("Exited {}", context);
        }
    }

    /// Drop everything stored for `context`. Called when the context's
    /// lifetime ends so abandoned groupings are reclaimed.
    pub fn forget(&self, context: ContextId) {
        let mut state = self.write();
        state.groupings.remove(&context);
        state.active.retain(|&c| c != context);
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContextProvider for InMemoryContextProvider {
    fn active_context(&self) -> Result<ContextId> {
        self.read()
            .active
            .last()
            .copied()
            .ok_or(LoggingError::NoActiveContext)
    }

    fn grouping(&self, context: ContextId) -> Option<GroupingHandle> {
        self.read().groupings.get(&context).cloned()
    }

    fn ensure_grouping(&self, context: ContextId) -> GroupingHandle {
        self.write()
            .groupings
            .entry(context)
            .or_insert_with(|| Arc::new(Mutex::new(ContextLogGrouping::new())))
            .clone()
    }
}
