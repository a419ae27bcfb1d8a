//! Trace reconciliation
//!
//! When an operation finishes, every grouping scattered across its contexts
//! is folded into one time-ordered trace: walk the association graph to find
//! the connected component, fetch each context's grouping, and left-fold
//! with [`ContextLogGrouping::combine`].

use std::sync::{Arc, PoisonError};
use tracing::debug;

use crate::context::ContextProvider;
use crate::correlation::{AnchorContextGraph, AnchorId, GraphNode};
use crate::grouping::ContextLogGrouping;
use crate::{LoggingError, Result};

/// Folds the groupings of one connected component into a single trace.
#[derive(Clone)]
pub struct Reconciler {
    graph: Arc<AnchorContextGraph>,
    provider: Arc<dyn ContextProvider>,
}

impl Reconciler {
    /// Build a reconciler over a shared graph and provider.
    pub fn new(graph: Arc<AnchorContextGraph>, provider: Arc<dyn ContextProvider>) -> Self {
        Self { graph, provider }
    }

    /// Reconcile the component containing `anchor`, or the component of the
    /// currently active context when no anchor is given.
    ///
    /// Contexts with no attached grouping contribute nothing. Fails with
    /// [`LoggingError::NothingToReconcile`] when the traversal finds zero
    /// groupings, and with [`LoggingError::NoActiveContext`] when no anchor
    /// is given and nothing is active.
    ///
    /// The fold seeds from a clone of the first fragment, so stored
    /// groupings are never mutated by reconciliation. Fold order is the
    /// traversal's discovery order, which is safe because `combine` is
    /// order-insensitive over the final result.
    pub fn combine_all(&self, anchor: Option<AnchorId>) -> Result<ContextLogGrouping> {
        let start: GraphNode = match anchor {
            Some(anchor) => anchor.into(),
            None => self.provider.active_context()?.into(),
        };

        let contexts = self.graph.associated_contexts(start);
        debug!("Reconciling {} contexts reachable from {:?}", contexts.len(), start);

        let mut combined: Option<ContextLogGrouping> = None;
        for context in contexts {
            let Some(handle) = self.provider.grouping(context) else {
                continue;
            };
            let fragment = handle.lock().unwrap_or_else(PoisonError::into_inner);
            match combined.as_mut() {
                None => combined = Some(fragment.clone()),
                Some(acc) => acc.combine(&fragment),
            }
        }

        combined.ok_or(LoggingError::NothingToReconcile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryContextProvider;
    use crate::entry::LogEntry;
    use serde_json::json;

    fn setup() -> (Arc<AnchorContextGraph>, Arc<InMemoryContextProvider>, Reconciler) {
        let graph = Arc::new(AnchorContextGraph::new());
        let provider = Arc::new(InMemoryContextProvider::new());
        let reconciler = Reconciler::new(graph.clone(), provider.clone());
        (graph, provider, reconciler)
    }

    fn log_at(provider: &InMemoryContextProvider, context: crate::ContextId, timestamp: i64) {
        let handle = provider.ensure_grouping(context);
        let mut grouping = handle.lock().unwrap();
        let entry = LogEntry::new(grouping.context_id(), "info", vec![json!(timestamp)])
            .with_timestamp(timestamp);
        grouping.add_log(entry);
    }

    #[test]
    fn test_reconciles_fragmented_component() {
        let (graph, provider, reconciler) = setup();
        let anchor = AnchorId::new();

        let c1 = provider.begin();
        graph.associate(anchor, c1);
        log_at(&provider, c1, 10);
        log_at(&provider, c1, 30);
        provider.exit();

        // Propagation broke; the operation resumes in a fresh context.
        let c2 = provider.begin();
        graph.associate(anchor, c2);
        log_at(&provider, c2, 20);
        log_at(&provider, c2, 40);
        provider.exit();

        let combined = reconciler.combine_all(Some(anchor)).unwrap();
        let stamps: Vec<i64> = combined.logs().iter().map(|e| e.timestamp()).collect();
        assert_eq!(stamps, vec![10, 20, 30, 40]);
        assert_eq!(combined.merged_context_ids().len(), 2);
    }

    #[test]
    fn test_defaults_to_active_context() {
        let (graph, provider, reconciler) = setup();
        let anchor = AnchorId::new();

        let context = provider.begin();
        graph.associate(anchor, context);
        log_at(&provider, context, 10);

        let combined = reconciler.combine_all(None).unwrap();
        assert_eq!(combined.logs().len(), 1);
    }

    #[test]
    fn test_no_active_context_is_distinct_error() {
        let (_graph, _provider, reconciler) = setup();
        assert!(matches!(
            reconciler.combine_all(None),
            Err(LoggingError::NoActiveContext)
        ));
    }

    #[test]
    fn test_nothing_to_reconcile() {
        let (graph, provider, reconciler) = setup();
        let anchor = AnchorId::new();

        // Associated context exists but never logged anything.
        let context = provider.begin();
        graph.associate(anchor, context);

        assert!(matches!(
            reconciler.combine_all(Some(anchor)),
            Err(LoggingError::NothingToReconcile)
        ));
    }

    #[test]
    fn test_contexts_without_groupings_contribute_nothing() {
        let (graph, provider, reconciler) = setup();
        let anchor = AnchorId::new();

        let c1 = provider.begin();
        graph.associate(anchor, c1);
        log_at(&provider, c1, 10);
        provider.exit();

        let c2 = provider.begin();
        graph.associate(anchor, c2);
        provider.exit();

        let combined = reconciler.combine_all(Some(anchor)).unwrap();
        assert_eq!(combined.logs().len(), 1);
        assert_eq!(combined.merged_context_ids().len(), 1);
    }

    #[test]
    fn test_stored_fragments_survive_reconciliation() {
        let (graph, provider, reconciler) = setup();
        let anchor = AnchorId::new();

        let c1 = provider.begin();
        graph.associate(anchor, c1);
        log_at(&provider, c1, 10);
        provider.exit();
        let c2 = provider.begin();
        graph.associate(anchor, c2);
        log_at(&provider, c2, 20);
        provider.exit();

        let _ = reconciler.combine_all(Some(anchor)).unwrap();

        let first = provider.grouping(c1).unwrap();
        let first = first.lock().unwrap();
        assert_eq!(first.logs().len(), 1);
        assert_eq!(first.merged_context_ids().len(), 1);
    }
}
