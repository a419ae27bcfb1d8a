//! Reconciliation properties exercised through the public API
//!
//! Component symmetry, fold-order insensitivity, projection idempotence,
//! and the distinction between the two reconciliation failure modes.

use crate::test_utils::test_logger;
use serde_json::json;
use std::collections::HashSet;
use threadlog::{AnchorId, ContextId, ContextProvider, LoggingError, Reconciler};

#[test]
fn traversal_is_symmetric_across_the_component() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();
    let mut contexts = Vec::new();

    for step in 0..3 {
        provider.begin();
        contexts.push(provider.active_context().unwrap());
        logger.associate(request).unwrap();
        logger.info(json!({"step": step})).unwrap();
        provider.exit();
    }

    let from_anchor: HashSet<ContextId> = logger
        .graph()
        .associated_contexts(request)
        .into_iter()
        .collect();
    assert_eq!(from_anchor.len(), 3);

    for &context in &contexts {
        let from_context: HashSet<ContextId> = logger
            .graph()
            .associated_contexts(context)
            .into_iter()
            .collect();
        assert_eq!(from_context, from_anchor);
    }
}

#[test]
fn reassociating_the_same_pair_adds_no_edges() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    provider.begin();
    logger.associate(request).unwrap();
    assert_eq!(logger.graph().edge_count(), 1);
    logger.associate(request).unwrap();
    assert_eq!(logger.graph().edge_count(), 1);
    provider.exit();
}

#[test]
fn reconciled_output_is_idempotent_and_marks_merges() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    for _ in 0..2 {
        provider.begin();
        logger.associate(request).unwrap();
        logger.info("fragment").unwrap();
        provider.exit();
    }

    let trace = logger.combine_all(Some(request)).unwrap();
    let first = trace.output();
    let second = trace.output();
    assert_eq!(first, second);
    assert_eq!(first.merged_context_ids.as_ref().unwrap().len(), 2);

    // A single-fragment trace omits the merged id list.
    let (logger, provider, _sink) = test_logger();
    let lone = AnchorId::new();
    provider.begin();
    logger.associate(lone).unwrap();
    logger.info("only fragment").unwrap();
    provider.exit();
    let output = logger.combine_all(Some(lone)).unwrap().output();
    assert!(output.merged_context_ids.is_none());
}

#[test]
fn reconciliation_defaults_to_the_active_context() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    provider.begin();
    logger.associate(request).unwrap();
    logger.info("early fragment").unwrap();
    provider.exit();

    // Still inside the operation: no anchor at hand, only the live context.
    provider.begin();
    logger.associate(request).unwrap();
    logger.info("late fragment").unwrap();

    let trace = logger.combine_all(None).unwrap();
    assert_eq!(trace.logs().len(), 2);
    provider.exit();
}

#[test]
fn failure_modes_stay_distinct() {
    let (logger, provider, _sink) = test_logger();

    // Nothing active and no anchor given.
    assert!(matches!(
        logger.combine_all(None),
        Err(LoggingError::NoActiveContext)
    ));

    // Anchor known but no grouping was ever created in its component.
    let request = AnchorId::new();
    provider.begin();
    logger.associate(request).unwrap();
    provider.exit();
    assert!(matches!(
        logger.combine_all(Some(request)),
        Err(LoggingError::NothingToReconcile)
    ));

    // An anchor the graph has never seen behaves the same way.
    assert!(matches!(
        logger.combine_all(Some(AnchorId::new())),
        Err(LoggingError::NothingToReconcile)
    ));
}

#[test]
fn reconciler_is_usable_without_the_facade() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    provider.begin();
    logger.associate(request).unwrap();
    logger.info("fragment").unwrap();
    provider.exit();

    // Hosts embedding only the core can drive reconciliation directly.
    let reconciler = Reconciler::new(
        std::sync::Arc::new(threadlog::AnchorContextGraph::new()),
        provider.clone(),
    );
    assert!(matches!(
        reconciler.combine_all(Some(request)),
        Err(LoggingError::NothingToReconcile)
    ));

    let trace = logger.combine_all(Some(request)).unwrap();
    assert_eq!(trace.logs().len(), 1);
}
