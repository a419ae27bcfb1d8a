//! Full request lifecycle: enter, associate, fragment, reconcile
//!
//! Mirrors what HTTP glue around this crate does for one inbound request:
//! open a context when the request arrives, associate the request anchor,
//! log and time the handler, lose propagation at an emitter-style callback,
//! re-associate from the fresh context, and reconcile when the response
//! finishes.

use crate::test_utils::test_logger;
use serde_json::json;
use std::time::Duration;
use threadlog::{AnchorId, ContextProvider, LoggingError};

/// Millisecond timestamps tie when logs land inside the same tick; space
/// them out so ordering assertions are deterministic.
fn next_tick() {
    std::thread::sleep(Duration::from_millis(2));
}

#[test]
fn request_fragmented_across_contexts_reconciles_in_order() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    // Request arrives: first continuation.
    provider.begin();
    logger.associate(request).unwrap();
    let timer = logger.timer_start("request").unwrap();
    logger.info(json!({"phase": "accepted"})).unwrap();
    next_tick();
    logger.debug(json!({"phase": "routed"})).unwrap();
    provider.exit();

    // An event-emitter callback runs outside the original context.
    next_tick();
    provider.begin();
    logger.associate(request).unwrap();
    logger.info(json!({"phase": "handler"})).unwrap();
    provider.exit();

    // Response finished: stop the request timer and reconcile.
    logger.timer_end(&timer, None).unwrap();
    let trace = logger.combine_all(Some(request)).unwrap();

    assert_eq!(trace.logs().len(), 3);
    let phases: Vec<&str> = trace
        .logs()
        .iter()
        .map(|e| e.arguments()[0]["phase"].as_str().unwrap())
        .collect();
    assert_eq!(phases, vec!["accepted", "routed", "handler"]);
    assert!(
        trace
            .logs()
            .windows(2)
            .all(|w| w[0].timestamp() <= w[1].timestamp())
    );
    assert_eq!(trace.merged_context_ids().len(), 2);

    // The request timer rode along in the first fragment and is ended.
    assert_eq!(trace.timers().len(), 1);
    assert!(trace.timers()[0].is_ended());

    let output = trace.output();
    assert_eq!(output.merged_context_ids.as_ref().unwrap().len(), 2);
    assert_eq!(output.timers[0].name, "request");
}

#[test]
fn interleaved_requests_stay_isolated() {
    let (logger, provider, _sink) = test_logger();
    let first = AnchorId::new();
    let second = AnchorId::new();

    // Cooperative interleaving: fragments of both requests alternate.
    provider.begin();
    logger.associate(first).unwrap();
    logger.info(json!({"request": 1, "step": 1})).unwrap();
    provider.exit();

    provider.begin();
    logger.associate(second).unwrap();
    logger.info(json!({"request": 2, "step": 1})).unwrap();
    provider.exit();

    provider.begin();
    logger.associate(first).unwrap();
    logger.info(json!({"request": 1, "step": 2})).unwrap();
    provider.exit();

    let first_trace = logger.combine_all(Some(first)).unwrap();
    let second_trace = logger.combine_all(Some(second)).unwrap();

    assert_eq!(first_trace.logs().len(), 2);
    assert_eq!(second_trace.logs().len(), 1);
    assert!(
        first_trace
            .logs()
            .iter()
            .all(|e| e.arguments()[0]["request"] == json!(1))
    );
    assert!(
        first_trace
            .merged_context_ids()
            .intersection(second_trace.merged_context_ids())
            .next()
            .is_none()
    );
}

#[test]
fn abandoned_context_is_excluded_after_forget() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    provider.begin();
    let abandoned = provider.active_context().unwrap();
    logger.associate(request).unwrap();
    logger.info("never finished").unwrap();
    provider.exit();

    provider.begin();
    logger.associate(request).unwrap();
    logger.info("completed").unwrap();
    provider.exit();

    // The first continuation was abandoned; its owner reclaims it.
    logger.forget_context(abandoned);
    provider.forget(abandoned);

    let trace = logger.combine_all(Some(request)).unwrap();
    assert_eq!(trace.logs().len(), 1);
    assert_eq!(trace.merged_context_ids().len(), 1);
}

#[test]
fn completed_request_is_reclaimable() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    provider.begin();
    let context = provider.active_context().unwrap();
    logger.associate(request).unwrap();
    logger.info("done").unwrap();
    provider.exit();

    let trace = logger.combine_all(Some(request)).unwrap();
    assert_eq!(trace.logs().len(), 1);

    // Response delivered: the owning glue forgets both identities.
    logger.forget_anchor(request);
    provider.forget(context);

    assert!(matches!(
        logger.combine_all(Some(request)),
        Err(LoggingError::NothingToReconcile)
    ));
    assert_eq!(logger.graph().edge_count(), 0);
}

#[tokio::test]
async fn handler_timing_spans_awaits() {
    let (logger, provider, _sink) = test_logger();
    let request = AnchorId::new();

    provider.begin();
    logger.associate(request).unwrap();
    let payload = logger
        .time_async("handler", Some("verbose"), async {
            tokio::task::yield_now().await;
            json!({"status": 200})
        })
        .await
        .unwrap();
    provider.exit();

    assert_eq!(payload["status"], 200);

    let trace = logger.combine_all(Some(request)).unwrap();
    assert_eq!(trace.timers().len(), 1);
    assert!(trace.timers()[0].is_ended());
    // The measurement itself was logged at `verbose`.
    assert_eq!(trace.logs().len(), 1);
    assert_eq!(trace.logs()[0].level(), "verbose");
    assert_eq!(trace.logs()[0].arguments()[0]["name"], "handler");
}
