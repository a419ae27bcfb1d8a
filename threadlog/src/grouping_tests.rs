//! Combine and projection tests for the per-context grouping

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::entry::LogEntry;
    use crate::timer::Timer;
    use serde_json::json;

    fn entry(grouping: &ContextLogGrouping, timestamp: i64) -> LogEntry {
        LogEntry::new(grouping.context_id(), "info", vec![json!(timestamp)])
            .with_timestamp(timestamp)
    }

    fn timestamps(grouping: &ContextLogGrouping) -> Vec<i64> {
        grouping.logs().iter().map(|e| e.timestamp()).collect()
    }

    #[test]
    fn test_fresh_grouping() {
        let grouping = ContextLogGrouping::new();
        assert!(grouping.logs().is_empty());
        assert!(grouping.timers().is_empty());
        assert_eq!(grouping.merged_context_ids().len(), 1);
        assert!(grouping.merged_context_ids().contains(grouping.context_id()));
    }

    #[test]
    fn test_fresh_ids_are_distinct() {
        let a = ContextLogGrouping::new();
        let b = ContextLogGrouping::new();
        assert_ne!(a.context_id(), b.context_id());
    }

    #[test]
    fn test_add_log_appends_in_order() {
        let mut grouping = ContextLogGrouping::new();
        for ts in [10, 20, 30] {
            grouping.add_log(entry(&grouping, ts));
        }
        assert_eq!(timestamps(&grouping), vec![10, 20, 30]);
    }

    #[test]
    fn test_add_log_places_out_of_order_arrival() {
        let mut grouping = ContextLogGrouping::new();
        for ts in [10, 30, 20, 5] {
            grouping.add_log(entry(&grouping, ts));
        }
        assert_eq!(timestamps(&grouping), vec![5, 10, 20, 30]);
    }

    #[test]
    fn test_add_log_keeps_equal_timestamps_in_arrival_order() {
        let mut grouping = ContextLogGrouping::new();
        let first = entry(&grouping, 10);
        let second = LogEntry::new(grouping.context_id(), "warn", vec![json!("second")])
            .with_timestamp(10);
        grouping.add_log(first);
        grouping.add_log(second);
        assert_eq!(grouping.logs()[0].level(), "info");
        assert_eq!(grouping.logs()[1].level(), "warn");
    }

    #[test]
    fn test_add_timer_is_set_membership() {
        let mut grouping = ContextLogGrouping::new();
        let timer = Timer::start_at("query", 100);
        grouping.add_timer(timer.clone());
        grouping.add_timer(timer.clone());
        assert_eq!(grouping.timers().len(), 1);

        grouping.add_timer(Timer::start_at("other", 50));
        assert_eq!(grouping.timers().len(), 2);
        // Ordered by start time.
        assert_eq!(grouping.timers()[0].name(), "other");
    }

    #[test]
    fn test_combine_interleaves_logs_by_timestamp() {
        let mut g1 = ContextLogGrouping::new();
        let mut g2 = ContextLogGrouping::new();
        for ts in [10, 30] {
            g1.add_log(entry(&g1, ts));
        }
        for ts in [20, 40] {
            g2.add_log(entry(&g2, ts));
        }

        g1.combine(&g2);
        assert_eq!(timestamps(&g1), vec![10, 20, 30, 40]);
        // The absorbed grouping is untouched.
        assert_eq!(timestamps(&g2), vec![20, 40]);
        assert_eq!(g2.merged_context_ids().len(), 1);
    }

    #[test]
    fn test_combine_unions_merged_ids() {
        let mut g1 = ContextLogGrouping::new();
        let g2 = ContextLogGrouping::new();
        let own = g1.context_id().to_string();
        let absorbed = g2.context_id().to_string();

        g1.combine(&g2);
        assert_eq!(g1.merged_context_ids().len(), 2);
        assert!(g1.merged_context_ids().contains(&own));
        assert!(g1.merged_context_ids().contains(&absorbed));
        // Own id is stable across combines.
        assert_eq!(g1.context_id(), own);
    }

    #[test]
    fn test_combine_carries_transitively_merged_ids() {
        let mut g1 = ContextLogGrouping::new();
        let mut g2 = ContextLogGrouping::new();
        let g3 = ContextLogGrouping::new();

        g2.combine(&g3);
        g1.combine(&g2);
        assert_eq!(g1.merged_context_ids().len(), 3);
        assert!(g1.merged_context_ids().contains(g3.context_id()));
    }

    #[test]
    fn test_combine_fold_order_does_not_matter() {
        let make = |stamps: &[i64]| {
            let mut g = ContextLogGrouping::new();
            for &ts in stamps {
                g.add_log(entry(&g, ts));
            }
            g
        };
        let a = make(&[10, 40]);
        let b = make(&[20, 50]);
        let c = make(&[30, 60]);

        // (a + b) + c
        let mut left = a.clone();
        left.combine(&b);
        left.combine(&c);

        // a + (b + c)
        let mut right_inner = b.clone();
        right_inner.combine(&c);
        let mut right = a.clone();
        right.combine(&right_inner);

        // c + b + a
        let mut reversed = c.clone();
        reversed.combine(&b);
        reversed.combine(&a);

        assert_eq!(timestamps(&left), vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(timestamps(&left), timestamps(&right));
        assert_eq!(timestamps(&left), timestamps(&reversed));
        assert_eq!(left.merged_context_ids(), right.merged_context_ids());
        assert_eq!(left.merged_context_ids(), reversed.merged_context_ids());
    }

    #[test]
    fn test_combine_orders_timers_by_start() {
        let mut g1 = ContextLogGrouping::new();
        let mut g2 = ContextLogGrouping::new();
        g1.add_timer(Timer::start_at("second", 200));
        g2.add_timer(Timer::start_at("first", 100));
        g2.add_timer(Timer::start_at("third", 300));

        g1.combine(&g2);
        let names: Vec<String> = g1.timers().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_combine_retains_timer_identity() {
        let mut g1 = ContextLogGrouping::new();
        let g2 = {
            let mut g = ContextLogGrouping::new();
            g.add_timer(Timer::start_at("query", 100));
            g
        };
        let live = g2.timers()[0].clone();

        g1.combine(&g2);
        // Ending the caller's handle is visible through the merged grouping.
        live.end_at(180);
        assert_eq!(g1.output().timers[0].duration_ms, Some(80));
    }

    #[test]
    fn test_output_includes_merged_ids_only_after_combine() {
        let mut g1 = ContextLogGrouping::new();
        let g2 = ContextLogGrouping::new();

        assert!(g1.output().merged_context_ids.is_none());

        g1.combine(&g2);
        let merged = g1.output().merged_context_ids.expect("merged ids present");
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&g1.context_id().to_string()));
        assert!(merged.contains(&g2.context_id().to_string()));
    }

    #[test]
    fn test_output_is_idempotent() {
        let mut grouping = ContextLogGrouping::new();
        grouping.add_log(entry(&grouping, 10));
        let timer = Timer::start_at("query", 5);
        timer.end_at(25);
        grouping.add_timer(timer);

        assert_eq!(grouping.output(), grouping.output());
    }

    #[test]
    fn test_output_serializes_to_plain_data() {
        let mut grouping = ContextLogGrouping::new();
        grouping.add_log(entry(&grouping, 10));
        let value = serde_json::to_value(grouping.output()).unwrap();
        assert_eq!(value["context_id"], grouping.context_id());
        assert_eq!(value["logs"][0]["timestamp"], 10);
        assert!(value.get("merged_context_ids").is_none());
    }
}
