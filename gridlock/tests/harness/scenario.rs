//! End-to-end detection scenarios.
//!
//! Each run must detect a cycle of size exactly N, unwind it from a single
//! cancellation, and leave the lock pool fully free — every iteration.

use std::time::Duration;

use gridlock::{HarnessBuilder, IterationControl};

#[test]
fn four_workers_detect_a_full_cycle() {
    let report = HarnessBuilder::new()
        .worker_count(4)
        .iteration_control(IterationControl::FixedCount(1))
        .set_seed(42)
        .detection_timeout(Duration::from_secs(10))
        .run();

    assert!(report.passed(), "{report}");
    assert_eq!(report.iterations.len(), 1);
    assert_eq!(report.iterations[0].cycle_size, Some(4));
    assert_eq!(report.seeds_used(), vec![42]);
}

#[test]
fn minimal_pool_of_two_still_cycles() {
    let report = HarnessBuilder::new()
        .worker_count(2)
        .iteration_control(IterationControl::FixedCount(1))
        .detection_timeout(Duration::from_secs(10))
        .run();

    assert!(report.passed(), "{report}");
    assert_eq!(report.iterations[0].cycle_size, Some(2));
}

#[test]
fn repeated_iterations_keep_detecting() {
    let report = HarnessBuilder::new()
        .worker_count(6)
        .iteration_control(IterationControl::FixedCount(5))
        .detection_timeout(Duration::from_secs(10))
        .run();

    assert!(report.passed(), "{report}");
    assert_eq!(report.iterations.len(), 5);
    for it in &report.iterations {
        assert_eq!(it.cycle_size, Some(6), "iteration {} (seed {})", it.iteration, it.seed);
    }
    assert_eq!(report.seeds_used().len(), 5);
    assert!(report.seeds_failing().is_empty());
}

#[test]
fn larger_pool_mixes_both_lock_kinds() {
    // 12 workers cover all three acquisition shapes four times over.
    let report = HarnessBuilder::new()
        .worker_count(12)
        .iteration_control(IterationControl::FixedCount(2))
        .detection_timeout(Duration::from_secs(10))
        .run();

    assert!(report.passed(), "{report}");
    for it in &report.iterations {
        assert_eq!(it.cycle_size, Some(12));
    }
}

#[test]
fn zero_time_limit_runs_no_iterations() {
    let report = HarnessBuilder::new()
        .worker_count(4)
        .iteration_control(IterationControl::TimeLimit(Duration::ZERO))
        .run();

    assert!(report.iterations.is_empty());
    assert!(report.passed());
}

#[test]
fn report_display_summarizes_the_run() {
    let report = HarnessBuilder::new()
        .worker_count(4)
        .iteration_control(IterationControl::FixedCount(1))
        .detection_timeout(Duration::from_secs(10))
        .run();

    let rendered = format!("{report}");
    assert!(rendered.contains("=== Deadlock Stress Report ==="));
    assert!(rendered.contains("Workers: 4"));
    assert!(rendered.contains("Successful: 1"));
    assert!(rendered.contains("Failed: 0"));
}
