//! Fault injection scenarios.
//!
//! A worker that dies early must fail the iteration with a diagnostic
//! naming it — never hang the rendezvous — and teardown must still leave
//! the lock pool fully free for the next iteration.

use std::time::Duration;

use gridlock::{FaultPlan, FaultPoint, HarnessBuilder, IterationControl};

#[test]
fn failure_before_the_rendezvous_does_not_hang() {
    let report = HarnessBuilder::new()
        .worker_count(4)
        .iteration_control(IterationControl::FixedCount(2))
        .detection_timeout(Duration::from_secs(10))
        .fault_plan(FaultPlan {
            worker: 2,
            point: FaultPoint::BeforeRendezvous,
        })
        .run();

    assert!(!report.passed());
    // Both iterations fail the same way, and neither leaks a lock into the
    // next: a leak would surface as a fatal error, not a second failure.
    assert!(report.fatal.is_none(), "fatal: {:?}", report.fatal);
    assert_eq!(report.iterations.len(), 2);
    for it in &report.iterations {
        assert!(!it.passed);
        let diagnostic = it.diagnostic.as_deref().unwrap_or_default();
        assert!(diagnostic.contains("worker 2"), "diagnostic: {diagnostic}");
        assert!(
            diagnostic.contains("before-rendezvous"),
            "diagnostic: {diagnostic}"
        );
    }
}

#[test]
fn failure_after_the_rendezvous_is_observed_while_polling() {
    let report = HarnessBuilder::new()
        .worker_count(4)
        .iteration_control(IterationControl::FixedCount(1))
        .detection_timeout(Duration::from_secs(10))
        .fault_plan(FaultPlan {
            worker: 2,
            point: FaultPoint::BeforeAttempt,
        })
        .run();

    assert!(!report.passed());
    assert!(report.fatal.is_none(), "fatal: {:?}", report.fatal);
    let it = &report.iterations[0];
    let diagnostic = it.diagnostic.as_deref().unwrap_or_default();
    assert!(diagnostic.contains("worker 2"), "diagnostic: {diagnostic}");
    assert!(
        diagnostic.contains("before-attempt"),
        "diagnostic: {diagnostic}"
    );
    // The ring never closed, so the oracle must not have reported one.
    assert_eq!(it.cycle_size, None);
}
