//! Driver binary for the deadlock stress harness.
//!
//! Usage: `stress [workers] [iterations]`. Defaults to 12 workers and 50
//! iterations.

use std::process;
use std::time::Duration;

use gridlock::{HarnessBuilder, IterationControl};

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let workers = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(12);
    let iterations = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(50);

    let report = HarnessBuilder::new()
        .worker_count(workers)
        .iteration_control(IterationControl::FixedCount(iterations))
        .detection_timeout(Duration::from_secs(30))
        .run();

    eprintln!("{report}");

    if !report.passed() {
        process::exit(1);
    }
}
