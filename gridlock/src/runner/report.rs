//! Stress run reporting.

use std::fmt;
use std::time::Duration;

use crate::error::HarnessError;

/// Outcome of a single iteration.
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// Iteration number, starting at zero.
    pub iteration: u64,
    /// Seed that staggered this iteration's race.
    pub seed: u64,
    /// Whether the iteration passed every check.
    pub passed: bool,
    /// Size of the cycle the oracle reported, if it reported one.
    pub cycle_size: Option<usize>,
    /// Failure diagnostic, present iff `passed` is false.
    pub diagnostic: Option<String>,
    /// Wall-clock time the iteration took.
    pub wall_time: Duration,
}

/// Aggregated outcome of a whole stress run.
#[derive(Debug, Clone)]
pub struct StressReport {
    /// Worker pool size.
    pub workers: usize,
    /// Per-iteration outcomes, in order.
    pub iterations: Vec<IterationReport>,
    /// Fatal harness error that aborted the run, if any.
    pub fatal: Option<HarnessError>,
    /// Total wall-clock time of the run.
    pub wall_time: Duration,
}

impl StressReport {
    /// Whether the run as a whole passed.
    pub fn passed(&self) -> bool {
        self.fatal.is_none() && self.iterations.iter().all(|it| it.passed)
    }

    /// Number of passing iterations.
    pub fn successful_runs(&self) -> usize {
        self.iterations.iter().filter(|it| it.passed).count()
    }

    /// Number of failing iterations.
    pub fn failed_runs(&self) -> usize {
        self.iterations.len() - self.successful_runs()
    }

    /// Seeds used, one per iteration.
    pub fn seeds_used(&self) -> Vec<u64> {
        self.iterations.iter().map(|it| it.seed).collect()
    }

    /// Seeds of failing iterations, for replay.
    pub fn seeds_failing(&self) -> Vec<u64> {
        self.iterations
            .iter()
            .filter(|it| !it.passed)
            .map(|it| it.seed)
            .collect()
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.iterations.is_empty() {
            0.0
        } else {
            (self.successful_runs() as f64 / self.iterations.len() as f64) * 100.0
        }
    }
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Deadlock Stress Report ===")?;
        writeln!(f, "Workers: {}", self.workers)?;
        writeln!(f, "Iterations: {}", self.iterations.len())?;
        writeln!(f, "Successful: {}", self.successful_runs())?;
        writeln!(f, "Failed: {}", self.failed_runs())?;
        writeln!(f, "Success rate: {:.1}%", self.success_rate())?;
        writeln!(f, "Total wall time: {:?}", self.wall_time)?;
        for it in self.iterations.iter().filter(|it| !it.passed) {
            writeln!(
                f,
                "  iteration {} (seed {}): {}",
                it.iteration,
                it.seed,
                it.diagnostic.as_deref().unwrap_or("unknown failure")
            )?;
        }
        if let Some(fatal) = &self.fatal {
            writeln!(f, "FATAL: {fatal}")?;
        }
        Ok(())
    }
}
