//! Per-iteration orchestration state machine.
//!
//! One iteration walks reset → armed → racing → polling → unwinding. The
//! single most load-bearing rule in here: every blocking wait is preceded
//! by a check of the shared failure flag, and every primitive a party can
//! park in is poisoned when that flag trips, so a worker that dies early
//! fails the iteration instead of hanging it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::error::{HarnessError, HarnessResult};
use crate::handler::HandlerTable;
use crate::oracle::CycleOracle;
use crate::registry::LockRegistry;
use crate::runner::context::IterationContext;
use crate::runner::report::IterationReport;
use crate::runner::worker::run_worker;

pub(crate) struct Orchestrator {
    registry: Arc<LockRegistry>,
    table: Arc<HandlerTable>,
    oracle: CycleOracle,
    poll_interval: Duration,
    detection_timeout: Duration,
}

impl Orchestrator {
    pub(crate) fn new(
        registry: Arc<LockRegistry>,
        table: Arc<HandlerTable>,
        oracle: CycleOracle,
        poll_interval: Duration,
        detection_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            table,
            oracle,
            poll_interval,
            detection_timeout,
        }
    }

    /// Drive one full iteration. `Err` means a fatal harness defect that
    /// aborts the run; an iteration that merely fails its checks comes back
    /// as `Ok` with `passed == false` and a diagnostic.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn run_iteration(&self, iteration: u64, seed: u64) -> HarnessResult<IterationReport> {
        let started = Instant::now();
        let workers = self.registry.len();

        // Reset: a held lock here is a teardown bug from the prior
        // iteration, not a detection bug, and poisons every later result.
        tracing::debug!("reset: checking lock pool");
        self.registry.assert_all_free(iteration)?;

        // Armed: fresh shared state, then the worker pool.
        let ctx = Arc::new(IterationContext::new(workers, seed));
        let handles = self.spawn_workers(&ctx)?;
        tracing::debug!(workers, "armed: worker pool spawned");

        // Racing: join the rendezvous as the final party.
        let mut failure: Option<String> = None;
        if ctx.has_failed() {
            failure = Some(self.diagnose(&ctx, "before rendezvous"));
        } else if ctx.rendezvous.arrive_and_wait().is_err() || ctx.has_failed() {
            failure = Some(self.diagnose(&ctx, "at rendezvous"));
        }

        // Polling: wait until every worker holds its own lock and is
        // heading into its neighbor attempt, then interrogate the oracle
        // until the full cycle shows up.
        let mut cycle_size = None;
        if failure.is_none() {
            if ctx.remaining.wait().is_err() || ctx.has_failed() {
                failure = Some(self.diagnose(&ctx, "awaiting countdown"));
            } else {
                tracing::debug!("polling: all workers armed");
                let deadline = Instant::now() + self.detection_timeout;
                loop {
                    if ctx.has_failed() {
                        failure = Some(self.diagnose(&ctx, "while polling"));
                        break;
                    }
                    if let Some(cycle) = self.oracle.find_cycle() {
                        tracing::debug!(size = cycle.len(), ?cycle, "cycle reported");
                        cycle_size = Some(cycle.len());
                        if cycle.len() != workers {
                            failure = Some(format!(
                                "deadlock cycle has {} task(s), expected {}: {:?}",
                                cycle.len(),
                                workers,
                                cycle
                            ));
                        }
                        break;
                    }
                    if Instant::now() >= deadline {
                        failure = Some(format!(
                            "no deadlock cycle reported within {:?}",
                            self.detection_timeout
                        ));
                        break;
                    }
                    thread::sleep(self.poll_interval);
                }
            }
        }

        // Unwinding always runs: mark teardown so cancellations read as
        // expected, break the cycle with the single targeted cancellation,
        // and collect every worker.
        tracing::debug!("unwinding");
        ctx.finish();
        ctx.token(0).cancel();
        for (index, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && failure.is_none() {
                failure = Some(format!("worker {index} panicked during unwind"));
            }
        }
        self.registry.assert_all_free(iteration)?;

        let passed = failure.is_none();
        match &failure {
            Some(diagnostic) => {
                tracing::error!(iteration, seed, %diagnostic, "iteration failed");
            }
            None => {
                tracing::info!(iteration, seed, workers, "iteration passed");
            }
        }
        Ok(IterationReport {
            iteration,
            seed,
            passed,
            cycle_size,
            diagnostic: failure,
            wall_time: started.elapsed(),
        })
    }

    /// Spawn the worker pool, unwinding cleanly if any spawn fails.
    fn spawn_workers(&self, ctx: &Arc<IterationContext>) -> HarnessResult<Vec<JoinHandle<()>>> {
        let workers = self.registry.len();
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let table = Arc::clone(&self.table);
            let registry = Arc::clone(&self.registry);
            let ctx_for_worker = Arc::clone(ctx);
            let spawned = thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn(move || run_worker(index, table, registry, ctx_for_worker));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // Wake the already-spawned workers out of the rendezvous
                    // and let their cleanup run before reporting the fatal.
                    ctx.fail(format!("worker {index} failed to spawn: {err}"));
                    ctx.finish();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(HarnessError::Spawn {
                        worker: index,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(handles)
    }

    /// Prefer the first recorded worker diagnostic; fall back to naming the
    /// orchestrator wait that observed the flag.
    fn diagnose(&self, ctx: &IterationContext, at: &str) -> String {
        ctx.diagnostic()
            .unwrap_or_else(|| format!("failure flag observed {at}"))
    }
}
