//! Harness error types.

use thiserror::Error;

/// Errors surfaced by the stress harness.
///
/// Setup-class variants (`LockLeak`, `SlotBoundTwice`, `UnboundSlot`,
/// `Spawn`, `Config`) abort the whole run. The remaining variants describe
/// per-iteration failures and travel through the shared failure flag rather
/// than across thread boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// A lock was still held at an iteration boundary.
    #[error("lock {lock} still held by worker {holder} at iteration {iteration} boundary")]
    LockLeak {
        /// Index of the leaked lock.
        lock: usize,
        /// Worker that still holds it.
        holder: usize,
        /// Iteration whose boundary check failed.
        iteration: u64,
    },
    /// A handler slot was bound a second time.
    #[error("handler slot {0} bound twice")]
    SlotBoundTwice(usize),
    /// A worker index resolved to no bound handler.
    #[error("no handler bound for slot {0}")]
    UnboundSlot(usize),
    /// Spawning a worker thread failed.
    #[error("failed to spawn worker {worker}: {reason}")]
    Spawn {
        /// Worker that could not be spawned.
        worker: usize,
        /// Underlying OS error, stringified.
        reason: String,
    },
    /// The harness configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A cancellable acquisition was cancelled before teardown began.
    ///
    /// Cancellation is only expected once the iteration is winding down; an
    /// earlier one means the cycle broke on its own and the run is invalid.
    #[error("worker {worker}: acquisition of lock {lock} cancelled before teardown")]
    PrematureCancel {
        /// Worker whose acquisition was cancelled.
        worker: usize,
        /// Lock it was trying to take.
        lock: usize,
    },
    /// A rendezvous or countdown wait was abandoned after a failure elsewhere.
    #[error("{0} abandoned after harness failure")]
    Abandoned(&'static str),
    /// Failure injected by a test fault plan.
    #[error("worker {worker}: injected fault {point}")]
    InjectedFault {
        /// Worker the fault was aimed at.
        worker: usize,
        /// Injection point label.
        point: &'static str,
    },
}

/// A type alias for `Result<T, HarnessError>`.
pub type HarnessResult<T> = Result<T, HarnessError>;
