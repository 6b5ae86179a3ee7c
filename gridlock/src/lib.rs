//! # Gridlock
//!
//! A stress harness that deliberately manufactures a circular-wait deadlock
//! among a pool of worker threads, then verifies that a wait-graph oracle
//! reports every thread involved — and that a single targeted cancellation
//! unwinds the whole cycle afterwards.
//!
//! The workload is intentionally tiny in computational content; all of the
//! value is in the orchestration. Each iteration:
//!
//! 1. asserts the lock pool is fully free,
//! 2. spawns N workers that each take their own lock, rendezvous with the
//!    orchestrator, then race to take their neighbor's lock,
//! 3. polls the oracle until it reports a cycle of size exactly N,
//! 4. cancels exactly one worker's wait and lets the release cascade unwind
//!    the other N-1,
//! 5. joins everything and re-asserts the pool is free.
//!
//! ## Core components
//!
//! - [`LockRegistry`]: N slot locks, mixing two structurally different
//!   primitives ([`LockKind::Explicit`] and [`LockKind::Monitor`]) behind
//!   one trait
//! - [`HandlerTable`]: per-worker acquisition handlers addressed by index,
//!   with the three acquisition shapes kept as configuration data
//! - [`CycleOracle`]: non-blocking circular-wait detection over the shared
//!   [`WaitGraph`]
//! - [`HarnessBuilder`]: configure and run experiments
//!
//! ## Quick start
//!
//! ```ignore
//! use gridlock::{HarnessBuilder, IterationControl};
//!
//! let report = HarnessBuilder::new()
//!     .worker_count(12)
//!     .iteration_control(IterationControl::FixedCount(50))
//!     .run();
//! assert!(report.passed(), "{report}");
//! ```
//!
//! ## Failure model
//!
//! A worker failure never crosses its thread boundary; it trips a shared
//! flag that the orchestrator consults before committing to any blocking
//! wait, and every harness primitive is poisonable so that flag can wake
//! whoever is already parked. Teardown always runs, pass or fail, and a
//! lock still held at an iteration boundary is a fatal harness defect, not
//! a test failure.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod handler;
pub mod oracle;
pub mod registry;
pub mod runner;
pub mod sync;

pub use error::{HarnessError, HarnessResult};
pub use handler::{pattern_for, AttemptMode, FaultPlan, FaultPoint, HandlerTable, PatternSpec};
pub use oracle::{CycleOracle, LockIndex, WaitGraph};
pub use registry::{AcquireOutcome, LockKind, LockRegistry, SlotLock, WorkerId};
pub use runner::{
    HarnessBuilder, Holdings, IterationContext, IterationControl, IterationReport, StressReport,
};
pub use sync::{CancelToken, Countdown, Rendezvous, WakeTarget};
