//! Fixed pool of slot locks, one per worker.
//!
//! Two lock kinds live behind one object-safe trait so worker logic stays
//! primitive-agnostic: an explicit manual-state lock and a reentrant
//! monitor-style lock built on structurally different foundations. Which
//! kind a slot gets follows from its index, so a pool of three or more
//! always mixes both kinds in the wait cycle.

pub mod explicit;
pub mod monitor;

use std::sync::Arc;

pub use explicit::ExplicitLock;
pub use monitor::MonitorLock;

use crate::error::{HarnessError, HarnessResult};
use crate::oracle::WaitGraph;
use crate::sync::CancelToken;

/// Worker identifier: the worker's index in the pool.
pub type WorkerId = usize;

/// Which primitive backs a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// Manual-state lock with a cancellable slow path.
    Explicit,
    /// Reentrant monitor-style lock.
    Monitor,
}

/// Result of a cancellable acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller now holds the lock.
    Acquired,
    /// The wait was cancelled; the lock was not taken and no state changed.
    Cancelled,
}

/// One mutual-exclusion slot in the registry.
///
/// `release` requires that the caller actually holds the slot; callers track
/// their own holdings and the harness verifies the pool is fully free at
/// every iteration boundary.
pub trait SlotLock: Send + Sync {
    /// The primitive backing this slot.
    fn kind(&self) -> LockKind;

    /// Block until the slot is free, then take it. Not cancellable; blocking
    /// here forever is the intended behavior on the deadlocking path.
    fn acquire(&self, task: WorkerId);

    /// Block until the slot is free or `token` is cancelled.
    fn acquire_cancellable(&self, task: WorkerId, token: &CancelToken) -> AcquireOutcome;

    /// Give the slot up. Caller must hold it.
    fn release(&self, task: WorkerId);

    /// Whether the slot is currently unheld.
    fn is_free(&self) -> bool {
        self.holder().is_none()
    }

    /// Current holder, if any.
    fn holder(&self) -> Option<WorkerId>;
}

/// Ordered pool of N slot locks, created once per harness and reused across
/// iterations.
pub struct LockRegistry {
    slots: Vec<Box<dyn SlotLock>>,
}

impl LockRegistry {
    /// Create a pool of `workers` slots publishing into `graph`.
    pub fn new(workers: usize, graph: Arc<WaitGraph>) -> Self {
        let slots = (0..workers)
            .map(|index| -> Box<dyn SlotLock> {
                match Self::kind_for(index) {
                    LockKind::Monitor => Box::new(MonitorLock::new(index, Arc::clone(&graph))),
                    LockKind::Explicit => Box::new(ExplicitLock::new(index, Arc::clone(&graph))),
                }
            })
            .collect();
        Self { slots }
    }

    /// The kind assigned to slot `index`.
    pub fn kind_for(index: usize) -> LockKind {
        if index % 3 == 2 {
            LockKind::Monitor
        } else {
            LockKind::Explicit
        }
    }

    /// Number of slots in the pool.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Borrow slot `index`.
    pub fn slot(&self, index: usize) -> &dyn SlotLock {
        self.slots[index].as_ref()
    }

    /// Whether slot `index` is unheld.
    pub fn is_free(&self, index: usize) -> bool {
        self.slots[index].is_free()
    }

    /// Verify every slot is free, naming the first leak otherwise.
    pub fn assert_all_free(&self, iteration: u64) -> HarnessResult<()> {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(holder) = slot.holder() {
                return Err(HarnessError::LockLeak {
                    lock: index,
                    holder,
                    iteration,
                });
            }
        }
        Ok(())
    }
}
