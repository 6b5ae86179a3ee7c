//! Manual-state explicit lock.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::{AcquireOutcome, LockKind, SlotLock, WorkerId};
use crate::oracle::WaitGraph;
use crate::sync::{CancelToken, WakeTarget};

/// Non-reentrant lock with an owner word and a wait queue, supporting a
/// cancellable slow path.
///
/// This is the "explicit" slot kind: ownership is a plain
/// `Option<WorkerId>` the lock manages by hand, and acquisition order is
/// whatever the wait queue wakes. Contrast with
/// [`MonitorLock`](super::MonitorLock), which models a runtime's built-in
/// monitor.
pub struct ExplicitLock {
    inner: Arc<Inner>,
}

struct Inner {
    index: usize,
    owner: Mutex<Option<WorkerId>>,
    cond: Condvar,
    graph: Arc<WaitGraph>,
}

impl WakeTarget for Inner {
    fn wake(&self) {
        // Taking the owner mutex first means a cancelling thread cannot slip
        // its notification between a waiter's cancelled-check and its park.
        let _owner = self.owner.lock();
        self.cond.notify_all();
    }
}

impl ExplicitLock {
    /// Create the lock for slot `index`, publishing into `graph`.
    pub fn new(index: usize, graph: Arc<WaitGraph>) -> Self {
        Self {
            inner: Arc::new(Inner {
                index,
                owner: Mutex::new(None),
                cond: Condvar::new(),
                graph,
            }),
        }
    }
}

impl SlotLock for ExplicitLock {
    fn kind(&self) -> LockKind {
        LockKind::Explicit
    }

    fn acquire(&self, task: WorkerId) {
        let inner = &self.inner;
        let mut owner = inner.owner.lock();
        if owner.is_none() {
            *owner = Some(task);
            inner.graph.acquired(task, inner.index);
            return;
        }
        // Slow path: publish the wait before parking.
        inner.graph.waiting(task, inner.index, LockKind::Explicit);
        while owner.is_some() {
            inner.cond.wait(&mut owner);
        }
        *owner = Some(task);
        inner.graph.acquired(task, inner.index);
    }

    fn acquire_cancellable(&self, task: WorkerId, token: &CancelToken) -> AcquireOutcome {
        if token.is_cancelled() {
            return AcquireOutcome::Cancelled;
        }
        token.park_in(Arc::clone(&self.inner) as Arc<dyn WakeTarget>);
        let outcome = self.acquire_cancellable_slow(task, token);
        token.unpark();
        outcome
    }

    fn release(&self, task: WorkerId) {
        let inner = &self.inner;
        let mut owner = inner.owner.lock();
        debug_assert_eq!(*owner, Some(task), "release by non-holder");
        *owner = None;
        inner.graph.released(task, inner.index);
        inner.cond.notify_all();
    }

    fn holder(&self) -> Option<WorkerId> {
        *self.inner.owner.lock()
    }
}

impl ExplicitLock {
    fn acquire_cancellable_slow(&self, task: WorkerId, token: &CancelToken) -> AcquireOutcome {
        let inner = &self.inner;
        let mut owner = inner.owner.lock();
        if owner.is_none() && !token.is_cancelled() {
            *owner = Some(task);
            inner.graph.acquired(task, inner.index);
            return AcquireOutcome::Acquired;
        }
        inner.graph.waiting(task, inner.index, LockKind::Explicit);
        loop {
            if token.is_cancelled() {
                inner.graph.wait_aborted(task);
                return AcquireOutcome::Cancelled;
            }
            if owner.is_none() {
                *owner = Some(task);
                inner.graph.acquired(task, inner.index);
                return AcquireOutcome::Acquired;
            }
            inner.cond.wait(&mut owner);
        }
    }
}
