//! Reentrant monitor-style lock.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use super::{AcquireOutcome, LockKind, SlotLock, WorkerId};
use crate::oracle::WaitGraph;
use crate::sync::{CancelToken, WakeTarget};

#[derive(Default)]
struct MonitorState {
    owner: Option<WorkerId>,
    entries: u32,
}

/// Monitor-style slot: reentrant, owner plus entry count, built on
/// `std::sync` primitives rather than the explicit lock's parking_lot
/// internals so the two slot kinds exercise the oracle through structurally
/// different wait machinery.
pub struct MonitorLock {
    inner: Arc<Inner>,
}

struct Inner {
    index: usize,
    state: Mutex<MonitorState>,
    cond: Condvar,
    graph: Arc<WaitGraph>,
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        // Monitor state is a pair of plain words; a panic elsewhere cannot
        // leave it torn, so a poisoned guard is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WakeTarget for Inner {
    fn wake(&self) {
        // Same ordering argument as the explicit lock: hold the state mutex
        // so the notification cannot land between a check and a park.
        let _state = self.lock_state();
        self.cond.notify_all();
    }
}

impl MonitorLock {
    /// Create the monitor for slot `index`, publishing into `graph`.
    pub fn new(index: usize, graph: Arc<WaitGraph>) -> Self {
        Self {
            inner: Arc::new(Inner {
                index,
                state: Mutex::new(MonitorState::default()),
                cond: Condvar::new(),
                graph,
            }),
        }
    }
}

impl SlotLock for MonitorLock {
    fn kind(&self) -> LockKind {
        LockKind::Monitor
    }

    fn acquire(&self, task: WorkerId) {
        let inner = &self.inner;
        let mut state = inner.lock_state();
        if state.owner == Some(task) {
            state.entries += 1;
            return;
        }
        if state.owner.is_none() {
            state.owner = Some(task);
            state.entries = 1;
            inner.graph.acquired(task, inner.index);
            return;
        }
        inner.graph.waiting(task, inner.index, LockKind::Monitor);
        while state.owner.is_some() {
            state = inner
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.owner = Some(task);
        state.entries = 1;
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
        let mut state = inner.lock_state();
        debug_assert_eq!(state.owner, Some(task), "monitor exit by non-owner");
        state.entries = state.entries.saturating_sub(1);
        if state.entries == 0 {
            state.owner = None;
            inner.graph.released(task, inner.index);
            inner.cond.notify_all();
        }
    }

    fn holder(&self) -> Option<WorkerId> {
        self.inner.lock_state().owner
    }
}

impl MonitorLock {
    fn acquire_cancellable_slow(&self, task: WorkerId, token: &CancelToken) -> AcquireOutcome {
        let inner = &self.inner;
        let mut state = inner.lock_state();
        if state.owner == Some(task) {
            state.entries += 1;
            return AcquireOutcome::Acquired;
        }
        if state.owner.is_none() && !token.is_cancelled() {
            state.owner = Some(task);
            state.entries = 1;
            inner.graph.acquired(task, inner.index);
            return AcquireOutcome::Acquired;
        }
        inner.graph.waiting(task, inner.index, LockKind::Monitor);
        loop {
            if token.is_cancelled() {
                inner.graph.wait_aborted(task);
                return AcquireOutcome::Cancelled;
            }
            if state.owner.is_none() {
                state.owner = Some(task);
                state.entries = 1;
                inner.graph.acquired(task, inner.index);
                return AcquireOutcome::Acquired;
            }
            state = inner
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
