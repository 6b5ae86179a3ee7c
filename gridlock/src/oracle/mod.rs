//! Wait-for graph and the cycle oracle that reads it.
//!
//! The lock layer publishes every ownership transition here: who holds each
//! lock, and which lock each task is currently parked on. The oracle answers
//! one question — is there a set of tasks each waiting on a lock held by the
//! next task in the set — by snapshotting the tables and walking the
//! waits-for chain until a task repeats.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::{LockKind, WorkerId};

/// Index of a lock in the registry.
pub type LockIndex = usize;

#[derive(Default)]
struct GraphState {
    /// Lock index to current holder.
    holders: HashMap<LockIndex, WorkerId>,
    /// Task to the lock it is parked on, tagged with the lock's kind.
    waiting: HashMap<WorkerId, (LockIndex, LockKind)>,
}

/// Shared holder/waiter tables the lock layer publishes into.
///
/// All updates take one short critical section; readers snapshot under the
/// same mutex, so [`CycleOracle::find_cycle`] is safe to call concurrently
/// with tasks blocking and unblocking.
#[derive(Default)]
pub struct WaitGraph {
    state: Mutex<GraphState>,
}

impl WaitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `task` is about to park waiting for `lock`.
    pub(crate) fn waiting(&self, task: WorkerId, lock: LockIndex, kind: LockKind) {
        tracing::trace!(task, lock, ?kind, "waiting");
        self.state.lock().waiting.insert(task, (lock, kind));
    }

    /// Record that `task` gave up its wait without acquiring.
    pub(crate) fn wait_aborted(&self, task: WorkerId) {
        tracing::trace!(task, "wait aborted");
        self.state.lock().waiting.remove(&task);
    }

    /// Record that `task` now holds `lock`.
    pub(crate) fn acquired(&self, task: WorkerId, lock: LockIndex) {
        tracing::trace!(task, lock, "acquired");
        let mut state = self.state.lock();
        state.waiting.remove(&task);
        state.holders.insert(lock, task);
    }

    /// Record that `task` released `lock`.
    pub(crate) fn released(&self, task: WorkerId, lock: LockIndex) {
        tracing::trace!(task, lock, "released");
        let mut state = self.state.lock();
        if state.holders.get(&lock) == Some(&task) {
            state.holders.remove(&lock);
        }
    }

    /// Number of tasks currently parked on some lock.
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiting.len()
    }
}

/// Non-blocking deadlock oracle over a [`WaitGraph`].
pub struct CycleOracle {
    graph: Arc<WaitGraph>,
}

impl CycleOracle {
    /// Create an oracle reading from `graph`.
    pub fn new(graph: Arc<WaitGraph>) -> Self {
        Self { graph }
    }

    /// Return the members of a circular wait, or `None` if no cycle exists.
    ///
    /// Walks task → awaited lock → holder from every parked task until a
    /// task repeats; the walk dead-ends (and moves on) as soon as a lock is
    /// unheld or a holder is not itself waiting.
    pub fn find_cycle(&self) -> Option<BTreeSet<WorkerId>> {
        let state = self.graph.state.lock();
        state
            .waiting
            .keys()
            .find_map(|&start| Self::walk(&state, start))
    }

    fn walk(state: &GraphState, start: WorkerId) -> Option<BTreeSet<WorkerId>> {
        let mut visited: Vec<WorkerId> = Vec::new();
        let mut current = start;
        loop {
            if let Some(pos) = visited.iter().position(|&task| task == current) {
                return Some(visited[pos..].iter().copied().collect());
            }
            visited.push(current);
            let &(lock, _) = state.waiting.get(&current)?;
            current = *state.holders.get(&lock)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_over(edges: &[(WorkerId, LockIndex)], holders: &[(LockIndex, WorkerId)]) -> CycleOracle {
        let graph = Arc::new(WaitGraph::new());
        for &(lock, task) in holders {
            graph.acquired(task, lock);
        }
        for &(task, lock) in edges {
            graph.waiting(task, lock, LockKind::Explicit);
        }
        CycleOracle::new(graph)
    }

    #[test]
    fn empty_graph_has_no_cycle() {
        let oracle = oracle_over(&[], &[]);
        assert_eq!(oracle.find_cycle(), None);
    }

    #[test]
    fn open_chain_is_not_a_cycle() {
        // 0 waits on lock 1 held by 1, 1 waits on lock 2 held by nobody.
        let oracle = oracle_over(&[(0, 1), (1, 2)], &[(1, 1)]);
        assert_eq!(oracle.find_cycle(), None);
    }

    #[test]
    fn ring_of_three_is_reported_in_full() {
        let oracle = oracle_over(
            &[(0, 1), (1, 2), (2, 0)],
            &[(0, 0), (1, 1), (2, 2)],
        );
        let cycle = oracle.find_cycle().unwrap();
        assert_eq!(cycle, BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn bystander_waiter_is_not_part_of_the_cycle() {
        // 3 waits on lock 1 too, but holds nothing anyone in the ring wants.
        let oracle = oracle_over(
            &[(0, 1), (1, 0), (3, 1)],
            &[(0, 0), (1, 1)],
        );
        let cycle = oracle.find_cycle().unwrap();
        assert_eq!(cycle, BTreeSet::from([0, 1]));
    }

    #[test]
    fn cycle_dissolves_once_a_lock_is_released() {
        let graph = Arc::new(WaitGraph::new());
        graph.acquired(0, 0);
        graph.acquired(1, 1);
        graph.waiting(0, 1, LockKind::Explicit);
        graph.waiting(1, 0, LockKind::Monitor);
        let oracle = CycleOracle::new(Arc::clone(&graph));
        assert!(oracle.find_cycle().is_some());

        graph.wait_aborted(1);
        graph.released(1, 1);
        assert_eq!(oracle.find_cycle(), None);
    }
}
