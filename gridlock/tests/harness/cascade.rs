//! Cascade law: cancelling exactly one member of the cycle unwinds all of
//! it, because every worker's cleanup releases whatever it holds on its own
//! thread's way out.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gridlock::{
    AcquireOutcome, CancelToken, CycleOracle, LockRegistry, Rendezvous, SlotLock, WaitGraph,
};

#[test]
fn one_cancellation_unwinds_the_whole_ring() {
    let workers = 3;
    let graph = Arc::new(WaitGraph::new());
    let registry = Arc::new(LockRegistry::new(workers, Arc::clone(&graph)));
    let oracle = CycleOracle::new(Arc::clone(&graph));
    let rendezvous = Arc::new(Rendezvous::new(workers + 1));
    let tokens: Vec<_> = (0..workers).map(|_| Arc::new(CancelToken::new())).collect();

    let mut handles = Vec::new();
    for n in 0..workers {
        let registry = Arc::clone(&registry);
        let rendezvous = Arc::clone(&rendezvous);
        let token = Arc::clone(&tokens[n]);
        handles.push(thread::spawn(move || {
            registry.slot(n).acquire(n);
            rendezvous.arrive_and_wait().unwrap();
            let next = (n + 1) % workers;
            match registry.slot(next).acquire_cancellable(n, &token) {
                AcquireOutcome::Acquired => {
                    registry.slot(next).release(n);
                }
                AcquireOutcome::Cancelled => {}
            }
            registry.slot(n).release(n);
        }));
    }

    // Join the rendezvous, then wait for the ring to close.
    rendezvous.arrive_and_wait().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    let cycle = loop {
        if let Some(cycle) = oracle.find_cycle() {
            break cycle;
        }
        assert!(Instant::now() < deadline, "ring never closed");
        thread::sleep(Duration::from_millis(1));
    };
    assert_eq!(cycle.len(), workers);

    // One targeted cancellation; no other worker is touched.
    tokens[0].cancel();
    for handle in handles {
        handle.join().unwrap();
    }

    registry.assert_all_free(0).unwrap();
    assert_eq!(graph.waiter_count(), 0);
    assert_eq!(oracle.find_cycle(), None);
}
