//! Single-use rendezvous barrier.

use parking_lot::{Condvar, Mutex};

use crate::error::{HarnessError, HarnessResult};

struct State {
    arrived: usize,
    poisoned: bool,
}

/// A single-use barrier that releases once a fixed number of parties arrive.
///
/// Unlike [`std::sync::Barrier`], a rendezvous can be poisoned: every parked
/// party wakes with an error instead of waiting for arrivals that will never
/// come. A fresh rendezvous is created for every iteration.
pub struct Rendezvous {
    parties: usize,
    state: Mutex<State>,
    cond: Condvar,
}

impl Rendezvous {
    /// Create a rendezvous for `parties` participants.
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(State {
                arrived: 0,
                poisoned: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Arrive and block until all parties have arrived.
    ///
    /// Returns an error if the rendezvous was poisoned before or while
    /// waiting.
    pub fn arrive_and_wait(&self) -> HarnessResult<()> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(HarnessError::Abandoned("rendezvous"));
        }
        state.arrived += 1;
        if state.arrived >= self.parties {
            self.cond.notify_all();
            return Ok(());
        }
        // Release wins over poison: a barrier that filled up has already
        // done its job even if the iteration failed afterwards.
        while state.arrived < self.parties {
            if state.poisoned {
                return Err(HarnessError::Abandoned("rendezvous"));
            }
            self.cond.wait(&mut state);
        }
        Ok(())
    }

    /// Mark the rendezvous abandoned and wake every current and future waiter.
    pub fn poison(&self) {
        let mut state = self.state.lock();
        state.poisoned = true;
        self.cond.notify_all();
    }

    /// Whether the barrier has released normally.
    ///
    /// Arrivals stop counting once the rendezvous is poisoned, so the full
    /// count is only ever reached by a genuine release.
    pub fn is_released(&self) -> bool {
        self.state.lock().arrived >= self.parties
    }

    /// Number of parties that have arrived so far.
    pub fn arrived(&self) -> usize {
        self.state.lock().arrived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn does_not_release_short_of_full_count() {
        let rendezvous = Arc::new(Rendezvous::new(5));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let r = Arc::clone(&rendezvous);
            handles.push(thread::spawn(move || r.arrive_and_wait()));
        }

        // Give the four arrivals time to park; the barrier must stay closed.
        while rendezvous.arrived() < 4 {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(50));
        assert!(!rendezvous.is_released());

        rendezvous.arrive_and_wait().unwrap();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert!(rendezvous.is_released());
    }

    #[test]
    fn poison_wakes_parked_parties() {
        let rendezvous = Arc::new(Rendezvous::new(3));

        let r = Arc::clone(&rendezvous);
        let waiter = thread::spawn(move || r.arrive_and_wait());

        while rendezvous.arrived() < 1 {
            thread::sleep(Duration::from_millis(1));
        }
        rendezvous.poison();

        assert_eq!(
            waiter.join().unwrap(),
            Err(HarnessError::Abandoned("rendezvous"))
        );
    }

    #[test]
    fn arrival_after_poison_fails_immediately() {
        let rendezvous = Rendezvous::new(2);
        rendezvous.poison();
        assert_eq!(
            rendezvous.arrive_and_wait(),
            Err(HarnessError::Abandoned("rendezvous"))
        );
    }
}
