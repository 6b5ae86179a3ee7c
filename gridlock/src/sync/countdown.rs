//! Countdown completion signal.

use parking_lot::{Condvar, Mutex};

use crate::error::{HarnessError, HarnessResult};

struct State {
    remaining: usize,
    poisoned: bool,
}

/// A countdown latch releasing waiters once a fixed number of decrements
/// have occurred.
///
/// The orchestrator waits on this to learn that every worker has passed the
/// rendezvous and is approaching its blocking acquisition. Poisonable for
/// the same reason as [`Rendezvous`](super::Rendezvous): a worker that dies
/// before decrementing must not strand the orchestrator.
pub struct Countdown {
    state: Mutex<State>,
    cond: Condvar,
}

impl Countdown {
    /// Create a countdown initialized to `count`.
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(State {
                remaining: count,
                poisoned: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Decrement the count, waking waiters when it reaches zero.
    pub fn count_down(&self) {
        let mut state = self.state.lock();
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            self.cond.notify_all();
        }
    }

    /// Block until the count reaches zero.
    ///
    /// Returns an error if the countdown was poisoned before or while
    /// waiting.
    pub fn wait(&self) -> HarnessResult<()> {
        let mut state = self.state.lock();
        // Completion wins over poison, as with the rendezvous.
        while state.remaining > 0 {
            if state.poisoned {
                return Err(HarnessError::Abandoned("countdown"));
            }
            self.cond.wait(&mut state);
        }
        Ok(())
    }

    /// Mark the countdown abandoned and wake every waiter.
    pub fn poison(&self) {
        let mut state = self.state.lock();
        state.poisoned = true;
        self.cond.notify_all();
    }

    /// Decrements still outstanding.
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn releases_after_all_decrements() {
        let countdown = Arc::new(Countdown::new(3));

        let c = Arc::clone(&countdown);
        let waiter = thread::spawn(move || c.wait());

        for _ in 0..3 {
            countdown.count_down();
        }
        waiter.join().unwrap().unwrap();
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn zero_count_releases_immediately() {
        let countdown = Countdown::new(0);
        countdown.wait().unwrap();
    }

    #[test]
    fn poison_wakes_waiters() {
        let countdown = Arc::new(Countdown::new(2));

        let c = Arc::clone(&countdown);
        let waiter = thread::spawn(move || c.wait());

        countdown.count_down();
        countdown.poison();

        assert_eq!(
            waiter.join().unwrap(),
            Err(HarnessError::Abandoned("countdown"))
        );
    }
}
