//! Shared per-iteration state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::sync::{CancelToken, Countdown, Rendezvous};

/// Everything one iteration's participants share.
///
/// Created fresh for every iteration; the lock registry, wait graph, oracle,
/// and handler table live for the whole run and are deliberately *not* in
/// here, so the two lifecycles are explicit in the types rather than in
/// comments.
pub struct IterationContext {
    /// Rendezvous for N workers plus the orchestrator.
    pub(crate) rendezvous: Rendezvous,
    /// Countdown decremented by each worker once it holds its own lock.
    /// Workers and the orchestrator both wait on it: reaching zero arms the
    /// race, guaranteeing every neighbor attempt lands on a held slot.
    pub(crate) remaining: Countdown,
    tokens: Vec<Arc<CancelToken>>,
    jitter: Vec<Duration>,
    failed: AtomicBool,
    done: AtomicBool,
    diagnostic: Mutex<Option<String>>,
}

impl IterationContext {
    /// Create state for `workers` workers, with start jitter drawn from
    /// `seed`.
    pub(crate) fn new(workers: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let jitter = (0..workers)
            .map(|_| Duration::from_micros(rng.random_range(0..200)))
            .collect();
        Self {
            rendezvous: Rendezvous::new(workers + 1),
            remaining: Countdown::new(workers),
            tokens: (0..workers).map(|_| Arc::new(CancelToken::new())).collect(),
            jitter,
            failed: AtomicBool::new(false),
            done: AtomicBool::new(false),
            diagnostic: Mutex::new(None),
        }
    }

    /// Cancellation token for worker `index`.
    pub(crate) fn token(&self, index: usize) -> &CancelToken {
        &self.tokens[index]
    }

    /// Sleep worker `index`'s seeded start offset, staggering the race to
    /// form the cycle differently every iteration.
    pub(crate) fn start_jitter(&self, index: usize) {
        let jitter = self.jitter[index];
        if !jitter.is_zero() {
            thread::sleep(jitter);
        }
    }

    /// Whether teardown has begun. Cancellations observed after this point
    /// are expected; before it they invalidate the iteration.
    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Mark teardown begun.
    pub(crate) fn finish(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Whether any participant has failed the iteration.
    pub(crate) fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Record a failure and wake everything that might be parked.
    ///
    /// Only the first diagnostic is kept; later failures are usually
    /// secondary effects of the first. The diagnostic is written before the
    /// flag so an observer of the flag always finds it populated.
    pub(crate) fn fail(&self, diagnostic: String) {
        {
            let mut slot = self.diagnostic.lock();
            if slot.is_none() {
                *slot = Some(diagnostic);
            }
        }
        self.failed.store(true, Ordering::Release);
        self.rendezvous.poison();
        self.remaining.poison();
    }

    /// The first recorded failure diagnostic, if any.
    pub(crate) fn diagnostic(&self) -> Option<String> {
        self.diagnostic.lock().clone()
    }
}
