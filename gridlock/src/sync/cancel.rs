//! Targeted cancellation for cancellable lock acquisitions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Something a cancellation can rouse: the wait queue of whichever lock the
/// token's owner is currently parked in.
pub trait WakeTarget: Send + Sync {
    /// Wake every thread parked on this target.
    fn wake(&self);
}

/// Per-worker cancellation handle for cancellable acquisitions.
///
/// A lock registers itself as the token's wake target just before parking
/// the owner, so `cancel()` knows exactly which wait queue to rouse. The
/// cancelled bit is consulted by the lock layer *before* first parking, so a
/// cancellation that lands before the acquisition call is even entered is
/// observed immediately rather than being mistaken for an acquisition.
#[derive(Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    parked_in: Mutex<Option<Arc<dyn WakeTarget>>>,
}

impl CancelToken {
    /// Create a token in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancel the token and wake the wait its owner is parked in, if any.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let target = self.parked_in.lock().clone();
        if let Some(target) = target {
            target.wake();
        }
    }

    /// Record the wait the owner is about to park in.
    pub(crate) fn park_in(&self, target: Arc<dyn WakeTarget>) {
        *self.parked_in.lock() = Some(target);
    }

    /// Clear the wait registration once the owner is no longer parked.
    pub(crate) fn unpark(&self) {
        *self.parked_in.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingTarget(AtomicBool);

    impl WakeTarget for CountingTarget {
        fn wake(&self) {
            self.0.store(true, Ordering::Release);
        }
    }

    #[test]
    fn cancel_wakes_registered_target() {
        let token = CancelToken::new();
        let target = Arc::new(CountingTarget(AtomicBool::new(false)));
        token.park_in(target.clone());

        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(target.0.load(Ordering::Acquire));
    }

    #[test]
    fn cancel_without_registration_only_sets_flag() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
