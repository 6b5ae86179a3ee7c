//! Abandonment-aware synchronization primitives.
//!
//! The harness deliberately drives worker threads into blocking waits, so
//! every primitive a worker or the orchestrator can park in must be wakeable
//! when the iteration is abandoned early. std's `Barrier` and channel types
//! offer no such escape hatch; these do, via `poison()`.

pub mod cancel;
pub mod countdown;
pub mod rendezvous;

pub use cancel::{CancelToken, WakeTarget};
pub use countdown::Countdown;
pub use rendezvous::Rendezvous;
