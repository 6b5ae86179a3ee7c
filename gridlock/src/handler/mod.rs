//! Per-worker acquisition handlers, addressed purely by numeric index.
//!
//! Each worker reaches its lock-acquisition logic through a slot in this
//! table rather than calling it directly; the table is the indirection
//! layer between "worker number n" and "what worker n does". A slot's
//! behavior is one of three acquisition shapes, kept as configuration data
//! in [`PATTERNS`] — never written out per index.
//!
//! Binding is two-phase: every slot is bound exactly once when the harness
//! is built, and the bound closure then runs once per worker per iteration.
//! Binding a slot twice is a fatal setup error.
//!
//! The rendezvous arrival, countdown decrement, and next-lock attempt all
//! happen *inside* the handler body, so each shape places the blocking
//! attempt at its own precise point — notably, inside the held monitor for
//! the deferred shape.

use std::fmt;
use std::sync::Arc;

use crate::error::{HarnessError, HarnessResult};
use crate::registry::{AcquireOutcome, LockRegistry, SlotLock};
use crate::runner::context::IterationContext;
use crate::runner::worker::Holdings;

/// How a worker goes after its neighbor's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptMode {
    /// Cancellable wait; broken from outside at teardown.
    Cancellable,
    /// Plain blocking wait; broken only by the release cascade.
    Blocking,
}

/// One acquisition shape, as configuration data.
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    /// Defer taking the own lock until after the rendezvous.
    pub defer_own: bool,
    /// How the next worker's lock is attempted.
    pub next_mode: AttemptMode,
    /// Release the next lock inside the body, before the own lock is let go.
    pub release_next_in_body: bool,
}

/// The three acquisition shapes, indexed by `worker % 3`.
///
/// Shape 0 takes its own lock up front and attempts the next cancellably.
/// Shape 1 takes its own lock up front and attempts the next with a plain
/// blocking wait. Shape 2 defers its own (monitor-kind) lock until after
/// the rendezvous and attempts the next cancellably from inside it,
/// releasing the next lock again before the monitor is exited.
pub const PATTERNS: [PatternSpec; 3] = [
    PatternSpec {
        defer_own: false,
        next_mode: AttemptMode::Cancellable,
        release_next_in_body: false,
    },
    PatternSpec {
        defer_own: false,
        next_mode: AttemptMode::Blocking,
        release_next_in_body: false,
    },
    PatternSpec {
        defer_own: true,
        next_mode: AttemptMode::Cancellable,
        release_next_in_body: true,
    },
];

/// The shape assigned to worker `index`.
pub fn pattern_for(index: usize) -> PatternSpec {
    PATTERNS[index % 3]
}

/// Where a test fault fires inside a handler body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Fail before arriving at the rendezvous.
    BeforeRendezvous,
    /// Fail after the rendezvous, before attempting the next lock.
    BeforeAttempt,
}

impl FaultPoint {
    fn label(self) -> &'static str {
        match self {
            FaultPoint::BeforeRendezvous => "before-rendezvous",
            FaultPoint::BeforeAttempt => "before-attempt",
        }
    }
}

impl fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inject one failure into one worker's handler body.
#[derive(Debug, Clone, Copy)]
pub struct FaultPlan {
    /// Worker the fault is aimed at.
    pub worker: usize,
    /// Where in the body it fires.
    pub point: FaultPoint,
}

/// Type-erased handler body for one slot.
type HandlerFn =
    Box<dyn Fn(&IterationContext, &mut Holdings) -> HarnessResult<()> + Send + Sync>;

/// The handler table: N slots, each bound once, invoked by index.
pub struct HandlerTable {
    registry: Arc<LockRegistry>,
    fault: Option<FaultPlan>,
    handlers: Vec<Option<HandlerFn>>,
}

impl HandlerTable {
    /// Create a table with one unbound slot per registry entry.
    pub fn new(registry: Arc<LockRegistry>, fault: Option<FaultPlan>) -> Self {
        let handlers = (0..registry.len()).map(|_| None).collect();
        Self {
            registry,
            fault,
            handlers,
        }
    }

    /// Bind every slot. Part of harness setup.
    pub fn bind_all(&mut self) -> HarnessResult<()> {
        for index in 0..self.handlers.len() {
            self.bind_slot(index)?;
        }
        Ok(())
    }

    /// Bind slot `index` to its assigned shape. Binding an already-bound
    /// slot is a fatal setup error.
    pub fn bind_slot(&mut self, index: usize) -> HarnessResult<()> {
        let registry = Arc::clone(&self.registry);
        let fault = self.fault;
        let pattern = pattern_for(index);
        let slot = self
            .handlers
            .get_mut(index)
            .ok_or(HarnessError::UnboundSlot(index))?;
        if slot.is_some() {
            return Err(HarnessError::SlotBoundTwice(index));
        }
        *slot = Some(Box::new(move |ctx, holdings| {
            run_body(index, pattern, &registry, fault, ctx, holdings)
        }));
        Ok(())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve slot `index` and run its body.
    pub fn invoke(
        &self,
        index: usize,
        ctx: &IterationContext,
        holdings: &mut Holdings,
    ) -> HarnessResult<()> {
        match self.handlers.get(index) {
            Some(Some(handler)) => handler(ctx, holdings),
            _ => Err(HarnessError::UnboundSlot(index)),
        }
    }
}

/// One worker's acquisition sequence for one iteration.
fn run_body(
    index: usize,
    pattern: PatternSpec,
    registry: &LockRegistry,
    fault: Option<FaultPlan>,
    ctx: &IterationContext,
    holdings: &mut Holdings,
) -> HarnessResult<()> {
    let next = (index + 1) % registry.len();

    if !pattern.defer_own {
        registry.slot(index).acquire(index);
        holdings.own = true;
        tracing::debug!(worker = index, "own lock taken");
    }

    if let Some(plan) = fault {
        if plan.worker == index && plan.point == FaultPoint::BeforeRendezvous {
            return Err(HarnessError::InjectedFault {
                worker: index,
                point: plan.point.label(),
            });
        }
    }

    ctx.rendezvous.arrive_and_wait()?;

    if pattern.defer_own {
        // Uncontended: nobody attempts this slot until the countdown below
        // reaches zero, and that needs this worker's own decrement first.
        registry.slot(index).acquire(index);
        holdings.own = true;
        tracing::debug!(worker = index, "own lock taken (deferred)");
    }

    // The countdown arms the race: once it reaches zero every worker holds
    // its own lock, so every attempt below lands on a held slot and the
    // ring always closes at full size. The attempts themselves stay
    // unordered.
    ctx.remaining.count_down();
    ctx.remaining.wait()?;
    ctx.start_jitter(index);

    if let Some(plan) = fault {
        if plan.worker == index && plan.point == FaultPoint::BeforeAttempt {
            return Err(HarnessError::InjectedFault {
                worker: index,
                point: plan.point.label(),
            });
        }
    }

    tracing::debug!(worker = index, lock = next, mode = ?pattern.next_mode, "attempting next lock");
    match pattern.next_mode {
        AttemptMode::Blocking => {
            registry.slot(next).acquire(index);
            holdings.next = true;
        }
        AttemptMode::Cancellable => match registry.slot(next).acquire_cancellable(index, ctx.token(index)) {
            AcquireOutcome::Acquired => holdings.next = true,
            AcquireOutcome::Cancelled => {
                if !ctx.is_done() {
                    return Err(HarnessError::PrematureCancel {
                        worker: index,
                        lock: next,
                    });
                }
                tracing::debug!(worker = index, lock = next, "cancelled at teardown");
            }
        },
    }

    if pattern.release_next_in_body && holdings.next {
        registry.slot(next).release(index);
        holdings.next = false;
    }

    Ok(())
}
