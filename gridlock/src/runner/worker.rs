//! Worker thread body.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::HarnessError;
use crate::handler::HandlerTable;
use crate::registry::{LockRegistry, SlotLock};
use crate::runner::context::IterationContext;

/// Transient per-iteration ownership record, used only to get the
/// unwind-on-exit order right: next lock first, own lock second, and only
/// the ones actually held.
#[derive(Debug, Default, Clone, Copy)]
pub struct Holdings {
    /// Worker currently holds its own slot.
    pub own: bool,
    /// Worker currently holds the next worker's slot.
    pub next: bool,
}

/// Run one worker to completion for one iteration.
///
/// Failures never cross the thread boundary as panics or results; they are
/// recorded on the shared context for the orchestrator to observe at its
/// next wait point. Lock cleanup runs on every exit path, including after a
/// caught panic, so a failed worker cannot leak slots into the next
/// iteration.
pub(crate) fn run_worker(
    index: usize,
    table: Arc<HandlerTable>,
    registry: Arc<LockRegistry>,
    ctx: Arc<IterationContext>,
) {
    let mut holdings = Holdings::default();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        table.invoke(index, &ctx, &mut holdings)
    }));

    match result {
        Ok(Ok(())) => {}
        Ok(Err(HarnessError::Abandoned(what))) => {
            // Secondary wake-up after a failure elsewhere; the original
            // diagnostic is already recorded.
            tracing::debug!(worker = index, what, "wait abandoned");
            ctx.fail(format!("worker {index}: {what} abandoned"));
        }
        Ok(Err(err)) => {
            tracing::error!(worker = index, %err, "worker failed");
            ctx.fail(format!("worker {index}: {err}"));
        }
        Err(payload) => {
            let cause = panic_message(payload.as_ref());
            tracing::error!(worker = index, cause, "worker panicked");
            ctx.fail(format!("worker {index} panicked: {cause}"));
        }
    }

    let next = (index + 1) % registry.len();
    if holdings.next {
        registry.slot(next).release(index);
    }
    if holdings.own {
        registry.slot(index).release(index);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
