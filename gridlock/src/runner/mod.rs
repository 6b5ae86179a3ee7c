//! Stress run orchestration.
//!
//! ## Submodules
//!
//! - `builder` - HarnessBuilder for configuring runs
//! - `context` - shared per-iteration state
//! - `orchestrator` - the iteration state machine
//! - `report` - IterationReport and StressReport types
//! - `worker` - the worker thread body

pub mod builder;
pub mod context;
pub(crate) mod orchestrator;
pub mod report;
pub mod worker;

pub use builder::{HarnessBuilder, IterationControl};
pub use context::IterationContext;
pub use report::{IterationReport, StressReport};
pub use worker::Holdings;
