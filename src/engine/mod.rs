//! # Engine
//!
//! Turns plans into actions. [`Session`] drives one run: for each backend it
//! loads the want list, snapshots the installed set, calls
//! [`reconcile`](crate::domain::reconcile) and hands the plan to the
//! [`Executor`].
//!
//! ## Batches
//!
//! A plan executes as up to two batches (install, then uninstall), or as a
//! single recreate batch. Each batch moves through
//!
//! ```text
//! Planned -> Confirmed -> Executing -> Completed
//!        \-> Aborted (dry run | declined)
//! ```
//!
//! Confirmation comes from a [`Confirm`] implementation passed in by the
//! caller; there is no global prompt state.

mod confirm;
mod executor;
mod report;
mod session;

pub use confirm::{AssumeYes, Confirm, LinePrompt, Prompt};
pub use executor::{Executor, ExecutorOptions};
pub use report::{
    AbortReason, ActionKind, BackendReport, BackendStatus, BatchKind, BatchRecord, BatchState,
    ItemResult, Outcome, RunReport, SkipReason, Totals,
};
pub use session::{RunOptions, Session};
