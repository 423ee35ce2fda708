//! Domain models for pkgsync
//!
//! Contains the reconciliation logic without any I/O concerns.

mod graph;
mod id;
mod kind;
mod plan;
mod reconcile;

pub use graph::{GraphError, PackageGraph, RemovalSchedule};
pub use id::{IdError, Identifier};
pub use kind::{BackendKind, Capabilities, LineShape, VersionRule, COMMENT_MARKER, EXTENSION_ID_MIN_LEN};
pub use plan::{ActionPlan, InstalledState, Policy};
pub use reconcile::{reconcile, PlanError};
