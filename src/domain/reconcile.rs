//! Reconciliation of want lists against installed state
//!
//! [`reconcile`] is pure: it looks only at its arguments and returns the
//! actions needed for one backend. All ordering is lexicographic on
//! [`Identifier`] so the same inputs always give the same plan.

use std::collections::BTreeSet;

use thiserror::Error;

use super::id::Identifier;
use super::kind::BackendKind;
use super::plan::{ActionPlan, InstalledState, Policy};

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Policy {policy} is not supported by the {kind} backend")]
    UnsupportedPolicy { kind: BackendKind, policy: Policy },
}

/// Computes the action plan for one backend
///
/// - `InstallMissing`: install `wanted - installed`.
/// - `PruneExtras`: as above, plus uninstall `explicit - wanted`, leaving out
///   anything a kept package still depends on. Without explicit tracking the
///   top-level (or whole) installed set stands in for `explicit`.
/// - `RecreateExplicit`: uninstall everything installed, then install
///   everything wanted. Install and uninstall overlap on purpose here.
///
/// For backends whose install is a no-op on a package already present as a
/// dependency, wanted packages that are installed but not explicit are moved
/// to `reinstall` so they get promoted.
///
/// Protected identifiers never appear in `uninstall`.
pub fn reconcile(
    kind: BackendKind,
    wanted: &BTreeSet<Identifier>,
    installed: &InstalledState,
    policy: Policy,
) -> Result<ActionPlan, PlanError> {
    let caps = kind.capabilities();
    if policy.effective_for(&caps) != policy {
        return Err(PlanError::UnsupportedPolicy { kind, policy });
    }

    let mut plan = ActionPlan::empty(kind, policy);

    match policy {
        Policy::InstallMissing | Policy::PruneExtras => {
            plan.install = wanted.difference(&installed.all).cloned().collect();

            if caps.reinstall_promotes {
                if let Some(explicit) = &installed.explicit {
                    plan.reinstall = wanted
                        .iter()
                        .filter(|id| installed.all.contains(*id) && !explicit.contains(*id))
                        .cloned()
                        .collect();
                }
            }

            if policy == Policy::PruneExtras {
                plan.uninstall = prune_set(kind, wanted, installed).into_iter().collect();
            }
        }
        Policy::RecreateExplicit => {
            plan.uninstall = installed
                .all
                .iter()
                .filter(|id| !kind.is_protected(id))
                .cloned()
                .collect();
            plan.install = wanted.iter().cloned().collect();
        }
    }

    Ok(plan)
}

/// Unwanted prune candidates that nothing kept depends on
///
/// Kept packages are the installed ones that stay explicit after the run:
/// wanted, protected, or explicit and not a candidate. Without explicit
/// tracking everything counts as explicit. A candidate reachable from a kept
/// package stays installed.
fn prune_set(
    kind: BackendKind,
    wanted: &BTreeSet<Identifier>,
    installed: &InstalledState,
) -> BTreeSet<Identifier> {
    let candidates: BTreeSet<Identifier> = installed
        .prunable()
        .difference(wanted)
        .filter(|id| !kind.is_protected(id))
        .cloned()
        .collect();

    let kept = installed.all.iter().filter(|id| {
        !candidates.contains(*id)
            && (wanted.contains(*id)
                || kind.is_protected(id)
                || installed.explicit_or_all().contains(*id))
    });
    let required = installed.required_by(kept);

    candidates.difference(&required).cloned().collect()
}
