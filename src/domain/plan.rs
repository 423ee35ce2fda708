//! Policies, installed-state snapshots and action plans

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::graph::PackageGraph;
use super::id::Identifier;
use super::kind::{BackendKind, Capabilities};

/// How a backend's installed set is brought in line with its want list
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Install what is wanted and missing; never remove anything
    #[default]
    InstallMissing,
    /// Also remove explicit installs that are not wanted
    PruneExtras,
    /// Tear down the explicit set and rebuild it from the want list
    RecreateExplicit,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::InstallMissing => "install_missing",
            Policy::PruneExtras => "prune_extras",
            Policy::RecreateExplicit => "recreate_explicit",
        }
    }

    /// Policy actually applied to a backend with the given capabilities
    ///
    /// Report-only backends only ever report missing items. Backends that
    /// cannot tell explicit installs from dependencies prune instead of
    /// recreating.
    pub fn effective_for(self, caps: &Capabilities) -> Policy {
        if !caps.mutating {
            return Policy::InstallMissing;
        }
        match self {
            Policy::RecreateExplicit if !caps.recreate => Policy::PruneExtras,
            other => other,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of what a backend has installed
///
/// `explicit` and `top_level` are `None` when the backend cannot tell
/// explicit installs from dependency-pulled ones; planning then treats the
/// whole installed set as explicit, trading precision for safety of intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstalledState {
    /// Everything installed
    pub all: BTreeSet<Identifier>,

    /// Installed on request (not only as a dependency)
    pub explicit: Option<BTreeSet<Identifier>>,

    /// Installed and not required by anything else installed
    pub top_level: Option<BTreeSet<Identifier>>,

    /// Installed package -> installed packages it depends on
    ///
    /// Empty when the backend does not report dependencies.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<Identifier, BTreeSet<Identifier>>,
}

impl InstalledState {
    /// A snapshot with no explicit/dependency distinction
    pub fn flat(all: BTreeSet<Identifier>) -> Self {
        Self {
            all,
            explicit: None,
            top_level: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// Records dependency edges from a graph of the installed set
    pub fn with_graph(mut self, graph: &PackageGraph) -> Self {
        self.dependencies = graph
            .packages()
            .into_iter()
            .filter_map(|pkg| {
                let deps = graph.dependencies(&pkg);
                (!deps.is_empty()).then_some((pkg, deps))
            })
            .collect();
        self
    }

    pub fn supports_explicit_tracking(&self) -> bool {
        self.explicit.is_some()
    }

    /// Explicit subset, falling back to everything installed
    pub fn explicit_or_all(&self) -> &BTreeSet<Identifier> {
        self.explicit.as_ref().unwrap_or(&self.all)
    }

    /// Prune candidates: explicit subset, else top-level, else everything
    ///
    /// Packages pulled in only as dependencies are never candidates; the
    /// backend's own cleanup removes them once orphaned.
    pub fn prunable(&self) -> &BTreeSet<Identifier> {
        self.explicit
            .as_ref()
            .or(self.top_level.as_ref())
            .unwrap_or(&self.all)
    }

    /// Every installed package reachable from `roots` through dependencies,
    /// roots included
    pub fn required_by<'a, I>(&self, roots: I) -> BTreeSet<Identifier>
    where
        I: IntoIterator<Item = &'a Identifier>,
    {
        let mut seen = BTreeSet::new();
        let mut queue: Vec<&Identifier> = roots.into_iter().collect();
        while let Some(pkg) = queue.pop() {
            if !self.all.contains(pkg) || !seen.insert(pkg.clone()) {
                continue;
            }
            if let Some(deps) = self.dependencies.get(pkg) {
                queue.extend(deps.iter());
            }
        }
        seen
    }

    /// Graph of the installed set built from the recorded dependencies
    pub fn graph(&self) -> PackageGraph {
        PackageGraph::from_dependencies(self.all.iter().map(|pkg| {
            let deps = self.dependencies.get(pkg).cloned().unwrap_or_default();
            (pkg.clone(), deps)
        }))
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.all.contains(id)
    }
}

/// Actions computed for one backend
///
/// The three sequences are disjoint and sorted by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    pub kind: BackendKind,
    pub policy: Policy,
    pub install: Vec<Identifier>,
    pub uninstall: Vec<Identifier>,
    pub reinstall: Vec<Identifier>,
}

impl ActionPlan {
    pub fn empty(kind: BackendKind, policy: Policy) -> Self {
        Self {
            kind,
            policy,
            install: Vec::new(),
            uninstall: Vec::new(),
            reinstall: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.uninstall.is_empty() && self.reinstall.is_empty()
    }

    /// Total number of actions
    pub fn len(&self) -> usize {
        self.install.len() + self.uninstall.len() + self.reinstall.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<Identifier> {
        items.iter().map(|s| Identifier::new(*s).unwrap()).collect()
    }

    #[test]
    fn report_only_backends_never_mutate() {
        let caps = BackendKind::Apps.capabilities();
        assert_eq!(Policy::PruneExtras.effective_for(&caps), Policy::InstallMissing);
        assert_eq!(Policy::RecreateExplicit.effective_for(&caps), Policy::InstallMissing);
    }

    #[test]
    fn recreate_falls_back_to_prune() {
        let caps = BackendKind::Npm.capabilities();
        assert_eq!(Policy::RecreateExplicit.effective_for(&caps), Policy::PruneExtras);

        let caps = BackendKind::Formula.capabilities();
        assert_eq!(Policy::RecreateExplicit.effective_for(&caps), Policy::RecreateExplicit);
    }

    #[test]
    fn prunable_prefers_explicit() {
        let state = InstalledState {
            all: set(&["a", "b", "c"]),
            explicit: Some(set(&["a", "b"])),
            top_level: Some(set(&["a", "c"])),
            ..InstalledState::default()
        };
        assert_eq!(state.prunable(), &set(&["a", "b"]));

        let untracked = InstalledState {
            explicit: None,
            ..state
        };
        assert_eq!(untracked.prunable(), &set(&["a", "c"]));
    }

    #[test]
    fn required_by_follows_dependencies() {
        let mut graph = PackageGraph::new();
        for pkg in ["wget", "openssl", "ca", "jq"] {
            graph.add_package(Identifier::new(pkg).unwrap());
        }
        let id = |s: &str| Identifier::new(s).unwrap();
        graph.add_dependency(&id("wget"), &id("openssl")).unwrap();
        graph.add_dependency(&id("openssl"), &id("ca")).unwrap();

        let state = InstalledState::flat(graph.packages()).with_graph(&graph);
        assert_eq!(state.dependencies.len(), 2);
        assert_eq!(state.required_by([&id("wget")]), set(&["ca", "openssl", "wget"]));
        assert_eq!(state.required_by([&id("jq"), &id("gone")]), set(&["jq"]));
        assert_eq!(state.graph().leaves(), set(&["jq", "wget"]));
    }

    #[test]
    fn flat_state_treats_everything_as_explicit() {
        let state = InstalledState::flat(set(&["a", "b"]));
        assert!(!state.supports_explicit_tracking());
        assert_eq!(state.prunable(), &state.all);
        assert_eq!(state.explicit_or_all(), &state.all);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: Policy,
        }

        let parsed: Wrapper = toml::from_str("policy = \"prune_extras\"").unwrap();
        assert_eq!(parsed.policy, Policy::PruneExtras);
    }
}
