//! Dependency graph for installed packages
//!
//! Used to find leaves (packages nothing else installed depends on) and to
//! schedule removal leaf-first. Uses petgraph for graph operations.
//!
//! The graph tolerates cycles: packages caught in one never become leaves,
//! and leaf-first removal simply stops when a round finds nothing to remove.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use thiserror::Error;

use super::id::Identifier;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Package not found: {0}")]
    PackageNotFound(Identifier),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(Identifier),
}

/// Leaf-first removal schedule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSchedule {
    /// Each round holds the leaves at that point, sorted
    pub rounds: Vec<Vec<Identifier>>,

    /// Packages that never became leaves
    pub stuck: Vec<Identifier>,
}

/// Installed packages and the dependencies between them
///
/// Edge direction is `dependency -> dependent`, so a leaf has no outgoing
/// edges.
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    graph: DiGraph<Identifier, ()>,
    node_map: HashMap<Identifier, NodeIndex>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph from `(package, dependencies)` pairs
    ///
    /// Dependencies that are not themselves listed as packages are not
    /// installed and are ignored, as are self-references.
    pub fn from_dependencies<I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Identifier, D)>,
        D: IntoIterator<Item = Identifier>,
    {
        let mut graph = Self::new();
        let entries: Vec<(Identifier, Vec<Identifier>)> = entries
            .into_iter()
            .map(|(pkg, deps)| (pkg, deps.into_iter().collect()))
            .collect();

        for (pkg, _) in &entries {
            graph.add_package(pkg.clone());
        }

        for (pkg, deps) in &entries {
            for dep in deps {
                if graph.contains(dep) {
                    // Both ends exist; only self-edges can fail here
                    let _ = graph.add_dependency(pkg, dep);
                }
            }
        }

        graph
    }

    pub fn add_package(&mut self, id: Identifier) {
        if !self.node_map.contains_key(&id) {
            let idx = self.graph.add_node(id.clone());
            self.node_map.insert(id, idx);
        }
    }

    /// Records that `package` depends on `depends_on`
    pub fn add_dependency(
        &mut self,
        package: &Identifier,
        depends_on: &Identifier,
    ) -> Result<(), GraphError> {
        if package == depends_on {
            return Err(GraphError::SelfDependency(package.clone()));
        }

        let pkg_idx = *self
            .node_map
            .get(package)
            .ok_or_else(|| GraphError::PackageNotFound(package.clone()))?;
        let dep_idx = *self
            .node_map
            .get(depends_on)
            .ok_or_else(|| GraphError::PackageNotFound(depends_on.clone()))?;

        if self.graph.find_edge(dep_idx, pkg_idx).is_none() {
            self.graph.add_edge(dep_idx, pkg_idx, ());
        }
        Ok(())
    }

    /// Removes a package and its edges
    pub fn remove_package(&mut self, id: &Identifier) -> bool {
        if let Some(idx) = self.node_map.remove(id) {
            self.graph.remove_node(idx);
            // petgraph swaps the last node into the freed index
            self.rebuild_node_map();
            true
        } else {
            false
        }
    }

    fn rebuild_node_map(&mut self) {
        self.node_map.clear();
        for idx in self.graph.node_indices() {
            if let Some(id) = self.graph.node_weight(idx) {
                self.node_map.insert(id.clone(), idx);
            }
        }
    }

    /// Direct dependencies of a package
    pub fn dependencies(&self, id: &Identifier) -> BTreeSet<Identifier> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Installed packages that depend directly on `id`
    pub fn dependents(&self, id: &Identifier) -> BTreeSet<Identifier> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &Identifier, direction: Direction) -> BTreeSet<Identifier> {
        match self.node_map.get(id) {
            Some(idx) => self
                .graph
                .neighbors_directed(*idx, direction)
                .filter_map(|n| self.graph.node_weight(n).cloned())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Packages with no installed dependents
    pub fn leaves(&self) -> BTreeSet<Identifier> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Schedules removal of every package, leaves first
    pub fn removal_rounds(&self) -> RemovalSchedule {
        self.schedule_removal(&self.packages())
    }

    /// Schedules removal of `targets`, leaves first
    ///
    /// Each round removes the targets that are currently leaves. Stops when
    /// a round has nothing to remove; targets left over are reported as
    /// stuck. Packages outside `targets` are never removed, so they keep
    /// their dependencies pinned.
    pub fn schedule_removal(&self, targets: &BTreeSet<Identifier>) -> RemovalSchedule {
        let mut remaining = self.clone();
        let mut schedule = RemovalSchedule::default();

        loop {
            let leaves: Vec<Identifier> = remaining
                .leaves()
                .into_iter()
                .filter(|id| targets.contains(id))
                .collect();
            if leaves.is_empty() {
                break;
            }
            for id in &leaves {
                remaining.remove_package(id);
            }
            schedule.rounds.push(leaves);
        }

        schedule.stuck = targets
            .iter()
            .filter(|id| remaining.contains(id))
            .cloned()
            .collect();
        schedule
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// All packages, sorted
    pub fn packages(&self) -> BTreeSet<Identifier> {
        self.node_map.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn graph(entries: &[(&str, &[&str])]) -> PackageGraph {
        PackageGraph::from_dependencies(
            entries
                .iter()
                .map(|(pkg, deps)| (id(pkg), deps.iter().map(|d| id(d)).collect::<Vec<_>>())),
        )
    }

    #[test]
    fn empty_graph() {
        let g = PackageGraph::new();
        assert!(g.is_empty());
        assert!(g.leaves().is_empty());
        assert_eq!(g.removal_rounds(), RemovalSchedule::default());
    }

    #[test]
    fn leaves_have_no_dependents() {
        let g = graph(&[
            ("wget", &["openssl@3", "libidn2"]),
            ("openssl@3", &["ca-certificates"]),
            ("libidn2", &[]),
            ("ca-certificates", &[]),
            ("jq", &[]),
        ]);

        let leaves: Vec<_> = g.leaves().into_iter().collect();
        assert_eq!(leaves, vec![id("jq"), id("wget")]);
        assert_eq!(g.dependents(&id("openssl@3")), BTreeSet::from([id("wget")]));
        assert_eq!(
            g.dependencies(&id("wget")),
            BTreeSet::from([id("libidn2"), id("openssl@3")])
        );
    }

    #[test]
    fn uninstalled_dependencies_ignored() {
        let g = graph(&[("wget", &["gettext"])]);
        assert_eq!(g.len(), 1);
        assert!(g.dependencies(&id("wget")).is_empty());
    }

    #[test]
    fn self_dependency_rejected() {
        let mut g = PackageGraph::new();
        g.add_package(id("a"));
        assert_eq!(
            g.add_dependency(&id("a"), &id("a")),
            Err(GraphError::SelfDependency(id("a")))
        );
    }

    #[test]
    fn unknown_package_rejected() {
        let mut g = PackageGraph::new();
        g.add_package(id("a"));
        assert_eq!(
            g.add_dependency(&id("a"), &id("b")),
            Err(GraphError::PackageNotFound(id("b")))
        );
    }

    #[test]
    fn removal_goes_leaf_first() {
        let g = graph(&[
            ("wget", &["openssl@3"]),
            ("openssl@3", &["ca-certificates"]),
            ("ca-certificates", &[]),
        ]);

        let schedule = g.removal_rounds();
        assert_eq!(
            schedule.rounds,
            vec![vec![id("wget")], vec![id("openssl@3")], vec![id("ca-certificates")]]
        );
        assert!(schedule.stuck.is_empty());
    }

    #[test]
    fn removal_stops_on_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("top", &["a"]), ("solo", &[])]);

        let schedule = g.removal_rounds();
        assert_eq!(schedule.rounds, vec![vec![id("solo"), id("top")]]);
        assert_eq!(schedule.stuck, vec![id("a"), id("b")]);
    }

    #[test]
    fn partial_removal_keeps_outsiders() {
        let g = graph(&[
            ("wget", &["openssl@3"]),
            ("curl", &["openssl@3"]),
            ("openssl@3", &[]),
            ("htop", &["ncurses"]),
            ("ncurses", &[]),
        ]);

        let targets = BTreeSet::from([id("wget"), id("openssl@3"), id("htop"), id("ncurses")]);
        let schedule = g.schedule_removal(&targets);
        assert_eq!(
            schedule.rounds,
            vec![vec![id("htop"), id("wget")], vec![id("ncurses")]]
        );
        // curl is staying and still needs openssl
        assert_eq!(schedule.stuck, vec![id("openssl@3")]);
    }

    #[test]
    fn remove_package_keeps_map_consistent() {
        let mut g = graph(&[("a", &["b"]), ("b", &[]), ("c", &[])]);
        assert!(g.remove_package(&id("a")));
        assert!(!g.remove_package(&id("a")));
        assert!(g.contains(&id("b")));
        assert!(g.contains(&id("c")));
        assert!(g.dependents(&id("b")).is_empty());
        assert_eq!(g.leaves().len(), 2);
    }
}
