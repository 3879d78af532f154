//! Port assignment for branching nodes.
//!
//! A branching node fans out through one port per distinct branch. Ports are
//! numbered in the author's case order with unknown handles after the explicit
//! cases and the default handle always last. The solver places the successors
//! of a branching node in port order, which keeps the drawing in step with the
//! branch definition whatever order the edges were created in.

use indexmap::IndexMap;
use log::trace;

use trellis_core::{
    graph::{BranchDefinition, Edge},
    identifier::Id,
};

use crate::structure::LayoutProblem;

/// The side of a node an edge leaves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortSide {
    /// The side facing the next layer.
    #[default]
    Downstream,
}

/// An outgoing attachment point of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port {
    node: Id,
    ordinal: usize,
    side: PortSide,
}

impl Port {
    pub fn new(node: Id, ordinal: usize) -> Self {
        Self {
            node,
            ordinal,
            side: PortSide::Downstream,
        }
    }

    pub fn node(&self) -> Id {
        self.node
    }

    /// Position of the port among the node's ports, starting at 0.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn side(&self) -> PortSide {
        self.side
    }
}

/// Ports of every edge leaving a branching node.
///
/// Edges leaving ordinary nodes, or branching nodes with a single outgoing edge,
/// have no port.
#[derive(Debug, Clone, Default)]
pub struct PortAssignment {
    ports: IndexMap<Id, Port>,
    successor_ordinals: IndexMap<(Id, Id), usize>,
}

impl PortAssignment {
    /// Returns the port of an edge, if it leaves through one.
    pub fn port(&self, edge: Id) -> Option<Port> {
        self.ports.get(&edge).copied()
    }

    /// Returns the smallest port ordinal among edges from `source` to `target`.
    pub fn successor_ordinal(&self, source: Id, target: Id) -> Option<usize> {
        self.successor_ordinals.get(&(source, target)).copied()
    }

    fn insert(&mut self, edge: &Edge, port: Port) {
        self.ports.insert(edge.id(), port);
        self.successor_ordinals
            .entry((edge.source(), edge.target()))
            .and_modify(|ordinal| *ordinal = (*ordinal).min(port.ordinal()))
            .or_insert(port.ordinal());
    }
}

/// How a branch is identified among a node's outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BranchKey<'a> {
    Handle(&'a str),
    /// An edge without a handle is a branch of its own.
    Unlabelled(Id),
}

/// Sort rank of a branch: explicit cases, then unknown handles, then default.
fn branch_rank(
    key: &BranchKey<'_>,
    definition: &BranchDefinition,
    first_seen: usize,
) -> (u8, usize) {
    match key {
        BranchKey::Handle(handle) if definition.is_default(handle) => (2, 0),
        BranchKey::Handle(handle) => match definition.case_index(handle) {
            Some(index) => (0, index),
            None => (1, first_seen),
        },
        BranchKey::Unlabelled(_) => (1, first_seen),
    }
}

/// Assigns ports to the outgoing edges of every branching node in `problem`.
pub fn assign_ports(problem: &LayoutProblem) -> PortAssignment {
    let mut assignment = PortAssignment::default();

    for node in problem.nodes() {
        let Some(definition) = node.branch_definition() else {
            continue;
        };

        let outgoing: Vec<&Edge> = problem.outgoing_edges(node.id()).collect();
        if outgoing.len() < 2 {
            continue;
        }

        let keys: Vec<BranchKey<'_>> = outgoing
            .iter()
            .map(|edge| match edge.source_port() {
                Some(handle) => BranchKey::Handle(handle),
                None => BranchKey::Unlabelled(edge.id()),
            })
            .collect();

        let mut branches: Vec<(&BranchKey<'_>, (u8, usize))> = Vec::new();
        for key in &keys {
            if branches.iter().all(|(seen, _)| *seen != key) {
                let rank = branch_rank(key, definition, branches.len());
                branches.push((key, rank));
            }
        }
        branches.sort_by_key(|(_, rank)| *rank);

        for (edge, key) in outgoing.iter().zip(&keys) {
            let ordinal = branches
                .iter()
                .position(|(branch, _)| *branch == key)
                .unwrap_or(branches.len());
            assignment.insert(edge, Port::new(node.id(), ordinal));
        }

        trace!(node_id:% = node.id(), branches = branches.len(); "Assigned branch ports");
    }

    assignment
}
