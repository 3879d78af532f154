//! Crossing reduction within layers.
//!
//! Layers start in node order and are refined by alternating downward and
//! upward barycenter sweeps. Successors of a branching node are kept in port
//! order after every reordering, so the sweeps may only move other nodes
//! around them. The ordering with the fewest adjacent-layer crossings wins and
//! the earliest such ordering breaks ties.

use log::trace;
use petgraph::graph::NodeIndex;

use crate::layout::ports::PortAssignment;

use super::{LayeredAdjacency, SolverGraph, acyclic::FeedbackSet};

/// Successors of one branching node, in port order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BranchConstraint {
    successors: Vec<NodeIndex>,
}

impl BranchConstraint {
    /// Collects the constraints of every branching node, in node order.
    ///
    /// Feedback edges and self-loops are left out. A successor reached through
    /// several ports takes the smallest ordinal.
    pub(super) fn collect(
        graph: &SolverGraph,
        feedback: &FeedbackSet,
        ports: &PortAssignment,
    ) -> Vec<Self> {
        let mut constraints = Vec::new();

        for node in graph.graph.node_indices() {
            let source = graph.graph[node].id;
            let mut successors: Vec<(usize, NodeIndex)> = Vec::new();
            for &(edge, target) in graph.outgoing(node) {
                if target == node || feedback.contains(edge) {
                    continue;
                }
                if successors.iter().any(|(_, seen)| *seen == target) {
                    continue;
                }
                if let Some(ordinal) = ports.successor_ordinal(source, graph.graph[target].id) {
                    successors.push((ordinal, target));
                }
            }
            successors.sort_by_key(|(ordinal, _)| *ordinal);

            if successors.len() > 1 {
                constraints.push(Self {
                    successors: successors.into_iter().map(|(_, target)| target).collect(),
                });
            }
        }

        constraints
    }

    #[cfg(test)]
    pub(super) fn new(successors: Vec<NodeIndex>) -> Self {
        Self { successors }
    }

    /// Rewrites `row` so that the constrained successors on `layer` appear in
    /// port order, reusing the slots they already occupy.
    fn enforce(&self, row: &mut [NodeIndex], layer: usize, layers: &[usize]) {
        let members: Vec<NodeIndex> = self
            .successors
            .iter()
            .copied()
            .filter(|successor| layers[successor.index()] == layer)
            .collect();
        if members.len() < 2 {
            return;
        }

        let mut slots: Vec<usize> = members
            .iter()
            .filter_map(|member| row.iter().position(|node| node == member))
            .collect();
        slots.sort_unstable();

        for (slot, member) in slots.into_iter().zip(members) {
            row[slot] = member;
        }
    }
}

/// Orders the nodes of every layer.
///
/// Returns one row per layer, each listing node indices from the low end of
/// the secondary axis to the high end.
pub(super) fn order_layers(
    adjacency: &LayeredAdjacency,
    layers: &[usize],
    constraints: &[BranchConstraint],
    sweeps: usize,
) -> Vec<Vec<NodeIndex>> {
    let layer_count = layers.iter().copied().max().map_or(0, |max| max + 1);
    let mut rows: Vec<Vec<NodeIndex>> = vec![Vec::new(); layer_count];
    for (index, &layer) in layers.iter().enumerate() {
        rows[layer].push(NodeIndex::new(index));
    }

    for (layer, row) in rows.iter_mut().enumerate() {
        for constraint in constraints {
            constraint.enforce(row, layer, layers);
        }
    }

    let mut best = rows.clone();
    let mut best_crossings = count_crossings(adjacency, &rows, layers);

    for sweep in 0..sweeps {
        if best_crossings == 0 {
            break;
        }

        let downward = sweep % 2 == 0;
        let sequence: Vec<usize> = if downward {
            (1..layer_count).collect()
        } else {
            (0..layer_count.saturating_sub(1)).rev().collect()
        };

        for layer in sequence {
            let positions = positions_of(&rows, adjacency.node_count());
            let row = &mut rows[layer];
            reorder_by_barycenter(row, &positions, move |node| {
                if downward {
                    adjacency.predecessors(node)
                } else {
                    adjacency.successors(node)
                }
            });
            for constraint in constraints {
                constraint.enforce(row, layer, layers);
            }
        }

        let crossings = count_crossings(adjacency, &rows, layers);
        trace!(sweep, crossings; "Finished ordering sweep");
        if crossings < best_crossings {
            best_crossings = crossings;
            best = rows.clone();
        }
    }

    best
}

/// Position of every node within its row, indexed by node index.
fn positions_of(rows: &[Vec<NodeIndex>], node_count: usize) -> Vec<usize> {
    let mut positions = vec![0; node_count];
    for row in rows {
        for (position, node) in row.iter().enumerate() {
            positions[node.index()] = position;
        }
    }
    positions
}

/// Stable-sorts `row` by the mean position of each node's neighbours.
///
/// Nodes without neighbours keep their current position as key.
fn reorder_by_barycenter<'a>(
    row: &mut [NodeIndex],
    positions: &[usize],
    neighbours: impl Fn(NodeIndex) -> &'a [NodeIndex],
) {
    let mut keyed: Vec<(f32, NodeIndex)> = row
        .iter()
        .enumerate()
        .map(|(current, &node)| {
            let adjacent = neighbours(node);
            let key = if adjacent.is_empty() {
                current as f32
            } else {
                let sum: usize = adjacent.iter().map(|other| positions[other.index()]).sum();
                sum as f32 / adjacent.len() as f32
            };
            (key, node)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (slot, (_, node)) in row.iter_mut().zip(keyed) {
        *slot = node;
    }
}

/// Counts pairwise crossings of edges between adjacent layers.
pub(super) fn count_crossings(
    adjacency: &LayeredAdjacency,
    rows: &[Vec<NodeIndex>],
    layers: &[usize],
) -> usize {
    let positions = positions_of(rows, adjacency.node_count());
    let positions = positions.as_slice();
    let mut total = 0;

    for (layer, row) in rows.iter().enumerate() {
        let segments: Vec<(usize, usize)> = row
            .iter()
            .flat_map(|&node| {
                adjacency
                    .successors(node)
                    .iter()
                    .filter(move |successor| layers[successor.index()] == layer + 1)
                    .map(move |successor| {
                        (positions[node.index()], positions[successor.index()])
                    })
            })
            .collect();

        for (i, &(upper_a, lower_a)) in segments.iter().enumerate() {
            for &(upper_b, lower_b) in &segments[i + 1..] {
                if (upper_a < upper_b && lower_a > lower_b)
                    || (upper_a > upper_b && lower_a < lower_b)
                {
                    total += 1;
                }
            }
        }
    }

    total
}
