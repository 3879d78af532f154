//! Longest-path layering.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;

use super::LayeredAdjacency;

/// Assigns every node the length of the longest path reaching it.
///
/// Sources sit on layer 0 and every edge of the acyclic graph advances at least
/// one layer. The result is indexed by node index.
pub(super) fn assign_layers(adjacency: &LayeredAdjacency) -> Vec<usize> {
    let count = adjacency.node_count();
    let mut layers = vec![0usize; count];
    let mut remaining: Vec<usize> = (0..count)
        .map(|i| adjacency.predecessors(NodeIndex::new(i)).len())
        .collect();

    let mut queue: VecDeque<NodeIndex> = (0..count)
        .filter(|&i| remaining[i] == 0)
        .map(NodeIndex::new)
        .collect();

    while let Some(node) = queue.pop_front() {
        for &successor in adjacency.successors(node) {
            let candidate = layers[node.index()] + 1;
            if candidate > layers[successor.index()] {
                layers[successor.index()] = candidate;
            }
            remaining[successor.index()] -= 1;
            if remaining[successor.index()] == 0 {
                queue.push_back(successor);
            }
        }
    }

    layers
}
