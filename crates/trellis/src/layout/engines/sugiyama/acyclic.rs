//! Cycle breaking.
//!
//! An iterative depth-first search marks every back edge and self-loop as a
//! feedback edge. Searches start at the nodes without incoming edges, in node
//! order, and then at any node still unvisited, so the choice of feedback edges
//! depends only on input order.

use petgraph::graph::EdgeIndex;

use super::SolverGraph;

/// Edges reversed to make the graph acyclic.
#[derive(Debug, Clone, Default)]
pub(super) struct FeedbackSet {
    reversed: Vec<bool>,
}

impl FeedbackSet {
    pub(super) fn contains(&self, edge: EdgeIndex) -> bool {
        self.reversed.get(edge.index()).copied().unwrap_or(false)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.reversed.iter().filter(|reversed| **reversed).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Returns the feedback edges of `graph`.
pub(super) fn feedback_edges(graph: &SolverGraph) -> FeedbackSet {
    let count = graph.node_count();
    let mut reversed = vec![false; graph.edge_count()];
    let mut marks = vec![Mark::Unvisited; count];

    let mut in_degree = vec![0usize; count];
    for node in graph.graph.node_indices() {
        for &(_, target) in graph.outgoing(node) {
            in_degree[target.index()] += 1;
        }
    }

    let sources = graph
        .graph
        .node_indices()
        .filter(|node| in_degree[node.index()] == 0);
    let starts: Vec<_> = sources.chain(graph.graph.node_indices()).collect();

    let mut stack = Vec::new();
    for start in starts {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }
        marks[start.index()] = Mark::OnStack;
        stack.push((start, 0usize));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let next = graph.outgoing(node).get(frame.1).copied();
            frame.1 += 1;

            match next {
                Some((edge, target)) => match marks[target.index()] {
                    Mark::OnStack => reversed[edge.index()] = true,
                    Mark::Unvisited => {
                        marks[target.index()] = Mark::OnStack;
                        stack.push((target, 0));
                    }
                    Mark::Done => {}
                },
                None => {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }

    FeedbackSet { reversed }
}
