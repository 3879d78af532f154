//! Low-level graph storage shared by every layout problem.
//!
//! [`GraphInternal`] keeps nodes and edges in insertion order and tracks the
//! outgoing edges of every node. Insertion order is the tie-break
//! for everything downstream, so nothing here is allowed to iterate a hashed
//! collection.
//!
//! This is an internal module; [`LayoutProblem`](super::LayoutProblem) is the
//! public face of it.

use indexmap::IndexMap;

use trellis_core::identifier::Id;

/// Index of an edge in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct EdgeIndex(usize);

/// Core graph data structure.
///
/// - Node storage by ID with generic node data type `N`, in insertion order
/// - Edge storage with generic edge data type `E`, in insertion order
/// - Outgoing edge lists per node, also in insertion order
///
/// The graph is directed and allows self-loops and multiple edges between nodes.
#[derive(Debug, Clone)]
pub(super) struct GraphInternal<N, E> {
    nodes: IndexMap<Id, N>,
    edges: Vec<E>,
    outgoing_edges: IndexMap<Id, Vec<EdgeIndex>>,
}

impl<N, E> GraphInternal<N, E> {
    /// Creates a new empty graph.
    pub(super) fn new() -> Self {
        GraphInternal {
            nodes: IndexMap::new(),
            edges: Vec::new(),
            outgoing_edges: IndexMap::new(),
        }
    }

    /// Returns the node data for the given ID, if it exists.
    pub(super) fn node(&self, id: Id) -> Option<&N> {
        self.nodes.get(&id)
    }

    /// Returns mutable node data for the given ID, if it exists.
    pub(super) fn node_mut(&mut self, id: Id) -> Option<&mut N> {
        self.nodes.get_mut(&id)
    }

    /// Returns an iterator over all node data in insertion order.
    pub(super) fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    /// Returns the total number of nodes in the graph.
    pub(super) fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if a node with the given ID exists in the graph.
    pub(super) fn contains_node(&self, id: Id) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns an iterator over all edge data in insertion order.
    pub(super) fn edges(&self) -> impl Iterator<Item = &E> {
        self.edges.iter()
    }

    /// Returns the total number of edges in the graph.
    pub(super) fn edges_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the outgoing edges of `source_id` in insertion order.
    ///
    /// Returns an empty iterator if the node has no outgoing edges or does not exist.
    pub(super) fn outgoing(&self, source_id: Id) -> impl Iterator<Item = &E> {
        self.outgoing_edges
            .get(&source_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.edges[idx.0])
    }

    /// Adds a node to the graph with the given ID and data.
    ///
    /// If a node with the same ID already exists, its data is replaced and it keeps
    /// its original position in the insertion order.
    pub(super) fn add_node(&mut self, id: Id, node: N) {
        self.nodes.insert(id, node);
    }

    /// Adds a directed edge to the graph between two nodes.
    ///
    /// # Panics
    /// Panics in debug mode if either the source or target node does not exist in the graph.
    /// Callers validate endpoints first; this check only catches internal bugs.
    pub(super) fn add_edge(&mut self, source_id: Id, target_id: Id, edge: E) -> EdgeIndex {
        debug_assert!(
            self.nodes.contains_key(&source_id),
            "Adding edge: Source node {source_id} does not exist",
        );
        debug_assert!(
            self.nodes.contains_key(&target_id),
            "Adding edge: Target node {target_id} does not exist",
        );

        self.edges.push(edge);

        let idx = EdgeIndex(self.edges.len() - 1);
        self.outgoing_edges.entry(source_id).or_default().push(idx);
        idx
    }

    /// Returns the edge data stored at `idx`.
    #[cfg(test)]
    fn edge(&self, idx: EdgeIndex) -> &E {
        &self.edges[idx.0]
    }
}
