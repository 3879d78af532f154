//! Layout problems built from an editor snapshot.
//!
//! The builder partitions a snapshot into one [`LayoutProblem`] per scope: the
//! root scope plus one scope per container that owns placeable nodes. Each
//! problem holds only the nodes directly owned by its scope and the edges whose
//! endpoints both live there. Problems nest into a [`ProblemHierarchy`] that is
//! solved innermost first.
//!
//! Malformed input is repaired here and never reaches the solver:
//! - annotation nodes are skipped,
//! - duplicate node ids keep their first occurrence,
//! - nodes whose container is missing or part of a containment cycle are lifted
//!   to the root scope,
//! - edges with a missing endpoint or crossing a scope boundary are dropped.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use trellis_core::{
    geometry::Size,
    graph::{Edge, Node, NodeRole},
    identifier::Id,
};

mod graph_base;

use graph_base::GraphInternal;

/// The scope a node is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The top level of the graph.
    Root,

    /// The nested sub-graph owned by a container node.
    Container(Id),
}

impl Scope {
    /// Returns the owning container, or `None` for the root scope.
    pub fn container(self) -> Option<Id> {
        match self {
            Scope::Root => None,
            Scope::Container(id) => Some(id),
        }
    }
}

/// One independent layered-layout problem.
///
/// Nodes and edges keep the relative order of the snapshot; that order is the
/// only tie-break the solver uses.
#[derive(Debug, Clone)]
pub struct LayoutProblem {
    scope: Scope,
    parent: Option<Scope>,
    graph: GraphInternal<Node, Edge>,
}

impl LayoutProblem {
    /// Creates an empty problem for `scope`.
    ///
    /// `parent` is the scope the owning container itself is laid out in, and is
    /// `None` for the root problem.
    pub fn new(scope: Scope, parent: Option<Scope>) -> Self {
        Self {
            scope,
            parent,
            graph: GraphInternal::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The scope the owning container is placed in.
    pub fn parent(&self) -> Option<Scope> {
        self.parent
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        self.graph.node(id)
    }

    /// Nodes in snapshot order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.nodes()
    }

    /// Edges in snapshot order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edges()
    }

    /// Outgoing edges of `source` in snapshot order.
    pub fn outgoing_edges(&self, source: Id) -> impl Iterator<Item = &Edge> {
        self.graph.outgoing(source)
    }

    pub fn contains_node(&self, id: Id) -> bool {
        self.graph.contains_node(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.nodes_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edges_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Returns the designated entry node of this scope, if one exists.
    ///
    /// The root scope looks for the first [`NodeRole::Start`] node and a
    /// container scope for the first [`NodeRole::ContainerEntry`] node.
    pub fn entry_node(&self) -> Option<Id> {
        self.nodes()
            .find(|node| match self.scope {
                Scope::Root => matches!(node.role(), NodeRole::Start),
                Scope::Container(_) => matches!(node.role(), NodeRole::ContainerEntry),
            })
            .map(Node::id)
    }

    /// Adds a node. The caller guarantees the id is not yet present.
    pub fn add_node(&mut self, node: Node) {
        self.graph.add_node(node.id(), node);
    }

    /// Adds an edge. The caller guarantees both endpoints are present.
    pub fn add_edge(&mut self, edge: Edge) {
        self.graph.add_edge(edge.source(), edge.target(), edge);
    }

    /// Replaces the size of a node, typically a container after its nested
    /// content has been laid out. Returns `false` if the node is unknown.
    pub(crate) fn resize_node(&mut self, id: Id, size: Size) -> bool {
        match self.graph.node_mut(id) {
            Some(node) => {
                *node = node.clone().with_size(size);
                true
            }
            None => false,
        }
    }
}

/// The flat result of partitioning a snapshot.
#[derive(Debug, Clone)]
pub struct Problems {
    /// The root scope problem. Always present, possibly empty.
    pub root: LayoutProblem,

    /// One problem per container owning at least one node, keyed by container id
    /// in the order containers are first referenced.
    pub children: IndexMap<Id, LayoutProblem>,
}

/// Partitions a snapshot's nodes and edges into per-scope layout problems.
///
/// Never fails; malformed input is repaired or dropped with a warning.
pub fn build_problems(nodes: &[Node], edges: &[Edge]) -> Problems {
    let mut placeable: IndexMap<Id, &Node> = IndexMap::new();
    for node in nodes {
        if !node.is_placeable() {
            debug!(node_id:% = node.id(); "Skipping annotation node");
            continue;
        }
        if placeable.contains_key(&node.id()) {
            warn!(node_id:% = node.id(); "Duplicate node id, keeping the first occurrence");
            continue;
        }
        placeable.insert(node.id(), node);
    }

    let scopes: IndexMap<Id, Scope> = placeable
        .values()
        .map(|node| (node.id(), resolve_scope(node, &placeable)))
        .collect();

    let mut root = LayoutProblem::new(Scope::Root, None);
    let mut children: IndexMap<Id, LayoutProblem> = IndexMap::new();

    for (id, node) in &placeable {
        match scopes[id] {
            Scope::Root => root.add_node((*node).clone()),
            Scope::Container(container) => {
                let parent = scopes.get(&container).copied().unwrap_or(Scope::Root);
                children
                    .entry(container)
                    .or_insert_with(|| {
                        LayoutProblem::new(Scope::Container(container), Some(parent))
                    })
                    .add_node((*node).clone());
            }
        }
    }

    for edge in edges {
        let (Some(source_scope), Some(target_scope)) =
            (scopes.get(&edge.source()), scopes.get(&edge.target()))
        else {
            warn!(
                edge_id:% = edge.id(),
                source:% = edge.source(),
                target:% = edge.target();
                "Dropping edge with a missing endpoint"
            );
            continue;
        };

        if source_scope != target_scope {
            warn!(
                edge_id:% = edge.id(),
                source_scope:? = source_scope,
                target_scope:? = target_scope;
                "Dropping edge that crosses a container boundary"
            );
            continue;
        }

        let nested = matches!(source_scope, Scope::Container(_));
        if edge.in_container() != nested {
            debug!(
                edge_id:% = edge.id(),
                flagged = edge.in_container(),
                nested;
                "Edge container flag disagrees with its endpoints"
            );
        }

        match source_scope {
            Scope::Root => root.add_edge(edge.clone()),
            Scope::Container(container) => {
                if let Some(problem) = children.get_mut(container) {
                    problem.add_edge(edge.clone());
                }
            }
        }
    }

    debug!(
        root_nodes = root.node_count(),
        root_edges = root.edge_count(),
        containers = children.len();
        "Built layout problems"
    );

    Problems { root, children }
}

/// Resolves the scope a node is laid out in.
///
/// A container reference is honoured only if it names a placeable node and the
/// node is not part of a containment cycle; otherwise the node is lifted to the
/// root scope.
fn resolve_scope(node: &Node, placeable: &IndexMap<Id, &Node>) -> Scope {
    let Some(container) = node.container() else {
        return Scope::Root;
    };

    if !placeable.contains_key(&container) {
        warn!(
            node_id:% = node.id(),
            container:% = container;
            "Container not found, lifting node to the root scope"
        );
        return Scope::Root;
    }

    if on_containment_cycle(node.id(), placeable) {
        warn!(
            node_id:% = node.id(),
            container:% = container;
            "Containment cycle detected, lifting node to the root scope"
        );
        return Scope::Root;
    }

    Scope::Container(container)
}

/// Returns true if following container references from `start` leads back to it.
///
/// Nodes whose chain merely enters a cycle elsewhere are not on it; the nodes of
/// that cycle are lifted, which leaves the chain valid.
fn on_containment_cycle(start: Id, placeable: &IndexMap<Id, &Node>) -> bool {
    let mut current = placeable.get(&start).and_then(|node| node.container());
    for _ in 0..placeable.len() {
        match current {
            Some(id) if id == start => return true,
            Some(id) => current = placeable.get(&id).and_then(|node| node.container()),
            None => return false,
        }
    }
    false
}

// =============================================================================
// Hierarchy structures (for nested containers)
// =============================================================================

/// One problem of the hierarchy with the positions of its nested problems.
#[derive(Debug, Clone)]
pub(crate) struct HierarchyNode {
    pub(crate) problem: LayoutProblem,
    /// Indices of nested problems; each is smaller than this node's own index.
    pub(crate) children: Vec<usize>,
}

/// Tree of layout problems mirroring container nesting.
///
/// ```text
/// Root scope
/// ├── Start
/// ├── Iteration (container)
/// │   └── Iteration scope
/// │       ├── Iteration start (container entry)
/// │       └── Step
/// └── End
/// ```
///
/// The tree is stored flat in post-order, so arbitrarily deep nesting is
/// walked without recursion.
#[derive(Debug, Clone)]
pub struct ProblemHierarchy {
    nodes: Vec<HierarchyNode>,
}

impl ProblemHierarchy {
    /// Nests flat problems by container ownership.
    pub fn from_problems(problems: Problems) -> Self {
        let Problems { root, children } = problems;

        // Slot 0 is the root; nested problems follow in container order.
        let mut slots: Vec<Option<LayoutProblem>> = Vec::with_capacity(children.len() + 1);
        slots.push(Some(root));
        slots.extend(children.into_values().map(Some));

        let slot_of: IndexMap<Scope, usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(slot, problem)| {
                problem.as_ref().map(|problem| (problem.scope(), slot))
            })
            .collect();

        let mut nested: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
        for (slot, problem) in slots.iter().enumerate().skip(1) {
            let parent = problem
                .as_ref()
                .and_then(LayoutProblem::parent)
                .and_then(|scope| slot_of.get(&scope).copied());
            if let Some(parent) = parent {
                nested[parent].push(slot);
            }
        }

        // Iterative depth-first post-order; siblings keep container order.
        let mut order: Vec<usize> = Vec::with_capacity(slots.len());
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some(&(slot, next)) = stack.last() {
            match nested[slot].get(next) {
                Some(&child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    stack.push((child, 0));
                }
                None => {
                    stack.pop();
                    order.push(slot);
                }
            }
        }

        let mut position = vec![usize::MAX; slots.len()];
        for (index, &slot) in order.iter().enumerate() {
            position[slot] = index;
        }

        let mut nodes = Vec::with_capacity(order.len());
        for &slot in &order {
            if let Some(problem) = slots[slot].take() {
                let children = nested[slot].iter().map(|&child| position[child]).collect();
                nodes.push(HierarchyNode { problem, children });
            }
        }

        // Resolved scopes are acyclic, so every problem is reachable from the root.
        for problem in slots.into_iter().flatten() {
            warn!(
                scope:? = problem.scope();
                "Container problem is unreachable from the root scope"
            );
        }

        let hierarchy = Self { nodes };
        trace!(problems = hierarchy.nodes.len(); "Created problem hierarchy");
        hierarchy
    }

    /// Builds the hierarchy of a snapshot directly.
    pub fn build(nodes: &[Node], edges: &[Edge]) -> Self {
        Self::from_problems(build_problems(nodes, edges))
    }

    /// Returns an iterator that traverses the hierarchy in post-order.
    ///
    /// Nested problems are visited before the problem containing their container,
    /// and siblings keep snapshot order. The root problem is always last.
    pub fn iter_post_order(&self) -> impl Iterator<Item = &LayoutProblem> {
        self.nodes.iter().map(|node| &node.problem)
    }

    /// Returns the effective scope of every placed node.
    pub fn node_scopes(&self) -> IndexMap<Id, Scope> {
        self.iter_post_order()
            .flat_map(|problem| {
                problem
                    .nodes()
                    .map(move |node| (node.id(), problem.scope()))
            })
            .collect()
    }

    /// Consumes the hierarchy, yielding its problems in post-order.
    pub(crate) fn into_post_order(self) -> Vec<HierarchyNode> {
        self.nodes
    }
}

/// Returns the ids of nodes that take part in layout, first occurrence only.
pub(crate) fn placed_ids(nodes: &[Node]) -> Vec<Id> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|node| node.is_placeable())
        .map(Node::id)
        .filter(|id| seen.insert(*id))
        .collect()
}
