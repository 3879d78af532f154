//! Layered (Sugiyama) placement engine.
//!
//! Runs the four classic phases on one [`LayoutProblem`]:
//! 1. Cycle breaking by depth-first search ([`acyclic`])
//! 2. Longest-path layering ([`ranking`])
//! 3. Barycenter crossing reduction with branch-port order ([`ordering`])
//! 4. Median alignment with clearance-preserving placement ([`coordinates`])
//!
//! Nodes and edges enter the petgraph graph in problem order, so node and edge
//! indices double as the deterministic tie-break of every phase.

mod acyclic;
mod coordinates;
mod ordering;
mod ranking;

use std::collections::HashMap;

use log::{debug, trace};
use petgraph::{
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use trellis_core::{
    geometry::{Point, Size},
    identifier::Id,
};

use crate::{
    cancel::CancellationToken,
    config::{Direction, LayoutConfig},
    error::TrellisError,
    layout::{
        engines::PlacementEngine,
        placement::{LayoutResult, NodePlacement},
        ports::PortAssignment,
    },
    structure::LayoutProblem,
};

use acyclic::FeedbackSet;
use coordinates::Spacing;
use ordering::BranchConstraint;

/// Node weight of the solver graph.
#[derive(Debug, Clone, Copy)]
struct SolverNode {
    id: Id,
    size: Size,
}

/// Edge weight of the solver graph.
#[derive(Debug, Clone, Copy)]
struct SolverEdge {
    id: Id,
}

/// A problem converted to petgraph, with adjacency lists in edge order.
///
/// petgraph walks a node's edges most-recent first, so the ordered lists are
/// kept alongside the graph.
#[derive(Debug)]
struct SolverGraph {
    graph: DiGraph<SolverNode, SolverEdge>,
    outgoing: Vec<Vec<(EdgeIndex, NodeIndex)>>,
}

impl SolverGraph {
    fn new(problem: &LayoutProblem, default_size: Size) -> Self {
        let mut graph = DiGraph::with_capacity(problem.node_count(), problem.edge_count());
        let mut indices: HashMap<Id, NodeIndex> = HashMap::with_capacity(problem.node_count());

        for node in problem.nodes() {
            let size = node
                .size()
                .filter(|size| size.is_usable())
                .unwrap_or(default_size);
            let index = graph.add_node(SolverNode { id: node.id(), size });
            indices.insert(node.id(), index);
        }

        for edge in problem.edges() {
            let (Some(&source), Some(&target)) =
                (indices.get(&edge.source()), indices.get(&edge.target()))
            else {
                continue;
            };
            graph.add_edge(source, target, SolverEdge { id: edge.id() });
        }

        let mut outgoing = vec![Vec::new(); graph.node_count()];
        for edge in graph.edge_references() {
            outgoing[edge.source().index()].push((edge.id(), edge.target()));
        }

        Self { graph, outgoing }
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing edges of `node` in problem order.
    fn outgoing(&self, node: NodeIndex) -> &[(EdgeIndex, NodeIndex)] {
        &self.outgoing[node.index()]
    }

    fn sizes(&self) -> Vec<Size> {
        self.graph.node_weights().map(|node| node.size).collect()
    }
}

/// Predecessor and successor lists of the acyclic graph.
///
/// Feedback edges appear reversed and self-loops are left out, so every list
/// describes a DAG. Neighbours keep edge order.
#[derive(Debug, Clone, Default)]
struct LayeredAdjacency {
    predecessors: Vec<Vec<NodeIndex>>,
    successors: Vec<Vec<NodeIndex>>,
}

impl LayeredAdjacency {
    fn new(graph: &SolverGraph, feedback: &FeedbackSet) -> Self {
        let count = graph.node_count();
        let mut adjacency = Self {
            predecessors: vec![Vec::new(); count],
            successors: vec![Vec::new(); count],
        };

        for edge in graph.graph.edge_references() {
            let (mut source, mut target) = (edge.source(), edge.target());
            if source == target {
                continue;
            }
            if feedback.contains(edge.id()) {
                std::mem::swap(&mut source, &mut target);
            }
            adjacency.successors[source.index()].push(target);
            adjacency.predecessors[target.index()].push(source);
        }

        adjacency
    }

    fn node_count(&self) -> usize {
        self.successors.len()
    }

    fn predecessors(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.predecessors[node.index()]
    }

    fn successors(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.successors[node.index()]
    }
}

/// The layered placement engine.
#[derive(Debug, Clone)]
pub struct Engine {
    direction: Direction,
    layer_gap: f32,
    node_gap: f32,
    default_node_size: Size,
    ordering_sweeps: usize,
    alignment_passes: usize,
}

impl Engine {
    /// Create a new layered engine with the default configuration.
    pub fn new() -> Self {
        Self::from_config(&LayoutConfig::default())
    }

    /// Create an engine taking every tunable from `config`.
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            direction: config.direction(),
            layer_gap: config.layer_gap(),
            node_gap: config.node_gap(),
            default_node_size: config.default_node_size(),
            ordering_sweeps: config.ordering_sweeps(),
            alignment_passes: config.alignment_passes(),
        }
    }

    fn spacing(&self) -> Spacing {
        Spacing {
            direction: self.direction,
            layer_gap: self.layer_gap,
            node_gap: self.node_gap,
            alignment_passes: self.alignment_passes,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementEngine for Engine {
    fn solve(
        &self,
        problem: &LayoutProblem,
        ports: &PortAssignment,
        cancel: &CancellationToken,
    ) -> Result<LayoutResult, TrellisError> {
        let graph = SolverGraph::new(problem, self.default_node_size);
        debug!(
            scope:? = problem.scope(),
            nodes = graph.node_count(),
            edges = graph.edge_count();
            "Solving layout problem"
        );

        let mut result = LayoutResult::new();
        if graph.node_count() == 0 {
            return Ok(result);
        }

        // Phase 1: cycle breaking
        let feedback = acyclic::feedback_edges(&graph);
        let adjacency = LayeredAdjacency::new(&graph, &feedback);

        // Phase 2: layering
        let layers = ranking::assign_layers(&adjacency);

        // Phase 3: crossing reduction
        cancel.check()?;
        let constraints = BranchConstraint::collect(&graph, &feedback, ports);
        let order =
            ordering::order_layers(&adjacency, &layers, &constraints, self.ordering_sweeps);

        // Phase 4: coordinates
        let sizes = graph.sizes();
        let positions: Vec<Point> =
            coordinates::assign_coordinates(&sizes, &adjacency, &order, &self.spacing());

        for index in graph.graph.node_indices() {
            let node = graph.graph[index];
            result.insert(
                node.id,
                NodePlacement::new(positions[index.index()], node.size, layers[index.index()]),
            );
        }
        for edge in graph.graph.edge_references() {
            if feedback.contains(edge.id()) {
                result.push_feedback_edge(edge.weight().id);
            }
        }

        debug!(
            scope:? = problem.scope(),
            layers = order.len(),
            feedback_edges = result.feedback_edges().len();
            "Solved layout problem"
        );
        trace!(result:?; "Layout problem result");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;

    use trellis_core::{
        geometry::Insets,
        graph::{BranchDefinition, Edge, Node, NodeRole},
    };

    use super::*;
    use crate::{layout::ports::assign_ports, structure::build_problems};

    fn solve(nodes: &[Node], edges: &[Edge]) -> LayoutResult {
        solve_with(&Engine::new(), nodes, edges)
    }

    fn solve_with(engine: &Engine, nodes: &[Node], edges: &[Edge]) -> LayoutResult {
        let problems = build_problems(nodes, edges);
        let ports = assign_ports(&problems.root);
        engine
            .solve(&problems.root, &ports, &CancellationToken::new())
            .expect("solve succeeds")
    }

    fn placement<'a>(result: &'a LayoutResult, id: &str) -> &'a NodePlacement {
        result.get(Id::new(id)).expect("node is placed")
    }

    fn center_y(result: &LayoutResult, id: &str) -> f32 {
        let placed = placement(result, id);
        placed.position().y() + placed.size().height() / 2.0
    }

    #[test]
    fn test_empty_problem() {
        let result = solve(&[], &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_chain_is_straight() {
        let nodes = vec![Node::new("a"), Node::new("b"), Node::new("c")];
        let edges = vec![Edge::new("ab", "a", "b"), Edge::new("bc", "b", "c")];

        let result = solve(&nodes, &edges);

        assert_eq!(placement(&result, "a").layer(), 0);
        assert_eq!(placement(&result, "b").layer(), 1);
        assert_eq!(placement(&result, "c").layer(), 2);
        assert_approx_eq!(f32, center_y(&result, "a"), center_y(&result, "b"));
        assert_approx_eq!(f32, center_y(&result, "b"), center_y(&result, "c"));

        // 240 wide nodes separated by the 80 layer gap.
        assert_approx_eq!(f32, placement(&result, "b").position().x(), 320.0);
        assert_approx_eq!(f32, placement(&result, "c").position().x(), 640.0);
    }

    #[test]
    fn test_top_to_bottom_uses_vertical_layers() {
        let config = LayoutConfig::default().with_direction(Direction::TopToBottom);
        let engine = Engine::from_config(&config);
        let nodes = vec![Node::new("a"), Node::new("b")];
        let edges = vec![Edge::new("ab", "a", "b")];

        let result = solve_with(&engine, &nodes, &edges);

        let a = placement(&result, "a");
        let b = placement(&result, "b");
        assert_approx_eq!(f32, a.position().x(), b.position().x());
        assert_approx_eq!(f32, b.position().y() - a.position().y(), 90.0 + 80.0);
    }

    #[test]
    fn test_two_cycle_has_one_feedback_edge() {
        let nodes = vec![Node::new("a"), Node::new("b")];
        let edges = vec![Edge::new("ab", "a", "b"), Edge::new("ba", "b", "a")];

        let result = solve(&nodes, &edges);

        assert_eq!(result.feedback_edges(), &[Id::new("ba")]);
        assert_eq!(placement(&result, "a").layer(), 0);
        assert_eq!(placement(&result, "b").layer(), 1);
    }

    #[test]
    fn test_self_loop_is_feedback() {
        let nodes = vec![Node::new("a")];
        let edges = vec![Edge::new("aa", "a", "a")];

        let result = solve(&nodes, &edges);

        assert_eq!(result.feedback_edges(), &[Id::new("aa")]);
        assert_eq!(placement(&result, "a").layer(), 0);
    }

    #[test]
    fn test_branch_order_follows_cases() {
        let branch = Node::new("if").with_role(NodeRole::Branch(
            BranchDefinition::new(["true"]).with_default_case("false"),
        ));
        let nodes = vec![branch, Node::new("c"), Node::new("b")];

        for edges in [
            vec![
                Edge::new("ab", "if", "b").with_source_port("true"),
                Edge::new("ac", "if", "c").with_source_port("false"),
            ],
            vec![
                Edge::new("ac", "if", "c").with_source_port("false"),
                Edge::new("ab", "if", "b").with_source_port("true"),
            ],
        ] {
            let result = solve(&nodes, &edges);
            assert!(center_y(&result, "b") < center_y(&result, "c"));
        }
    }

    #[test]
    fn test_unmeasured_node_gets_default_size() {
        let nodes = vec![
            Node::new("nan").with_size(Size::new(f32::NAN, 10.0)),
            Node::new("unset"),
        ];

        let result = solve(&nodes, &[]);

        assert_eq!(placement(&result, "nan").size(), Size::new(240.0, 90.0));
        assert_eq!(placement(&result, "unset").size(), Size::new(240.0, 90.0));
    }

    #[test]
    fn test_cancelled_before_ordering() {
        let nodes = vec![Node::new("a"), Node::new("b")];
        let edges = vec![Edge::new("ab", "a", "b")];
        let problems = build_problems(&nodes, &edges);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = Engine::new().solve(&problems.root, &PortAssignment::default(), &cancel);

        assert!(matches!(result, Err(TrellisError::Cancelled)));
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    /// Node sizes and edge endpoints of a random graph.
    fn graph_strategy() -> impl Strategy<Value = (Vec<(f32, f32)>, Vec<(usize, usize)>)> {
        prop::collection::vec((40.0f32..400.0, 20.0f32..200.0), 1..12).prop_flat_map(|sizes| {
            let count = sizes.len();
            let edges = prop::collection::vec((0..count, 0..count), 0..(count * 2));
            (Just(sizes), edges)
        })
    }

    fn build_graph(
        sizes: &[(f32, f32)],
        edge_pairs: &[(usize, usize)],
    ) -> (Vec<Node>, Vec<Edge>) {
        let nodes = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                Node::new(format!("n{i}").as_str()).with_size(Size::new(w, h))
            })
            .collect();
        let edges = edge_pairs
            .iter()
            .enumerate()
            .map(|(i, &(s, t))| {
                Edge::new(
                    format!("e{i}").as_str(),
                    format!("n{s}").as_str(),
                    format!("n{t}").as_str(),
                )
            })
            .collect();
        (nodes, edges)
    }

    fn check_deterministic(
        sizes: Vec<(f32, f32)>,
        edge_pairs: Vec<(usize, usize)>,
    ) -> Result<(), TestCaseError> {
        let (nodes, edges) = build_graph(&sizes, &edge_pairs);
        let first = solve(&nodes, &edges);
        let second = solve(&nodes, &edges);
        prop_assert_eq!(first, second);
        Ok(())
    }

    fn check_layers_respect_edges(
        sizes: Vec<(f32, f32)>,
        edge_pairs: Vec<(usize, usize)>,
    ) -> Result<(), TestCaseError> {
        let (nodes, edges) = build_graph(&sizes, &edge_pairs);
        let result = solve(&nodes, &edges);

        for edge in &edges {
            if result.feedback_edges().contains(&edge.id()) {
                continue;
            }
            let source = result.get(edge.source()).map(NodePlacement::layer);
            let target = result.get(edge.target()).map(NodePlacement::layer);
            prop_assert!(
                source < target,
                "edge {} does not advance layers",
                edge.id()
            );
        }
        Ok(())
    }

    fn check_no_overlap(
        sizes: Vec<(f32, f32)>,
        edge_pairs: Vec<(usize, usize)>,
    ) -> Result<(), TestCaseError> {
        let (nodes, edges) = build_graph(&sizes, &edge_pairs);
        let result = solve(&nodes, &edges);
        let placements: Vec<&NodePlacement> =
            result.iter().map(|(_, placement)| placement).collect();

        for (i, a) in placements.iter().enumerate() {
            for b in &placements[i + 1..] {
                // Shrink by a hair so that boxes which only touch after
                // rounding are not reported.
                let a_box = a.bounds().add_padding(Insets::uniform(-0.01));
                let b_box = b.bounds().add_padding(Insets::uniform(-0.01));
                prop_assert!(!a_box.intersects(&b_box), "{a:?} overlaps {b:?}");
            }
        }
        Ok(())
    }

    fn check_same_layer_clearance(
        sizes: Vec<(f32, f32)>,
        edge_pairs: Vec<(usize, usize)>,
    ) -> Result<(), TestCaseError> {
        let (nodes, edges) = build_graph(&sizes, &edge_pairs);
        let result = solve(&nodes, &edges);
        let mut placements: Vec<&NodePlacement> =
            result.iter().map(|(_, placement)| placement).collect();
        placements.sort_by(|a, b| {
            (a.layer(), a.position().y())
                .partial_cmp(&(b.layer(), b.position().y()))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for pair in placements.windows(2) {
            if pair[0].layer() != pair[1].layer() {
                continue;
            }
            let gap =
                pair[1].position().y() - (pair[0].position().y() + pair[0].size().height());
            prop_assert!(gap >= 60.0 - 1e-3, "gap {gap} below minimum");
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn solve_is_deterministic((sizes, edges) in graph_strategy()) {
            check_deterministic(sizes, edges)?;
        }

        #[test]
        fn layers_respect_edges((sizes, edges) in graph_strategy()) {
            check_layers_respect_edges(sizes, edges)?;
        }

        #[test]
        fn placements_do_not_overlap((sizes, edges) in graph_strategy()) {
            check_no_overlap(sizes, edges)?;
        }

        #[test]
        fn same_layer_clearance((sizes, edges) in graph_strategy()) {
            check_same_layer_clearance(sizes, edges)?;
        }
    }
}
