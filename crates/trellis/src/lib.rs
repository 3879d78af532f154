//! Trellis - Deterministic layered auto-layout for visual workflow graphs
//!
//! This library arranges the nodes of a workflow canvas into readable,
//! left-to-right (or top-to-bottom) layers. It honours nested containers,
//! keeps the successors of branching nodes in their authored case order, and
//! adjusts the viewport so the editor does not jump after a relayout.
//!
//! The same snapshot always produces the same layout.

pub mod config;
pub mod layout;
pub mod structure;

mod cancel;
mod error;

pub use trellis_core::{geometry, graph, identifier};

pub use cancel::CancellationToken;
pub use error::TrellisError;

use log::{debug, info, trace};
use serde::Serialize;

use trellis_core::{
    geometry::{Point, Size},
    graph::{GraphSnapshot, Node, Viewport},
    identifier::Id,
};

use config::LayoutConfig;
use layout::{EngineBuilder, viewport::reconcile_viewport};
use structure::ProblemHierarchy;

/// One laid-out node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    id: Id,
    position: Point,
    size: Size,
    layer: usize,
    container: Option<Id>,
}

impl PositionedNode {
    pub fn id(&self) -> Id {
        self.id
    }

    /// Top-left corner in canvas coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Final size; containers are grown to fit their content.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Layer index within the node's own scope.
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// The container the node was laid out in, if it is nested.
    pub fn container(&self) -> Option<Id> {
        self.container
    }
}

/// Result of laying out one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOutput {
    nodes: Vec<PositionedNode>,
    viewport: Option<Viewport>,
    feedback_edges: Vec<Id>,
    anchor: Option<Id>,
}

impl LayoutOutput {
    /// Placed nodes in snapshot order. Annotation nodes are not included.
    pub fn nodes(&self) -> &[PositionedNode] {
        &self.nodes
    }

    pub fn node(&self, id: Id) -> Option<&PositionedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// The reconciled viewport, when the snapshot carried one.
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Edges reversed to break cycles, in snapshot order per scope.
    pub fn feedback_edges(&self) -> &[Id] {
        &self.feedback_edges
    }

    /// The root node the viewport was reconciled on.
    pub fn anchor(&self) -> Option<Id> {
        self.anchor
    }
}

/// Entry point for laying out workflow graphs.
///
/// # Examples
///
/// ```rust
/// use trellis::{
///     AutoLayout, CancellationToken,
///     graph::{Edge, GraphSnapshot, Node, NodeRole},
/// };
///
/// let snapshot = GraphSnapshot::new(
///     vec![Node::new("start").with_role(NodeRole::Start), Node::new("answer")],
///     vec![Edge::new("e1", "start", "answer")],
/// );
///
/// let output = AutoLayout::default()
///     .layout(&snapshot, &CancellationToken::new())
///     .expect("layout succeeds");
///
/// assert_eq!(output.nodes().len(), 2);
/// assert_eq!(output.anchor(), Some("start".into()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AutoLayout {
    config: LayoutConfig,
}

impl AutoLayout {
    /// Create a layout entry point with the given configuration.
    ///
    /// Values the engine cannot honour are repaired; see
    /// [`LayoutConfig::validated`].
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `snapshot`.
    ///
    /// Malformed input is repaired or dropped with a warning and never fails the
    /// layout.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Cancelled`] if `cancel` fires before the layout
    /// completes. No partial result is produced.
    pub fn layout(
        &self,
        snapshot: &GraphSnapshot,
        cancel: &CancellationToken,
    ) -> Result<LayoutOutput, TrellisError> {
        info!(
            nodes = snapshot.nodes().len(),
            edges = snapshot.edges().len();
            "Laying out workflow graph"
        );

        let hierarchy = ProblemHierarchy::build(snapshot.nodes(), snapshot.edges());
        let scopes = hierarchy.node_scopes();
        debug!(problems = hierarchy.iter_post_order().count(); "Structure built");

        let layout = EngineBuilder::from_config(&self.config).build(hierarchy, cancel)?;
        let anchor = layout.anchor();

        let viewport = snapshot.viewport().map(|viewport| {
            let old = anchor.and_then(|id| previous_position(snapshot.nodes(), id));
            let new = anchor.and_then(|id| layout.result().get(id).map(|placed| placed.position()));
            reconcile_viewport(old, new, viewport)
        });

        let nodes: Vec<PositionedNode> = structure::placed_ids(snapshot.nodes())
            .into_iter()
            .filter_map(|id| {
                let placed = layout.result().get(id)?;
                Some(PositionedNode {
                    id,
                    position: placed.position(),
                    size: placed.size(),
                    layer: placed.layer(),
                    container: scopes.get(&id).and_then(|scope| scope.container()),
                })
            })
            .collect();

        let output = LayoutOutput {
            nodes,
            viewport,
            feedback_edges: layout.result().feedback_edges().to_vec(),
            anchor,
        };

        info!(
            nodes = output.nodes.len(),
            feedback_edges = output.feedback_edges.len();
            "Layout calculated"
        );
        trace!(output:?; "Layout output");

        Ok(output)
    }
}

/// Position the editor last rendered `id` at, from its first placeable entry.
fn previous_position(nodes: &[Node], id: Id) -> Option<Point> {
    nodes
        .iter()
        .find(|node| node.id() == id && node.is_placeable())
        .and_then(Node::position)
}
