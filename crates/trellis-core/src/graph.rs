//! Editor snapshot model.
//!
//! These are the types an editor hands to the layout engine: one immutable
//! snapshot of nodes, edges, container membership and the current viewport.
//! All of them (de)serialize with camelCase field names so a snapshot can be
//! passed as JSON straight from the canvas.
//!
//! # Example
//!
//! ```
//! use trellis_core::{
//!     geometry::Size,
//!     graph::{BranchDefinition, Edge, GraphSnapshot, Node, NodeRole},
//! };
//!
//! let nodes = vec![
//!     Node::new("start").with_role(NodeRole::Start),
//!     Node::new("check").with_role(NodeRole::Branch(
//!         BranchDefinition::new(["case-a"]).with_default_case("false"),
//!     )),
//!     Node::new("answer").with_size(Size::new(240.0, 120.0)),
//! ];
//! let edges = vec![
//!     Edge::new("e1", "start", "check"),
//!     Edge::new("e2", "check", "answer").with_source_port("case-a"),
//! ];
//!
//! let snapshot = GraphSnapshot::new(nodes, edges);
//! assert_eq!(snapshot.nodes().len(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Point, Size},
    identifier::Id,
};

/// Ordered branch definition of a mutually exclusive branching node.
///
/// `cases` lists the authored case handles in the order the author arranged them.
/// The optional `default_case` is the distinguished else/default handle; it is
/// always ordered after every explicit case, wherever it appears in `cases`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDefinition {
    #[serde(default)]
    cases: Vec<String>,
    #[serde(default)]
    default_case: Option<String>,
}

impl BranchDefinition {
    /// Creates a definition from the authored case handles.
    pub fn new<I, S>(cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cases: cases.into_iter().map(Into::into).collect(),
            default_case: None,
        }
    }

    /// Sets the default/else handle.
    pub fn with_default_case(mut self, handle: impl Into<String>) -> Self {
        self.default_case = Some(handle.into());
        self
    }

    /// Returns the authored case handles.
    pub fn cases(&self) -> &[String] {
        &self.cases
    }

    /// Returns the default/else handle, if the node has one.
    pub fn default_case(&self) -> Option<&str> {
        self.default_case.as_deref()
    }

    /// Returns true if `handle` is the default/else handle.
    pub fn is_default(&self, handle: &str) -> bool {
        self.default_case.as_deref() == Some(handle)
    }

    /// Returns the authored index of an explicit case.
    ///
    /// The default handle never resolves to an explicit index, even when it is
    /// also listed in `cases`.
    pub fn case_index(&self, handle: &str) -> Option<usize> {
        if self.is_default(handle) {
            return None;
        }
        self.cases
            .iter()
            .filter(|case| !self.is_default(case))
            .position(|case| case == handle)
    }
}

/// Role tag of a node.
///
/// The role decides how a node takes part in layout; it carries no visual
/// information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeRole {
    /// An ordinary placeable node.
    #[default]
    Step,

    /// The designated entry node of the whole graph.
    Start,

    /// A node whose outgoing edges are mutually exclusive branches.
    Branch(BranchDefinition),

    /// A loop/iteration node owning a nested sub-graph.
    Container,

    /// The designated entry node inside a container's sub-graph.
    ContainerEntry,

    /// A note-style node that is never laid out.
    Annotation,
}

/// A node of the workflow graph as the editor currently holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    id: Id,
    #[serde(default)]
    size: Option<Size>,
    #[serde(default)]
    container: Option<Id>,
    #[serde(default)]
    role: NodeRole,
    /// Last rendered top-left position. Never used for placement.
    #[serde(default)]
    position: Option<Point>,
}

impl Node {
    /// Creates a step node with no size, container or previous position.
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            size: None,
            container: None,
            role: NodeRole::Step,
            position: None,
        }
    }

    /// Sets the measured size of the node.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Places the node inside the given container.
    pub fn with_container(mut self, container: impl Into<Id>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Sets the role of the node.
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    /// Records the position the node was last rendered at.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }

    pub fn container(&self) -> Option<Id> {
        self.container
    }

    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    /// Returns the branch definition if this node branches.
    pub fn branch_definition(&self) -> Option<&BranchDefinition> {
        match &self.role {
            NodeRole::Branch(definition) => Some(definition),
            _ => None,
        }
    }

    /// Returns true if the node takes part in layout at all.
    pub fn is_placeable(&self) -> bool {
        !matches!(self.role, NodeRole::Annotation)
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    id: Id,
    source: Id,
    target: Id,
    /// Branch handle on the source node.
    #[serde(default)]
    source_port: Option<String>,
    /// Editor-side flag that the edge lives inside a container.
    #[serde(default)]
    in_container: bool,
}

impl Edge {
    pub fn new(id: impl Into<Id>, source: impl Into<Id>, target: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_port: None,
            in_container: false,
        }
    }

    /// Sets the branch handle the edge leaves its source from.
    pub fn with_source_port(mut self, handle: impl Into<String>) -> Self {
        self.source_port = Some(handle.into());
        self
    }

    /// Sets the editor's container-membership flag.
    pub fn with_in_container(mut self, in_container: bool) -> Self {
        self.in_container = in_container;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn source_port(&self) -> Option<&str> {
        self.source_port.as_deref()
    }

    pub fn in_container(&self) -> bool {
        self.in_container
    }
}

/// Canvas pan and zoom.
///
/// `x`/`y` are the screen-space translation applied after scaling by `zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    x: f32,
    y: f32,
    zoom: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }

    pub fn zoom(self) -> f32 {
        self.zoom
    }

    /// Returns the pan component as a point.
    pub fn pan(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Returns a viewport with the same zoom and a new pan.
    pub fn with_pan(self, pan: Point) -> Self {
        Self {
            x: pan.x(),
            y: pan.y(),
            zoom: self.zoom,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// One immutable snapshot of the editor graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    viewport: Option<Viewport>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            viewport: None,
        }
    }

    /// Attaches the viewport the canvas was showing when the snapshot was taken.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }
}
