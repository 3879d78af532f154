//! Solved positions of one or more layout problems.

use indexmap::IndexMap;

use trellis_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

/// Position, size and layer of one placed node.
///
/// `position` is the top-left corner in the coordinate space of the result the
/// placement belongs to. `layer` is the rank inside the node's own scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePlacement {
    position: Point,
    size: Size,
    layer: usize,
}

impl NodePlacement {
    pub fn new(position: Point, size: Size, layer: usize) -> Self {
        Self {
            position,
            size,
            layer,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Returns the bounding box of the node.
    pub fn bounds(&self) -> Bounds {
        self.position.to_bounds(self.size)
    }

    fn translate(self, offset: Point) -> Self {
        Self {
            position: self.position.add_point(offset),
            ..self
        }
    }
}

/// Placements keyed by node id, in problem order, plus the edges the solver
/// reversed to break cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    placements: IndexMap<Id, NodePlacement>,
    feedback_edges: Vec<Id>,
}

impl LayoutResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Id, placement: NodePlacement) {
        self.placements.insert(id, placement);
    }

    /// Marks an edge as reversed during cycle breaking.
    pub fn push_feedback_edge(&mut self, edge: Id) {
        self.feedback_edges.push(edge);
    }

    pub fn get(&self, id: Id) -> Option<&NodePlacement> {
        self.placements.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.placements.contains_key(&id)
    }

    /// Iterates placements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &NodePlacement)> {
        self.placements.iter().map(|(id, placement)| (*id, placement))
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn feedback_edges(&self) -> &[Id] {
        &self.feedback_edges
    }

    /// Returns the bounding box of all placements, or `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        self.placements
            .values()
            .map(NodePlacement::bounds)
            .reduce(|acc, bounds| acc.merge(&bounds))
    }

    /// Returns a copy with every position moved by `offset`.
    pub fn translated(&self, offset: Point) -> Self {
        Self {
            placements: self
                .placements
                .iter()
                .map(|(id, placement)| (*id, placement.translate(offset)))
                .collect(),
            feedback_edges: self.feedback_edges.clone(),
        }
    }

    /// Appends the placements and feedback edges of `other`.
    ///
    /// Placements already present are overwritten in place.
    pub fn merge(&mut self, other: LayoutResult) {
        self.placements.extend(other.placements);
        self.feedback_edges.extend(other.feedback_edges);
    }
}
