//! Layout engine orchestration.
//!
//! [`EngineBuilder`] walks a [`ProblemHierarchy`] innermost first. Each nested
//! problem is solved and normalised, its container is grown to fit it, and the
//! container's own problem is solved next. Nested results are then anchored
//! inside their container and merged before the enclosing problem is
//! normalised. The root result is the last one produced.

mod sugiyama;

use log::{debug, info, trace};

use trellis_core::{
    geometry::{Insets, Size},
    graph::Node,
    identifier::Id,
};

use crate::{
    cancel::CancellationToken,
    config::LayoutConfig,
    error::TrellisError,
    layout::{
        placement::LayoutResult,
        ports::{self, PortAssignment},
        positioning, viewport,
    },
    structure::{LayoutProblem, ProblemHierarchy, Scope},
};

pub use sugiyama::Engine as LayeredEngine;

/// Trait defining the interface of a placement engine.
///
/// An engine solves one problem in isolation. Nested containers arrive already
/// sized to fit their content.
pub trait PlacementEngine {
    /// Calculate placements for every node of `problem`.
    ///
    /// # Errors
    /// Returns [`TrellisError::Cancelled`] if `cancel` fires before the engine
    /// finishes.
    fn solve(
        &self,
        problem: &LayoutProblem,
        ports: &PortAssignment,
        cancel: &CancellationToken,
    ) -> Result<LayoutResult, TrellisError>;
}

/// The merged layout of a whole hierarchy.
#[derive(Debug, Clone, Default)]
pub struct HierarchyLayout {
    result: LayoutResult,
    anchor: Option<Id>,
}

impl HierarchyLayout {
    /// Placements of every node, nested ones included, normalised to the origin.
    pub fn result(&self) -> &LayoutResult {
        &self.result
    }

    /// The root node the layout is pinned by, if any.
    pub fn anchor(&self) -> Option<Id> {
        self.anchor
    }
}

/// Builder for configuring the layout engine and running it over a hierarchy.
/// Builder is not reuseable after build() is called.
pub struct EngineBuilder {
    engine: Box<dyn PlacementEngine>,

    // Configuration options
    default_node_size: Size,
    container_padding: Insets,
}

impl EngineBuilder {
    /// Create a builder with the layered engine and default configuration.
    pub fn new() -> Self {
        Self::from_config(&LayoutConfig::default())
    }

    /// Create a builder with the layered engine configured from `config`.
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            engine: Box::new(LayeredEngine::from_config(config)),
            default_node_size: config.default_node_size(),
            container_padding: config.container_padding(),
        }
    }

    /// Replace the placement engine.
    pub fn with_engine(mut self, engine: impl PlacementEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Lay out every problem of `hierarchy` and merge the results.
    ///
    /// # Errors
    /// Returns [`TrellisError::Cancelled`] when `cancel` fires. Cancellation is
    /// checked between nested problems and inside the engine.
    pub fn build(
        self,
        hierarchy: ProblemHierarchy,
        cancel: &CancellationToken,
    ) -> Result<HierarchyLayout, TrellisError> {
        // Solved problems by post-order index, taken once merged into their parent.
        let mut solved: Vec<Option<(Scope, HierarchyLayout)>> = Vec::new();

        for node in hierarchy.into_post_order() {
            cancel.check()?;
            let scope = node.problem.scope();
            let nested: Vec<(Scope, HierarchyLayout)> = node
                .children
                .iter()
                .filter_map(|&child| solved.get_mut(child).and_then(Option::take))
                .collect();
            let layout = self.layout_scope(node.problem, nested, cancel)?;
            solved.push(Some((scope, layout)));
        }

        let layout = solved
            .pop()
            .flatten()
            .map(|(_, layout)| layout)
            .unwrap_or_default();

        info!(
            nodes = layout.result.len(),
            feedback_edges = layout.result.feedback_edges().len();
            "Built hierarchy layout"
        );
        trace!(layout:?; "Hierarchy layout");

        Ok(layout)
    }

    /// Lays out one scope whose nested scopes are already laid out.
    fn layout_scope(
        &self,
        mut problem: LayoutProblem,
        nested: Vec<(Scope, HierarchyLayout)>,
        cancel: &CancellationToken,
    ) -> Result<HierarchyLayout, TrellisError> {
        let mut sized = Vec::with_capacity(nested.len());
        for (scope, child_layout) in nested {
            let Some(container) = scope.container() else {
                continue;
            };

            let content = child_layout
                .result
                .bounds()
                .map(|bounds| bounds.to_size())
                .unwrap_or_default();
            let declared = problem
                .node(container)
                .and_then(Node::size)
                .filter(|size| size.is_usable())
                .unwrap_or(self.default_node_size);
            let size = declared.max(content.add_padding(self.container_padding));
            problem.resize_node(container, size);
            debug!(container:% = container, size:? = size; "Sized container to fit nested layout");

            sized.push((container, child_layout));
        }

        let ports = ports::assign_ports(&problem);
        let mut result = self.engine.solve(&problem, &ports, cancel)?;
        let anchor = viewport::resolve_anchor(&problem, &result);

        for (container, child) in sized {
            let placement = result.get(container).copied().ok_or_else(|| {
                TrellisError::Layout(format!("Container {container} was not placed"))
            })?;
            let origin = placement
                .position()
                .add_point(self.container_padding.top_left());

            let entry = child.anchor.and_then(|entry| {
                child
                    .result
                    .get(entry)
                    .map(|placed| (entry, placed.position()))
            });
            let anchored = match entry {
                Some((entry, offset)) => {
                    positioning::anchor_to(child.result, entry, origin.add_point(offset))
                }
                None => child.result.translated(origin),
            };
            result.merge(anchored);
        }

        let (result, bounds) = positioning::normalize(result);
        debug!(
            scope:? = problem.scope(),
            width = bounds.width(),
            height = bounds.height();
            "Laid out scope"
        );

        Ok(HierarchyLayout { result, anchor })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
