//! Viewport reconciliation.
//!
//! After a relayout the editor should not jump: the anchor node must stay at
//! the same screen position. With `screen = world * zoom + pan`, that means
//! shifting the pan by the anchor's world-space movement scaled by zoom.

use trellis_core::{geometry::Point, graph::Viewport, identifier::Id};

use super::placement::LayoutResult;
use crate::structure::LayoutProblem;

/// Picks the node a layout is pinned by.
///
/// This is the scope's designated entry node when it was placed, otherwise the
/// first node (in problem order) on layer 0.
pub fn resolve_anchor(problem: &LayoutProblem, result: &LayoutResult) -> Option<Id> {
    problem
        .entry_node()
        .filter(|entry| result.contains(*entry))
        .or_else(|| {
            problem
                .nodes()
                .map(|node| node.id())
                .find(|id| {
                    result
                        .get(*id)
                        .is_some_and(|placement| placement.layer() == 0)
                })
        })
}

/// Returns the viewport that keeps the anchor at the same screen position.
///
/// If either anchor position is unknown the viewport is returned unchanged.
pub fn reconcile_viewport(
    old_anchor: Option<Point>,
    new_anchor: Option<Point>,
    viewport: Viewport,
) -> Viewport {
    match (old_anchor, new_anchor) {
        (Some(old), Some(new)) => {
            let delta = old.sub_point(new).scale(viewport.zoom());
            viewport.with_pan(viewport.pan().add_point(delta))
        }
        _ => viewport,
    }
}
