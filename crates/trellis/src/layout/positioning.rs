//! Normalisation and anchoring of solved layouts.
//!
//! Solvers place nodes around an arbitrary origin. [`normalize`] moves a
//! result so that its bounding box starts at (0, 0); [`anchor_to`] moves it so
//! that one chosen node lands on a given point, which is how nested container
//! layouts are pinned inside their container.

use log::debug;

use trellis_core::{
    geometry::{Bounds, Point},
    identifier::Id,
};

use super::placement::LayoutResult;

/// Returns the offset that moves `result` to start at the origin.
pub fn normalize_offset(result: &LayoutResult) -> Point {
    result
        .bounds()
        .map(|bounds| Point::new(-bounds.min_x(), -bounds.min_y()))
        .unwrap_or_default()
}

/// Translates `result` so that its bounding box starts at (0, 0).
///
/// Returns the translated result together with its bounds. An empty result
/// stays empty with zero bounds.
pub fn normalize(result: LayoutResult) -> (LayoutResult, Bounds) {
    let offset = normalize_offset(&result);
    let normalized = if offset.is_zero() {
        result
    } else {
        result.translated(offset)
    };
    let bounds = normalized.bounds().unwrap_or_default();
    (normalized, bounds)
}

/// Translates `result` so that `node` is placed with its top-left corner at
/// `target`.
///
/// Anchoring to a node the result does not contain leaves it untouched.
pub fn anchor_to(result: LayoutResult, node: Id, target: Point) -> LayoutResult {
    let Some(placement) = result.get(node) else {
        debug!(node_id:% = node; "Anchor node not in layout, leaving it in place");
        return result;
    };
    let offset = target.sub_point(placement.position());
    result.translated(offset)
}
