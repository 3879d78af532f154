//! Coordinate assignment.
//!
//! The primary axis (x for left-to-right, y for top-to-bottom) is cumulative:
//! every layer starts after the deepest node of the previous layer plus the
//! layer gap. On the secondary axis each node is pulled toward the median of
//! its neighbours, alternating downward and upward passes. A layer is placed as
//! close to those targets as possible while keeping its order and the node gap,
//! which is an isotonic regression solved by pool-adjacent-violators.

use petgraph::graph::NodeIndex;

use trellis_core::geometry::{Point, Size};

use super::LayeredAdjacency;
use crate::config::Direction;

/// Spacing parameters of coordinate assignment.
#[derive(Debug, Clone, Copy)]
pub(super) struct Spacing {
    pub(super) direction: Direction,
    pub(super) layer_gap: f32,
    pub(super) node_gap: f32,
    pub(super) alignment_passes: usize,
}

impl Spacing {
    /// Extent of a node along the flow direction.
    fn primary(&self, size: Size) -> f32 {
        match self.direction {
            Direction::LeftToRight => size.width(),
            Direction::TopToBottom => size.height(),
        }
    }

    /// Extent of a node across the flow direction.
    fn secondary(&self, size: Size) -> f32 {
        match self.direction {
            Direction::LeftToRight => size.height(),
            Direction::TopToBottom => size.width(),
        }
    }
}

/// Returns the top-left corner of every node, indexed by node index.
pub(super) fn assign_coordinates(
    sizes: &[Size],
    adjacency: &LayeredAdjacency,
    rows: &[Vec<NodeIndex>],
    spacing: &Spacing,
) -> Vec<Point> {
    let mut layer_starts = Vec::with_capacity(rows.len());
    let mut cursor = 0.0f32;
    for row in rows {
        layer_starts.push(cursor);
        let depth = row
            .iter()
            .map(|node| spacing.primary(sizes[node.index()]))
            .fold(0.0f32, f32::max);
        cursor += depth + spacing.layer_gap;
    }

    let mut centers = vec![0.0f32; sizes.len()];
    for row in rows {
        let targets = vec![0.0; row.len()];
        place_row(row, &targets, sizes, spacing, &mut centers);
    }

    let layer_count = rows.len();
    for pass in 0..spacing.alignment_passes {
        let downward = pass % 2 == 0;
        let sequence: Vec<usize> = if downward {
            (1..layer_count).collect()
        } else {
            (0..layer_count.saturating_sub(1)).rev().collect()
        };

        for layer in sequence {
            let row = &rows[layer];
            let targets: Vec<f32> = row
                .iter()
                .map(|&node| {
                    let neighbours = if downward {
                        adjacency.predecessors(node)
                    } else {
                        adjacency.successors(node)
                    };
                    median(neighbours.iter().map(|other| centers[other.index()]))
                        .unwrap_or(centers[node.index()])
                })
                .collect();
            place_row(row, &targets, sizes, spacing, &mut centers);
        }
    }

    let mut positions = vec![Point::default(); sizes.len()];
    for (row, &start) in rows.iter().zip(&layer_starts) {
        for &node in row {
            let size = sizes[node.index()];
            let offset = centers[node.index()] - spacing.secondary(size) / 2.0;
            positions[node.index()] = match spacing.direction {
                Direction::LeftToRight => Point::new(start, offset),
                Direction::TopToBottom => Point::new(offset, start),
            };
        }
    }
    positions
}

/// Places the centres of one row as close to `targets` as the row order and
/// the node gap allow, minimising the squared displacement.
fn place_row(
    row: &[NodeIndex],
    targets: &[f32],
    sizes: &[Size],
    spacing: &Spacing,
    centers: &mut [f32],
) {
    // Minimum distance of each centre from the first one.
    let mut offsets = Vec::with_capacity(row.len());
    let mut acc = 0.0f32;
    for (i, node) in row.iter().enumerate() {
        if i > 0 {
            let previous = spacing.secondary(sizes[row[i - 1].index()]);
            let current = spacing.secondary(sizes[node.index()]);
            acc += previous / 2.0 + spacing.node_gap + current / 2.0;
        }
        offsets.push(acc);
    }

    // Pool adjacent violators on the shifted targets; each block holds its
    // sum and length.
    let mut blocks: Vec<(f32, usize)> = Vec::with_capacity(row.len());
    for (target, offset) in targets.iter().zip(&offsets) {
        blocks.push((target - offset, 1));
        while blocks.len() >= 2 {
            let (last_sum, last_len) = blocks[blocks.len() - 1];
            let (prev_sum, prev_len) = blocks[blocks.len() - 2];
            if prev_sum / prev_len as f32 <= last_sum / last_len as f32 {
                break;
            }
            blocks.pop();
            blocks.pop();
            blocks.push((prev_sum + last_sum, prev_len + last_len));
        }
    }

    let mut i = 0;
    for (sum, len) in blocks {
        let value = sum / len as f32;
        for _ in 0..len {
            centers[row[i].index()] = value + offsets[i];
            i += 1;
        }
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
fn median(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut values: Vec<f32> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;

    use super::*;

    fn spacing(direction: Direction) -> Spacing {
        Spacing {
            direction,
            layer_gap: 80.0,
            node_gap: 60.0,
            alignment_passes: 4,
        }
    }

    fn row(indices: &[usize]) -> Vec<NodeIndex> {
        indices.iter().map(|&i| NodeIndex::new(i)).collect()
    }

    #[test]
    fn test_median() {
        assert_eq!(median(std::iter::empty()), None);
        assert_eq!(median([3.0, 1.0, 2.0].into_iter()), Some(2.0));
        assert_eq!(median([4.0, 1.0].into_iter()), Some(2.5));
    }

    #[test]
    fn test_place_row_centres_on_common_target() {
        let sizes = vec![Size::new(100.0, 40.0); 2];
        let mut centers = vec![0.0; 2];

        place_row(
            &row(&[0, 1]),
            &[0.0, 0.0],
            &sizes,
            &spacing(Direction::LeftToRight),
            &mut centers,
        );

        assert_approx_eq!(f32, centers[0], -50.0);
        assert_approx_eq!(f32, centers[1], 50.0);
    }

    #[test]
    fn test_place_row_honours_distinct_targets() {
        let sizes = vec![Size::new(100.0, 40.0); 2];
        let mut centers = vec![0.0; 2];

        place_row(
            &row(&[0, 1]),
            &[-300.0, 300.0],
            &sizes,
            &spacing(Direction::LeftToRight),
            &mut centers,
        );

        assert_approx_eq!(f32, centers[0], -300.0);
        assert_approx_eq!(f32, centers[1], 300.0);
    }

    #[test]
    fn test_chain_aligns_on_secondary_axis() {
        let sizes = vec![Size::new(240.0, 90.0); 3];
        let adjacency = LayeredAdjacency {
            predecessors: vec![vec![], row(&[0]), row(&[1])],
            successors: vec![row(&[1]), row(&[2]), vec![]],
        };
        let rows = vec![row(&[0]), row(&[1]), row(&[2])];

        let positions =
            assign_coordinates(&sizes, &adjacency, &rows, &spacing(Direction::LeftToRight));

        assert_approx_eq!(f32, positions[0].y(), positions[1].y());
        assert_approx_eq!(f32, positions[1].y(), positions[2].y());
        assert_approx_eq!(f32, positions[1].x(), 320.0);
        assert_approx_eq!(f32, positions[2].x(), 640.0);
    }

    #[test]
    fn test_layer_depth_uses_deepest_node() {
        let sizes = vec![Size::new(100.0, 50.0), Size::new(300.0, 50.0), Size::new(80.0, 50.0)];
        let adjacency = LayeredAdjacency {
            predecessors: vec![vec![], vec![], row(&[0, 1])],
            successors: vec![row(&[2]), row(&[2]), vec![]],
        };
        let rows = vec![row(&[0, 1]), row(&[2])];

        let positions =
            assign_coordinates(&sizes, &adjacency, &rows, &spacing(Direction::LeftToRight));

        assert_approx_eq!(f32, positions[2].x(), 380.0);
        // The child sits between its two parents.
        let parent_mid = (positions[0].y() + 25.0 + positions[1].y() + 25.0) / 2.0;
        assert_approx_eq!(f32, positions[2].y() + 25.0, parent_mid, epsilon = 1e-3);
    }

    #[test]
    fn test_top_to_bottom_swaps_axes() {
        let sizes = vec![Size::new(240.0, 90.0); 2];
        let adjacency = LayeredAdjacency {
            predecessors: vec![vec![], row(&[0])],
            successors: vec![row(&[1]), vec![]],
        };
        let rows = vec![row(&[0]), row(&[1])];

        let positions =
            assign_coordinates(&sizes, &adjacency, &rows, &spacing(Direction::TopToBottom));

        assert_approx_eq!(f32, positions[0].x(), -120.0);
        assert_approx_eq!(f32, positions[1].y(), 170.0);
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    fn check_place_row_clearance(
        extents: Vec<f32>,
        targets: Vec<f32>,
    ) -> Result<(), TestCaseError> {
        let count = extents.len().min(targets.len());
        let sizes: Vec<Size> = extents[..count].iter().map(|&h| Size::new(100.0, h)).collect();
        let indices: Vec<usize> = (0..count).collect();
        let mut centers = vec![0.0; count];

        place_row(
            &row(&indices),
            &targets[..count],
            &sizes,
            &spacing(Direction::LeftToRight),
            &mut centers,
        );

        for i in 1..count {
            let required = (extents[i - 1] + extents[i]) / 2.0 + 60.0;
            let actual = centers[i] - centers[i - 1];
            prop_assert!(
                actual >= required - 1e-2,
                "centres {i} too close: {actual} < {required}"
            );
        }
        Ok(())
    }

    fn check_place_row_keeps_feasible_targets(extents: Vec<f32>) -> Result<(), TestCaseError> {
        // Targets already spaced far apart must be reproduced exactly.
        let sizes: Vec<Size> = extents.iter().map(|&h| Size::new(100.0, h)).collect();
        let targets: Vec<f32> = (0..extents.len()).map(|i| i as f32 * 1000.0).collect();
        let indices: Vec<usize> = (0..extents.len()).collect();
        let mut centers = vec![0.0; extents.len()];

        place_row(
            &row(&indices),
            &targets,
            &sizes,
            &spacing(Direction::LeftToRight),
            &mut centers,
        );

        for (center, target) in centers.iter().zip(&targets) {
            prop_assert!((center - target).abs() < 1e-2);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn place_row_clearance(
            extents in prop::collection::vec(10.0f32..300.0, 1..10),
            targets in prop::collection::vec(-2000.0f32..2000.0, 1..10),
        ) {
            check_place_row_clearance(extents, targets)?;
        }

        #[test]
        fn place_row_keeps_feasible_targets(
            extents in prop::collection::vec(10.0f32..300.0, 1..10),
        ) {
            check_place_row_keeps_feasible_targets(extents)?;
        }
    }
}
