//! Click resolution against dendrogram link geometry.
//!
//! Hit testing operates in dendrogram-local CSS pixels: the caller owns the
//! viewport and must subtract the rendered image's bounding-box origin and
//! any scroll or zoom offset before calling in. Each link is tested as three
//! segments (the bar plus one drop per child) with a fixed tolerance chosen
//! for clickability of narrow branches, deliberately independent of cell
//! size.

use crate::model::ClusterId;
use crate::tree::{ClusterMap, LinkGeometry};

/// Distance in CSS pixels within which a segment counts as hit.
pub const HIT_TOLERANCE_PX: f64 = 5.0;

/// Resolves a local-coordinate point to the cluster whose link it touches.
///
/// Returns `None` for empty space; callers must treat that as "clear any
/// existing highlight". Iteration order is irrelevant in practice because
/// orthogonal links do not overlap within the tolerance.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use dendrogrid_core::{
///     AxisClustering, DendrogramGeometry, DendrogramSpec, build_tree, hit_test,
/// };
///
/// let axis: AxisClustering = serde_json::from_str(
///     r#"{
///         "merge": [{"n1": -1, "n2": -2}, {"n1": -3, "n2": 1}],
///         "height": [{"height": 1.0}, {"height": 2.0}],
///         "order": [{"name": "A"}, {"name": "B"}, {"name": "C"}],
///         "inputOrder": ["A", "B", "C"]
///     }"#,
/// )?;
/// let spec = DendrogramSpec::new(100.0, 10.0, 3, 1.0)?;
/// let geometry = DendrogramGeometry::for_axis(spec, 2.0)?;
/// let map = build_tree(&axis, &geometry, &BTreeSet::new())?;
///
/// // The first cluster's bar spans cross 5..15 at main 50.
/// let hit = hit_test(10.0, 52.0, &map).expect("bar should be hit");
/// assert_eq!(hit.get(), 1);
/// assert!(hit_test(60.0, 90.0, &map).is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn hit_test(cross: f64, main: f64, map: &ClusterMap) -> Option<ClusterId> {
    map.iter()
        .find(|(_, node)| link_contains(&node.link, cross, main))
        .map(|(id, _)| id)
}

fn link_contains(link: &LinkGeometry, cross: f64, main: f64) -> bool {
    on_bar(link, cross, main)
        || on_drop(link.cross1, link.main1, link.bar, cross, main)
        || on_drop(link.cross2, link.main2, link.bar, cross, main)
}

/// The bar segment joins the two drops at the shared bar coordinate.
fn on_bar(link: &LinkGeometry, cross: f64, main: f64) -> bool {
    (main - link.bar).abs() <= HIT_TOLERANCE_PX
        && within_span(cross, link.cross1, link.cross2)
}

/// A drop segment runs from a child's own anchor to the bar coordinate at a
/// fixed cross position.
fn on_drop(child_cross: f64, child_main: f64, bar: f64, cross: f64, main: f64) -> bool {
    (cross - child_cross).abs() <= HIT_TOLERANCE_PX && within_span(main, child_main, bar)
}

fn within_span(value: f64, a: f64, b: f64) -> bool {
    value >= a.min(b) - HIT_TOLERANCE_PX && value <= a.max(b) + HIT_TOLERANCE_PX
}
