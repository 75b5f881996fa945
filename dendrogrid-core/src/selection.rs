//! Branch selection: descendant expansion and the highlight state machine.
//!
//! Clicking a branch selects the clicked cluster plus every internal node
//! beneath it; leaves are resolved separately through the node's flattened
//! leaf list. At most one axis holds a highlight at a time, so the state is
//! a tagged union rather than a pair of ambient flag fields, and transitions
//! report which axes need their dendrogram redrawn so re-rendering stays
//! axis-scoped.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::{GeometryError, Result};
use crate::grid::Axis;
use crate::model::ClusterId;
use crate::tree::ClusterMap;

/// Collects the transitive internal-node descendants of a cluster.
///
/// The returned ids exclude the starting cluster and contain each descendant
/// exactly once, in ascending order. Child ids are strictly smaller than
/// their parent's by construction; a defensive visit cap converts corrupt
/// input into an error instead of a hang.
///
/// # Errors
/// Returns [`GeometryError::UnknownCluster`] when `id` is absent from the
/// map and [`GeometryError::DescendantCycle`] when the expansion visits more
/// nodes than the map contains.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use dendrogrid_core::{
///     AxisClustering, DendrogramGeometry, DendrogramSpec, build_tree,
///     expand_descendants,
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
/// let (root, _) = map.root().expect("tree has a root");
/// let descendants = expand_descendants(root, &map)?;
/// assert_eq!(descendants.len(), 1);
/// assert_eq!(descendants[0].get(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn expand_descendants(id: ClusterId, map: &ClusterMap) -> Result<Vec<ClusterId>> {
    let start = map
        .get(id)
        .ok_or(GeometryError::UnknownCluster { id: id.get() })?;

    let limit = map.len();
    let mut collected = BTreeSet::new();
    let mut stack: Vec<ClusterId> = start.children.clone();
    let mut visits = 0usize;

    while let Some(child) = stack.pop() {
        visits += 1;
        if visits > limit {
            warn!(id = id.get(), limit, "descendant expansion exceeded visit cap");
            return Err(GeometryError::DescendantCycle { id: id.get(), limit });
        }
        if !collected.insert(child) {
            continue;
        }
        let node = map
            .get(child)
            .ok_or(GeometryError::UnknownCluster { id: child.get() })?;
        stack.extend(node.children.iter().copied());
    }

    Ok(collected.into_iter().collect())
}

/// Returns the full highlight set for a clicked cluster: the cluster itself
/// plus all of its internal descendants.
///
/// # Errors
/// Propagates [`expand_descendants`] failures.
pub fn branch_ids(id: ClusterId, map: &ClusterMap) -> Result<BTreeSet<ClusterId>> {
    let mut ids: BTreeSet<ClusterId> = expand_descendants(id, map)?.into_iter().collect();
    ids.insert(id);
    Ok(ids)
}

/// Which axis's dendrogram currently holds the branch highlight.
///
/// Mutually exclusive by construction: selecting on one axis drops any
/// highlight on the other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HighlightState {
    /// No branch is selected.
    #[default]
    None,
    /// A row-axis branch is selected.
    Rows(BTreeSet<ClusterId>),
    /// A column-axis branch is selected.
    Cols(BTreeSet<ClusterId>),
}

impl HighlightState {
    /// Returns the highlighted ids for the given axis, or `None` when that
    /// axis holds no highlight.
    #[must_use]
    pub fn ids_for(&self, axis: Axis) -> Option<&BTreeSet<ClusterId>> {
        match (self, axis) {
            (Self::Rows(ids), Axis::Row) | (Self::Cols(ids), Axis::Col) => Some(ids),
            _ => None,
        }
    }

    /// Returns the axis currently holding a highlight, if any.
    #[must_use]
    pub const fn active_axis(&self) -> Option<Axis> {
        match self {
            Self::None => None,
            Self::Rows(_) => Some(Axis::Row),
            Self::Cols(_) => Some(Axis::Col),
        }
    }

    /// Builds the state that highlights `ids` on `axis`.
    #[must_use]
    pub const fn select(axis: Axis, ids: BTreeSet<ClusterId>) -> Self {
        match axis {
            Axis::Row => Self::Rows(ids),
            Axis::Col => Self::Cols(ids),
        }
    }
}
