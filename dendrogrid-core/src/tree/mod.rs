//! Cluster tree construction from an agglomerative clustering result.
//!
//! Merge steps arrive in agglomeration order, which is also a valid
//! topological order: any positive operand references a cluster produced by
//! an earlier step. The builder walks the steps once, resolving each operand
//! to either a leaf anchored at the zero-height edge or an already-built
//! node, and emits one [`ClusterNode`] per step with its orthogonal link
//! geometry precomputed so the hit tester never has to re-derive it.
//!
//! The node map is rebuilt wholesale on every render pass that affects
//! geometry (zoom, resize, transposition, new clustering result) and lives
//! for exactly one render cycle.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::error::{GeometryError, Result};
use crate::layout::DendrogramGeometry;
use crate::model::{AxisClustering, ClusterId, MergeOperand};

/// Endpoints of one orthogonal dendrogram link in local coordinates.
///
/// `cross` runs along the leaf axis, `main` along the height axis; mapping
/// (cross, main) to screen (x, y) or (y, x) is the presenter's concern. Each
/// child contributes a drop segment from its own anchor `(cross_i, main_i)`
/// down to the shared bar, and the bar segment joins the two drops at the
/// `bar` coordinate. The elbow shape is a rendering convention the hit
/// tester depends on; do not replace it with diagonal links.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkGeometry {
    /// Cross-axis anchor of the first child.
    pub cross1: f64,
    /// Main-axis anchor of the first child.
    pub main1: f64,
    /// Cross-axis anchor of the second child.
    pub cross2: f64,
    /// Main-axis anchor of the second child.
    pub main2: f64,
    /// Main-axis coordinate shared by both drops and the bar segment.
    pub bar: f64,
}

/// One internal node of the built cluster tree.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterNode {
    /// Cross-axis anchor: the midpoint of the two children's anchors, not of
    /// the bar endpoints. Later merge steps extend the tree upward from this
    /// point.
    pub anchor: f64,
    /// Raw merge height in clustering units.
    pub merge_height: f64,
    /// Link geometry for rendering and hit testing.
    pub link: LinkGeometry,
    /// Flattened transitive leaf names, child-first concatenation order.
    pub leaves: Vec<String>,
    /// Direct child cluster ids; leaf children are not represented here.
    pub children: Vec<ClusterId>,
    /// Whether the current branch selection covers this node.
    pub highlighted: bool,
}

impl ClusterNode {
    /// Returns the node's own anchor point as `(cross, main)`: the position
    /// a later merge step treats as this child's endpoint.
    #[must_use]
    pub const fn anchor_point(&self) -> (f64, f64) {
        (self.anchor, self.link.bar)
    }
}

/// The complete node map for one axis, keyed by 1-indexed cluster id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterMap {
    nodes: BTreeMap<ClusterId, ClusterNode>,
}

impl ClusterMap {
    /// Returns the node for a cluster id, if present.
    #[must_use]
    pub fn get(&self, id: ClusterId) -> Option<&ClusterNode> {
        self.nodes.get(&id)
    }

    /// Returns the number of internal nodes (always `leaves - 1` for a
    /// valid result).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when no nodes were built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the root node, the product of the final merge step.
    #[must_use]
    pub fn root(&self) -> Option<(ClusterId, &ClusterNode)> {
        self.nodes.iter().next_back().map(|(id, node)| (*id, node))
    }

    /// Iterates nodes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &ClusterNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }
}

/// A resolved merge operand with its geometry contribution.
struct ResolvedChild {
    cross: f64,
    main: f64,
    leaves: Vec<String>,
    cluster: Option<ClusterId>,
}

/// Builds the full node map for one axis.
///
/// `highlight` carries the 1-indexed ids of the currently selected branch
/// (the clicked cluster plus its descendants); matching nodes come back with
/// their `highlighted` flag set so the renderer can stroke them distinctly.
///
/// # Errors
/// Propagates [`AxisClustering::validate`] failures, and returns
/// [`GeometryError::LeafCountMismatch`] when the geometry was computed for a
/// different leaf count, [`GeometryError::UnknownLeaf`] when an input-order
/// name is absent from the display order, and
/// [`GeometryError::ForwardReference`] when a positive operand references a
/// cluster that has not been built yet. All of these abort the render pass;
/// never draw from a partially built map.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use dendrogrid_core::{
///     AxisClustering, DendrogramGeometry, DendrogramSpec, build_tree,
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
/// assert_eq!(map.len(), 2);
/// let (root, node) = map.root().expect("tree has a root");
/// assert_eq!(root.get(), 2);
/// assert_eq!(node.link.bar, 0.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(skip_all, fields(leaves = axis.leaf_count(), merges = axis.merge.len()))]
pub fn build_tree(
    axis: &AxisClustering,
    geometry: &DendrogramGeometry,
    highlight: &BTreeSet<ClusterId>,
) -> Result<ClusterMap> {
    axis.validate()?;
    if geometry.leaf_count() != axis.leaf_count() {
        return Err(GeometryError::LeafCountMismatch {
            geometry: geometry.leaf_count(),
            clustering: axis.leaf_count(),
        });
    }

    let positions = axis.display_positions();
    let mut nodes = BTreeMap::new();

    for (step, pair) in axis.merge.iter().enumerate() {
        let first = resolve_child(pair.n1, step, axis, geometry, &positions, &nodes)?;
        let second = resolve_child(pair.n2, step, axis, geometry, &positions, &nodes)?;

        let merge_height = axis.height[step].height;
        let bar = geometry.bar_coordinate(merge_height);
        let id = ClusterId::from_step(step);

        let mut leaves = first.leaves;
        leaves.extend(second.leaves);
        let children: Vec<ClusterId> =
            [first.cluster, second.cluster].into_iter().flatten().collect();

        nodes.insert(
            id,
            ClusterNode {
                anchor: (first.cross + second.cross) / 2.0,
                merge_height,
                link: LinkGeometry {
                    cross1: first.cross,
                    main1: first.main,
                    cross2: second.cross,
                    main2: second.main,
                    bar,
                },
                leaves,
                children,
                highlighted: highlight.contains(&id),
            },
        );
    }

    debug!(nodes = nodes.len(), "built cluster tree");
    Ok(ClusterMap { nodes })
}

fn resolve_child(
    raw: i64,
    step: usize,
    axis: &AxisClustering,
    geometry: &DendrogramGeometry,
    positions: &std::collections::HashMap<&str, usize>,
    nodes: &BTreeMap<ClusterId, ClusterNode>,
) -> Result<ResolvedChild> {
    match MergeOperand::decode(raw, step)? {
        MergeOperand::Leaf(index) => {
            let name = axis.input_order.get(index).ok_or(
                GeometryError::LeafIndexOutOfBounds {
                    step,
                    index,
                    leaves: axis.input_order.len(),
                },
            )?;
            let display = *positions
                .get(name.as_str())
                .ok_or_else(|| GeometryError::UnknownLeaf { name: name.clone() })?;
            Ok(ResolvedChild {
                cross: geometry.leaf_anchor(display),
                main: geometry.leaf_extent(),
                leaves: vec![name.clone()],
                cluster: None,
            })
        }
        MergeOperand::Cluster(id) => {
            // decode() already rejects forward references by step index; a
            // miss here means the map and the step sequence disagree.
            let node = nodes
                .get(&id)
                .ok_or(GeometryError::ForwardReference {
                    step,
                    referenced: id.get(),
                })?;
            let (cross, main) = node.anchor_point();
            Ok(ResolvedChild {
                cross,
                main,
                leaves: node.leaves.clone(),
                cluster: Some(id),
            })
        }
    }
}
