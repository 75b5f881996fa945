//! Data model for server-computed hierarchical clustering results.
//!
//! The numerical clustering happens server-side; this module deserialises and
//! validates the `{merge, height, order, inputOrder}` structures the server
//! returns per axis, in the standard agglomerative output format: N leaves
//! produce N-1 merge steps, each pairing two operands where a negative id
//! encodes a leaf and a positive id encodes the cluster produced by an
//! earlier step.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::error::{GeometryError, Result};

/// Identifier for an internal dendrogram node, 1-indexed by convention: the
/// cluster produced by merge step `i` (0-indexed) has id `i + 1`.
///
/// # Examples
/// ```
/// use dendrogrid_core::ClusterId;
///
/// let id = ClusterId::from_step(0);
/// assert_eq!(id.get(), 1);
/// assert_eq!(id.step(), 0);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClusterId(NonZeroUsize);

impl ClusterId {
    /// Builds the id of the cluster produced by the given 0-indexed merge
    /// step.
    #[must_use]
    pub fn from_step(step: usize) -> Self {
        // step + 1 >= 1 always holds; saturating_add keeps the expression
        // panic-free at the usize boundary.
        Self(NonZeroUsize::MIN.saturating_add(step))
    }

    /// Returns the 1-indexed id value.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// Returns the 0-indexed merge step that produced this cluster.
    #[must_use]
    pub const fn step(self) -> usize {
        self.0.get() - 1
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One agglomeration step pairing two operands in the signed wire encoding.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct MergeStep {
    /// First operand: negative for a leaf, positive for an earlier cluster.
    pub n1: i64,
    /// Second operand, same encoding as `n1`.
    pub n2: i64,
}

/// Decoded form of a signed merge operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOperand {
    /// A leaf, carrying its index into the input order.
    Leaf(usize),
    /// A cluster produced by an earlier merge step.
    Cluster(ClusterId),
}

impl MergeOperand {
    /// Decodes a signed wire operand found at the given 0-indexed step.
    ///
    /// Negative `n` decodes to leaf `inputOrder[-n - 1]`; positive `n` to the
    /// cluster produced by the n-th merge (1-indexed). The agglomeration
    /// order of the input format guarantees positive operands only reference
    /// earlier steps; that invariant is enforced here rather than re-derived.
    ///
    /// # Errors
    /// Returns [`GeometryError::ZeroOperand`] for `0` and
    /// [`GeometryError::ForwardReference`] for a positive operand that does
    /// not point at an earlier step.
    pub fn decode(raw: i64, step: usize) -> Result<Self> {
        if raw == 0 {
            return Err(GeometryError::ZeroOperand { step });
        }
        if raw < 0 {
            let index = usize::try_from(-(raw + 1)).map_err(|_| GeometryError::ZeroOperand { step })?;
            return Ok(Self::Leaf(index));
        }
        let referenced = usize::try_from(raw).unwrap_or(usize::MAX);
        if referenced > step {
            return Err(GeometryError::ForwardReference { step, referenced });
        }
        Ok(Self::Cluster(ClusterId::from_step(referenced - 1)))
    }
}

/// Height at which one merge step joins its two operands.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct MergeHeight {
    /// Height in the clustering's own (unitless) distance scale.
    pub height: f64,
}

/// One entry of the final display order.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LeafName {
    /// Sample or term identifier shown at this display position.
    pub name: String,
}

/// A validated per-axis clustering result.
///
/// # Examples
/// ```
/// use dendrogrid_core::AxisClustering;
///
/// let axis: AxisClustering = serde_json::from_str(
///     r#"{
///         "merge": [{"n1": -1, "n2": -2}, {"n1": -3, "n2": 1}],
///         "height": [{"height": 1.0}, {"height": 2.0}],
///         "order": [{"name": "A"}, {"name": "B"}, {"name": "C"}],
///         "inputOrder": ["A", "B", "C"]
///     }"#,
/// )?;
/// axis.validate()?;
/// assert_eq!(axis.leaf_count(), 3);
/// assert_eq!(axis.max_height(), Some(2.0));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AxisClustering {
    /// Merge steps in agglomeration order.
    pub merge: Vec<MergeStep>,
    /// Merge heights, one per step, aligned with `merge`.
    pub height: Vec<MergeHeight>,
    /// Final leaf display order.
    pub order: Vec<LeafName>,
    /// Pre-clustering leaf order, indexed by decoded negative operands.
    #[serde(rename = "inputOrder")]
    pub input_order: Vec<String>,
}

impl AxisClustering {
    /// Returns the number of leaves in the display order.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.order.len()
    }

    /// Returns the largest merge height, or `None` when no steps exist.
    ///
    /// NaN heights are rejected by [`AxisClustering::validate`]; `total_cmp`
    /// keeps this helper well-defined regardless.
    #[must_use]
    pub fn max_height(&self) -> Option<f64> {
        self.height
            .iter()
            .map(|entry| entry.height)
            .max_by(f64::total_cmp)
    }

    /// Checks the structural invariants of the agglomerative format.
    ///
    /// # Errors
    /// Returns [`GeometryError::TooFewLeaves`] for fewer than two leaves,
    /// [`GeometryError::StepCountMismatch`] when the merge and height
    /// sequences do not both have exactly `leaves - 1` entries, and
    /// [`GeometryError::InvalidHeight`] for a negative or non-finite height.
    pub fn validate(&self) -> Result<()> {
        let leaves = self.leaf_count();
        if leaves < 2 {
            return Err(GeometryError::TooFewLeaves { leaves });
        }
        if self.merge.len() != self.height.len() || self.merge.len() != leaves - 1 {
            return Err(GeometryError::StepCountMismatch {
                merges: self.merge.len(),
                heights: self.height.len(),
                leaves,
            });
        }
        for (step, entry) in self.height.iter().enumerate() {
            if !entry.height.is_finite() || entry.height < 0.0 {
                return Err(GeometryError::InvalidHeight {
                    step,
                    value: entry.height,
                });
            }
        }
        Ok(())
    }

    /// Builds the display-position lookup used during tree construction.
    ///
    /// Replaces the per-leaf linear scan of the display order with a
    /// precomputed map so construction stays sub-quadratic on large axes.
    #[must_use]
    pub(crate) fn display_positions(&self) -> HashMap<&str, usize> {
        self.order
            .iter()
            .enumerate()
            .map(|(index, leaf)| (leaf.name.as_str(), index))
            .collect()
    }
}

/// Both axes of a clustering response plus the value matrix they order.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Clustering {
    /// Row-axis (gene/term) clustering.
    pub row: AxisClustering,
    /// Column-axis (sample) clustering.
    pub col: AxisClustering,
    /// Row-major value matrix, `row.leaf_count()` by `col.leaf_count()`.
    pub matrix: Vec<Vec<f64>>,
}

impl Clustering {
    /// Validates both axes and the matrix shape against the leaf counts.
    ///
    /// # Errors
    /// Propagates axis validation failures and returns
    /// [`GeometryError::MatrixShapeMismatch`] when the matrix dimensions do
    /// not match the clustered leaf counts.
    pub fn validate(&self) -> Result<()> {
        self.row.validate()?;
        self.col.validate()?;
        let rows = self.matrix.len();
        let cols = self.matrix.first().map_or(0, Vec::len);
        if rows != self.row.leaf_count()
            || self.matrix.iter().any(|row| row.len() != self.col.leaf_count())
        {
            return Err(GeometryError::MatrixShapeMismatch {
                rows,
                cols,
                expected_rows: self.row.leaf_count(),
                expected_cols: self.col.leaf_count(),
            });
        }
        Ok(())
    }
}

/// Top-level fetch payload wrapping the clustering response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ClusteringPayload {
    /// The clustering body of the response.
    pub clustering: Clustering,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn three_leaf_axis() -> AxisClustering {
        AxisClustering {
            merge: vec![MergeStep { n1: -1, n2: -2 }, MergeStep { n1: -3, n2: 1 }],
            height: vec![MergeHeight { height: 1.0 }, MergeHeight { height: 2.0 }],
            order: vec![
                LeafName { name: "A".into() },
                LeafName { name: "B".into() },
                LeafName { name: "C".into() },
            ],
            input_order: vec!["A".into(), "B".into(), "C".into()],
        }
    }

    #[test]
    fn validates_well_formed_axis() {
        let axis = three_leaf_axis();
        axis.validate().expect("axis should validate");
        assert_eq!(axis.max_height(), Some(2.0));
    }

    #[test]
    fn deserialises_wire_keys() {
        let axis: AxisClustering = serde_json::from_str(
            r#"{
                "merge": [{"n1": -1, "n2": -2}],
                "height": [{"height": 0.5}],
                "order": [{"name": "A"}, {"name": "B"}],
                "inputOrder": ["B", "A"]
            }"#,
        )
        .expect("payload should parse");
        assert_eq!(axis.input_order, vec!["B".to_owned(), "A".to_owned()]);
        axis.validate().expect("axis should validate");
    }

    #[rstest]
    #[case(-1, 0, MergeOperand::Leaf(0))]
    #[case(-7, 3, MergeOperand::Leaf(6))]
    #[case(1, 1, MergeOperand::Cluster(ClusterId::from_step(0)))]
    #[case(3, 4, MergeOperand::Cluster(ClusterId::from_step(2)))]
    fn decodes_operands(#[case] raw: i64, #[case] step: usize, #[case] expected: MergeOperand) {
        assert_eq!(
            MergeOperand::decode(raw, step).expect("operand should decode"),
            expected
        );
    }

    #[test]
    fn rejects_zero_operand() {
        let err = MergeOperand::decode(0, 2).expect_err("zero must be rejected");
        assert_eq!(err, GeometryError::ZeroOperand { step: 2 });
    }

    #[test]
    fn rejects_forward_reference() {
        let err = MergeOperand::decode(5, 3).expect_err("forward reference must be rejected");
        assert_eq!(
            err,
            GeometryError::ForwardReference {
                step: 3,
                referenced: 5
            }
        );
    }

    #[test]
    fn rejects_single_leaf() {
        let axis = AxisClustering {
            merge: vec![],
            height: vec![],
            order: vec![LeafName { name: "A".into() }],
            input_order: vec!["A".into()],
        };
        let err = axis.validate().expect_err("single leaf must be rejected");
        assert_eq!(err, GeometryError::TooFewLeaves { leaves: 1 });
        assert!(err.user_message().is_some());
    }

    #[test]
    fn rejects_step_count_mismatch() {
        let mut axis = three_leaf_axis();
        axis.height.pop();
        let err = axis.validate().expect_err("mismatch must be rejected");
        assert_eq!(
            err,
            GeometryError::StepCountMismatch {
                merges: 2,
                heights: 1,
                leaves: 3
            }
        );
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(-0.5)]
    fn rejects_invalid_heights(#[case] bad: f64) {
        let mut axis = three_leaf_axis();
        axis.height[1].height = bad;
        let err = axis.validate().expect_err("invalid height must be rejected");
        assert!(matches!(err, GeometryError::InvalidHeight { step: 1, .. }));
    }

    #[test]
    fn rejects_matrix_shape_mismatch() {
        let clustering = Clustering {
            row: three_leaf_axis(),
            col: three_leaf_axis(),
            matrix: vec![vec![0.0; 3]; 2],
        };
        let err = clustering
            .validate()
            .expect_err("short matrix must be rejected");
        assert!(matches!(err, GeometryError::MatrixShapeMismatch { .. }));
    }
}
