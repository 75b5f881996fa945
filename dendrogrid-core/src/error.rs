//! Error types for the dendrogrid core library.
//!
//! Defines the error enums exposed by the public API, each paired with a
//! stable machine-readable code enum for logging and metrics surfaces, plus a
//! convenient result alias.

use thiserror::Error;

/// Convenient alias used throughout the geometry modules.
pub type Result<T, E = GeometryError> = std::result::Result<T, E>;

/// Errors raised while validating clustering input or computing dendrogram
/// geometry.
///
/// Integrity variants are fatal for the render pass that triggered them: a
/// partially built dendrogram is worse than none, so callers must abort the
/// dendrogram render (leaving the rest of the matrix functional) rather than
/// draw from a corrupt node map.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// The per-step sequences of the clustering result disagree in length.
    ///
    /// A valid agglomerative result over N leaves has exactly N-1 merge steps
    /// and N-1 heights.
    #[error(
        "clustering result is inconsistent: {merges} merge steps, {heights} heights, {leaves} leaves"
    )]
    StepCountMismatch {
        /// Number of merge steps in the result.
        merges: usize,
        /// Number of height entries in the result.
        heights: usize,
        /// Number of leaves in the display order.
        leaves: usize,
    },
    /// Fewer than two clusterable items were supplied.
    ///
    /// This is the user-visible degenerate case (for example a single-gene
    /// response); surface [`GeometryError::user_message`] instead of a
    /// generic failure.
    #[error("clustering requires at least 2 items but only {leaves} matched")]
    TooFewLeaves {
        /// Number of eligible leaves in the response.
        leaves: usize,
    },
    /// A leaf named in `inputOrder` does not appear in the display order.
    #[error("leaf `{name}` from the input order is missing from the display order")]
    UnknownLeaf {
        /// The offending leaf name.
        name: String,
    },
    /// A negative merge operand pointed outside the input order.
    #[error("merge step {step} references leaf index {index} but only {leaves} leaves exist")]
    LeafIndexOutOfBounds {
        /// Zero-indexed merge step holding the operand.
        step: usize,
        /// Decoded leaf index.
        index: usize,
        /// Number of leaves available.
        leaves: usize,
    },
    /// A merge operand was zero, which encodes neither a leaf nor a cluster.
    #[error("merge step {step} contains operand 0, which is neither a leaf nor a cluster")]
    ZeroOperand {
        /// Zero-indexed merge step holding the operand.
        step: usize,
    },
    /// A positive merge operand referenced a cluster that has not been built
    /// yet, violating the agglomeration-order invariant of the input format.
    #[error("merge step {step} references cluster {referenced} before it is produced")]
    ForwardReference {
        /// Zero-indexed merge step holding the operand.
        step: usize,
        /// The 1-indexed cluster id that was referenced early.
        referenced: usize,
    },
    /// A merge height was negative or non-finite.
    #[error("merge step {step} carries invalid height {value}")]
    InvalidHeight {
        /// Zero-indexed merge step holding the height.
        step: usize,
        /// The offending height value.
        value: f64,
    },
    /// The maximum merge height was not positive, so no height-to-pixel
    /// scale can be derived.
    #[error("maximum merge height {value} is not positive; cannot derive a pixel scale")]
    NonPositiveMaxHeight {
        /// The maximum height observed across all merge steps.
        value: f64,
    },
    /// A pixel dimension supplied to the layout or grid engine was not a
    /// positive finite number.
    #[error("{what} must be positive and finite (got {value})")]
    InvalidDimension {
        /// Name of the offending dimension.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The layout geometry and the clustering result disagree on leaf count.
    #[error("layout was computed for {geometry} leaves but the clustering result has {clustering}")]
    LeafCountMismatch {
        /// Leaf count baked into the dendrogram geometry.
        geometry: usize,
        /// Leaf count of the clustering result.
        clustering: usize,
    },
    /// The expression matrix shape disagrees with the axis leaf counts.
    #[error("matrix is {rows}x{cols} but clustering describes {expected_rows}x{expected_cols}")]
    MatrixShapeMismatch {
        /// Row count of the matrix payload.
        rows: usize,
        /// Column count of the matrix payload.
        cols: usize,
        /// Row leaf count from the row-axis clustering.
        expected_rows: usize,
        /// Column leaf count from the column-axis clustering.
        expected_cols: usize,
    },
    /// A leaf offset was requested past the end of an axis.
    #[error("leaf index {index} is out of range for an axis of {leaves} leaves")]
    LeafOffsetOutOfBounds {
        /// The requested leaf index.
        index: usize,
        /// Number of leaves on the axis.
        leaves: usize,
    },
    /// An operation referenced a cluster id absent from the node map.
    #[error("cluster {id} is not present in the node map")]
    UnknownCluster {
        /// The 1-indexed cluster id that failed to resolve.
        id: usize,
    },
    /// Descendant expansion visited more nodes than the map contains,
    /// indicating a child id that is not strictly smaller than its parent.
    #[error("descendant expansion from cluster {id} exceeded {limit} visits; input is corrupt")]
    DescendantCycle {
        /// The 1-indexed cluster id the expansion started from.
        id: usize,
        /// The visit cap that was exceeded.
        limit: usize,
    },
}

impl GeometryError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> GeometryErrorCode {
        match self {
            Self::StepCountMismatch { .. } => GeometryErrorCode::StepCountMismatch,
            Self::TooFewLeaves { .. } => GeometryErrorCode::TooFewLeaves,
            Self::UnknownLeaf { .. } => GeometryErrorCode::UnknownLeaf,
            Self::LeafIndexOutOfBounds { .. } => GeometryErrorCode::LeafIndexOutOfBounds,
            Self::ZeroOperand { .. } => GeometryErrorCode::ZeroOperand,
            Self::ForwardReference { .. } => GeometryErrorCode::ForwardReference,
            Self::InvalidHeight { .. } => GeometryErrorCode::InvalidHeight,
            Self::NonPositiveMaxHeight { .. } => GeometryErrorCode::NonPositiveMaxHeight,
            Self::InvalidDimension { .. } => GeometryErrorCode::InvalidDimension,
            Self::LeafCountMismatch { .. } => GeometryErrorCode::LeafCountMismatch,
            Self::MatrixShapeMismatch { .. } => GeometryErrorCode::MatrixShapeMismatch,
            Self::LeafOffsetOutOfBounds { .. } => GeometryErrorCode::LeafOffsetOutOfBounds,
            Self::UnknownCluster { .. } => GeometryErrorCode::UnknownCluster,
            Self::DescendantCycle { .. } => GeometryErrorCode::DescendantCycle,
        }
    }

    /// Returns an instructional message for conditions the user can fix
    /// themselves, or `None` for developer-facing failures.
    ///
    /// # Examples
    /// ```
    /// use dendrogrid_core::GeometryError;
    ///
    /// let err = GeometryError::TooFewLeaves { leaves: 1 };
    /// assert!(err.user_message().is_some());
    /// let err = GeometryError::ZeroOperand { step: 3 };
    /// assert!(err.user_message().is_none());
    /// ```
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::TooFewLeaves { leaves } => Some(format!(
                "Clustering needs at least 2 items but only {leaves} matched. \
                 Add more genes or samples and try again."
            )),
            _ => None,
        }
    }
}

/// Machine-readable error codes for [`GeometryError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum GeometryErrorCode {
    /// Merge, height, and order sequences disagree in length.
    StepCountMismatch,
    /// Fewer than two clusterable items were supplied.
    TooFewLeaves,
    /// A leaf name is missing from the display order.
    UnknownLeaf,
    /// A negative merge operand pointed outside the input order.
    LeafIndexOutOfBounds,
    /// A merge operand was zero.
    ZeroOperand,
    /// A positive merge operand referenced a not-yet-built cluster.
    ForwardReference,
    /// A merge height was negative or non-finite.
    InvalidHeight,
    /// The maximum merge height was not positive.
    NonPositiveMaxHeight,
    /// A pixel dimension was not positive and finite.
    InvalidDimension,
    /// Geometry and clustering leaf counts disagree.
    LeafCountMismatch,
    /// The matrix shape disagrees with the axis leaf counts.
    MatrixShapeMismatch,
    /// A leaf offset was requested past the end of an axis.
    LeafOffsetOutOfBounds,
    /// A cluster id was absent from the node map.
    UnknownCluster,
    /// Descendant expansion exceeded its defensive visit cap.
    DescendantCycle,
}

impl GeometryErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StepCountMismatch => "STEP_COUNT_MISMATCH",
            Self::TooFewLeaves => "TOO_FEW_LEAVES",
            Self::UnknownLeaf => "UNKNOWN_LEAF",
            Self::LeafIndexOutOfBounds => "LEAF_INDEX_OUT_OF_BOUNDS",
            Self::ZeroOperand => "ZERO_OPERAND",
            Self::ForwardReference => "FORWARD_REFERENCE",
            Self::InvalidHeight => "INVALID_HEIGHT",
            Self::NonPositiveMaxHeight => "NON_POSITIVE_MAX_HEIGHT",
            Self::InvalidDimension => "INVALID_DIMENSION",
            Self::LeafCountMismatch => "LEAF_COUNT_MISMATCH",
            Self::MatrixShapeMismatch => "MATRIX_SHAPE_MISMATCH",
            Self::LeafOffsetOutOfBounds => "LEAF_OFFSET_OUT_OF_BOUNDS",
            Self::UnknownCluster => "UNKNOWN_CLUSTER",
            Self::DescendantCycle => "DESCENDANT_CYCLE",
        }
    }
}

impl std::fmt::Display for GeometryErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the render session when reconciling data fetches.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A superseded fetch resolved after a newer one was issued.
    ///
    /// Expected and silently recoverable: discard the payload without
    /// rendering and without surfacing anything to the user.
    #[error("response for request {ticket} is stale; request {newest} was issued after it")]
    StaleResponse {
        /// Sequence number of the response that arrived late.
        ticket: u64,
        /// Newest sequence number issued so far.
        newest: u64,
    },
    /// A completion ticket was never issued by this session.
    #[error("request ticket {ticket} was never issued by this session")]
    UnknownTicket {
        /// The unrecognised sequence number.
        ticket: u64,
    },
}

impl SessionError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> SessionErrorCode {
        match self {
            Self::StaleResponse { .. } => SessionErrorCode::StaleResponse,
            Self::UnknownTicket { .. } => SessionErrorCode::UnknownTicket,
        }
    }
}

/// Machine-readable error codes for [`SessionError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SessionErrorCode {
    /// A superseded fetch resolved after a newer one was issued.
    StaleResponse,
    /// A completion ticket was never issued.
    UnknownTicket,
}

impl SessionErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StaleResponse => "STALE_RESPONSE",
            Self::UnknownTicket => "UNKNOWN_TICKET",
        }
    }
}

/// Errors raised while building a clustering request from user settings.
///
/// These are rejected before any request is issued; an unrecognised method
/// never reaches the server.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SettingsError {
    /// The linkage method is not one of the supported values.
    #[error("unsupported cluster method `{provided}`")]
    UnknownClusterMethod {
        /// Raw value supplied by the caller.
        provided: String,
    },
    /// The distance method is not one of the supported values.
    #[error("unsupported distance method `{provided}`")]
    UnknownDistanceMethod {
        /// Raw value supplied by the caller.
        provided: String,
    },
    /// A dendrogram extent was negative or non-finite (zero is allowed and
    /// disables the axis).
    #[error("{axis} dendrogram extent must be a non-negative finite number (got {value})")]
    InvalidExtent {
        /// Human-readable axis label.
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl SettingsError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> SettingsErrorCode {
        match self {
            Self::UnknownClusterMethod { .. } => SettingsErrorCode::UnknownClusterMethod,
            Self::UnknownDistanceMethod { .. } => SettingsErrorCode::UnknownDistanceMethod,
            Self::InvalidExtent { .. } => SettingsErrorCode::InvalidExtent,
        }
    }
}

/// Machine-readable error codes for [`SettingsError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SettingsErrorCode {
    /// The linkage method is not supported.
    UnknownClusterMethod,
    /// The distance method is not supported.
    UnknownDistanceMethod,
    /// A dendrogram extent was negative or non-finite.
    InvalidExtent,
}

impl SettingsErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownClusterMethod => "UNKNOWN_CLUSTER_METHOD",
            Self::UnknownDistanceMethod => "UNKNOWN_DISTANCE_METHOD",
            Self::InvalidExtent => "INVALID_EXTENT",
        }
    }
}
