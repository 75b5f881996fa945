//! Dendrogrid core library.
//!
//! Geometry engine for an interactive sample-by-feature matrix with
//! two-dimensional hierarchical clustering. The numeric clustering runs
//! server-side; this crate consumes its `{merge, height, order, inputOrder}`
//! output per axis and owns everything between that payload and the pixels:
//! cluster tree reconstruction, dendrogram pixel layout, click hit testing,
//! branch selection, matrix grid alignment, and the render session that
//! keeps stale fetches and highlight state straight.

mod error;
mod grid;
mod hit;
mod layout;
mod model;
mod selection;
mod session;
mod settings;
mod tree;

pub use crate::{
    error::{
        GeometryError, GeometryErrorCode, Result, SessionError, SessionErrorCode, SettingsError,
        SettingsErrorCode,
    },
    grid::{Axis, GridSettings, MatrixGrid},
    hit::{HIT_TOLERANCE_PX, hit_test},
    layout::{CanvasSize, DendrogramGeometry, DendrogramSpec, MIN_DEVICE_PIXEL_RATIO},
    model::{
        AxisClustering, ClusterId, Clustering, ClusteringPayload, LeafName, MergeHeight,
        MergeOperand, MergeStep,
    },
    selection::{HighlightState, branch_ids, expand_descendants},
    session::{
        AxisInvalidation, AxisRender, ClickOutcome, RenderSession, RenderState, RequestTicket,
    },
    settings::{ClusterMethod, ClusterRequest, ClusterRequestBuilder, DistanceMethod},
    tree::{ClusterMap, ClusterNode, LinkGeometry, build_tree},
};
