//! Render session: fetch reconciliation, render passes, and click handling.
//!
//! All geometry recomputation happens synchronously inside one render pass
//! triggered by one UI event; the session owns no long-running work. Server
//! fetches are reconciled through a monotonically increasing sequence number
//! so a stale response (superseded before it resolved) is discarded instead
//! of applied. Each render pass returns an explicit [`RenderState`] record;
//! node maps are never attached back onto the fetched payload.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::error::{GeometryError, Result, SessionError};
use crate::grid::{Axis, MatrixGrid};
use crate::hit::hit_test;
use crate::layout::{DendrogramGeometry, DendrogramSpec, MIN_DEVICE_PIXEL_RATIO};
use crate::model::{Clustering, ClusteringPayload, ClusterId};
use crate::selection::{HighlightState, branch_ids};
use crate::settings::ClusterRequest;
use crate::tree::{ClusterMap, build_tree};

/// Sequence number handed out when a fetch starts; the newest one wins.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// Returns the raw sequence number.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// Built geometry for one axis's dendrogram.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisRender {
    /// Pixel layout the nodes were computed against.
    pub geometry: DendrogramGeometry,
    /// The node map for rendering and hit testing.
    pub nodes: ClusterMap,
}

/// The output of one render pass: per-axis trees, or `None` for an axis
/// whose dendrogram is disabled or for which no payload has been applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderState {
    /// Row-axis dendrogram, when enabled.
    pub row: Option<AxisRender>,
    /// Column-axis dendrogram, when enabled.
    pub col: Option<AxisRender>,
}

impl RenderState {
    /// Returns the render for one axis, if built.
    #[must_use]
    pub const fn axis(&self, axis: Axis) -> Option<&AxisRender> {
        match axis {
            Axis::Row => self.row.as_ref(),
            Axis::Col => self.col.as_ref(),
        }
    }
}

/// Which axes need their dendrogram redrawn after an interaction.
///
/// Rebuilding geometry is comparatively expensive, so clicks invalidate only
/// the axes whose highlight actually changed, never the whole matrix.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AxisInvalidation {
    /// The row dendrogram must be redrawn.
    pub row: bool,
    /// The column dendrogram must be redrawn.
    pub col: bool,
}

impl AxisInvalidation {
    fn mark(&mut self, axis: Axis) {
        match axis {
            Axis::Row => self.row = true,
            Axis::Col => self.col = true,
        }
    }
}

/// Result of a branch click.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickOutcome {
    /// The clicked cluster and its full highlight set, or `None` when the
    /// click landed on empty space.
    pub selected: Option<(ClusterId, BTreeSet<ClusterId>)>,
    /// Axes whose dendrograms must be redrawn.
    pub invalidated: AxisInvalidation,
}

/// Owns fetch reconciliation and interaction state across render passes.
///
/// # Examples
/// ```
/// use dendrogrid_core::RenderSession;
///
/// let mut session = RenderSession::new();
/// let older = session.begin_request();
/// let newer = session.begin_request();
/// assert!(older.seq() < newer.seq());
/// ```
#[derive(Clone, Debug)]
pub struct RenderSession {
    newest: u64,
    clustering: Option<Clustering>,
    highlight: HighlightState,
    device_pixel_ratio: f64,
    cache: Option<(u64, RenderState)>,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSession {
    /// Creates a session with no payload applied and a pixel ratio of 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            newest: 0,
            clustering: None,
            highlight: HighlightState::None,
            device_pixel_ratio: MIN_DEVICE_PIXEL_RATIO,
            cache: None,
        }
    }

    /// Records the display's pixel ratio for subsequent render passes.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.device_pixel_ratio = if ratio.is_finite() {
            ratio.max(MIN_DEVICE_PIXEL_RATIO)
        } else {
            MIN_DEVICE_PIXEL_RATIO
        };
        self.cache = None;
    }

    /// Starts a fetch and returns its sequence ticket. Starting a new fetch
    /// supersedes every ticket issued before it.
    pub fn begin_request(&mut self) -> RequestTicket {
        self.newest += 1;
        RequestTicket(self.newest)
    }

    /// Applies a resolved fetch, discarding it when a newer request was
    /// issued after the ticket.
    ///
    /// A structurally different payload clears any active branch highlight.
    ///
    /// # Errors
    /// Returns [`SessionError::StaleResponse`] for a superseded ticket
    /// (expected; discard silently) and [`SessionError::UnknownTicket`] for
    /// a ticket this session never issued.
    pub fn complete_request(
        &mut self,
        ticket: RequestTicket,
        payload: ClusteringPayload,
    ) -> Result<(), SessionError> {
        if ticket.0 == 0 || ticket.0 > self.newest {
            return Err(SessionError::UnknownTicket { ticket: ticket.0 });
        }
        if ticket.0 < self.newest {
            debug!(
                ticket = ticket.0,
                newest = self.newest,
                "discarding stale clustering response"
            );
            return Err(SessionError::StaleResponse {
                ticket: ticket.0,
                newest: self.newest,
            });
        }
        if self.clustering.as_ref() != Some(&payload.clustering) {
            self.highlight = HighlightState::None;
        }
        self.clustering = Some(payload.clustering);
        self.cache = None;
        Ok(())
    }

    /// Clears interaction state after clustering parameters change; the next
    /// fetch will carry the new settings.
    pub fn on_settings_changed(&mut self) {
        self.highlight = HighlightState::None;
        self.cache = None;
    }

    /// Returns the currently applied clustering, if any.
    #[must_use]
    pub const fn clustering(&self) -> Option<&Clustering> {
        self.clustering.as_ref()
    }

    /// Returns the current highlight state.
    #[must_use]
    pub const fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    /// Runs one render pass against the applied payload.
    ///
    /// Axes the request disables come back as `None`; with no payload
    /// applied the whole state is empty. Geometry failures abort only the
    /// dendrogram render and must leave the surrounding matrix functional.
    ///
    /// The last state is memoised against the grid's generation counter:
    /// when neither the grid nor the session has changed since the previous
    /// pass, the cached state is returned without rebuilding any trees. Any
    /// payload, highlight, settings, or pixel-ratio change drops the cache.
    ///
    /// # Errors
    /// Propagates validation and construction failures from the payload,
    /// layout, and tree builder.
    #[instrument(skip_all, fields(generation = grid.generation()))]
    pub fn render(&mut self, request: &ClusterRequest, grid: &MatrixGrid) -> Result<RenderState> {
        if let Some((generation, state)) = &self.cache
            && *generation == grid.generation()
        {
            debug!(generation = *generation, "reusing cached render state");
            return Ok(state.clone());
        }

        let Some(clustering) = &self.clustering else {
            return Ok(RenderState::default());
        };
        clustering.validate()?;

        let row = if request.row_dendrogram_enabled() {
            Some(self.render_axis(
                &clustering.row,
                request.row_dendrogram_extent(),
                grid.cell_size(Axis::Row),
                Axis::Row,
            )?)
        } else {
            None
        };
        let col = if request.col_dendrogram_enabled() {
            Some(self.render_axis(
                &clustering.col,
                request.col_dendrogram_extent(),
                grid.cell_size(Axis::Col),
                Axis::Col,
            )?)
        } else {
            None
        };
        let state = RenderState { row, col };
        self.cache = Some((grid.generation(), state.clone()));
        Ok(state)
    }

    fn render_axis(
        &self,
        axis: &crate::model::AxisClustering,
        extent: f64,
        cell_size: f64,
        side: Axis,
    ) -> Result<AxisRender> {
        let spec = DendrogramSpec::new(
            extent,
            cell_size,
            axis.leaf_count(),
            self.device_pixel_ratio,
        )?;
        let geometry = DendrogramGeometry::for_axis(spec, axis.max_height().unwrap_or(0.0))?;
        let empty = BTreeSet::new();
        let highlight = self.highlight.ids_for(side).unwrap_or(&empty);
        let nodes = build_tree(axis, &geometry, highlight)?;
        Ok(AxisRender { geometry, nodes })
    }

    /// Handles a click at dendrogram-local coordinates on one axis.
    ///
    /// The caller owns the viewport and must already have translated the
    /// pointer position into this axis's local pixel space. A hit selects
    /// the branch and drops any highlight on the opposite axis; a miss
    /// clears whatever highlight exists. The outcome names exactly the axes
    /// that need redrawing.
    ///
    /// # Errors
    /// Propagates descendant-expansion failures on corrupt node maps.
    pub fn click_branch(
        &mut self,
        axis: Axis,
        cross: f64,
        main: f64,
        state: &RenderState,
    ) -> Result<ClickOutcome, GeometryError> {
        let Some(render) = state.axis(axis) else {
            return Ok(ClickOutcome {
                selected: None,
                invalidated: AxisInvalidation::default(),
            });
        };

        let previous = self.highlight.active_axis();
        let mut invalidated = AxisInvalidation::default();

        match hit_test(cross, main, &render.nodes) {
            Some(id) => {
                let ids = branch_ids(id, &render.nodes)?;
                if let Some(axis) = previous {
                    invalidated.mark(axis);
                }
                invalidated.mark(axis);
                self.highlight = HighlightState::select(axis, ids.clone());
                self.cache = None;
                debug!(axis = %axis, cluster = id.get(), branch = ids.len(), "selected branch");
                Ok(ClickOutcome {
                    selected: Some((id, ids)),
                    invalidated,
                })
            }
            None => {
                if let Some(axis) = previous {
                    invalidated.mark(axis);
                    self.cache = None;
                }
                self.highlight = HighlightState::None;
                Ok(ClickOutcome {
                    selected: None,
                    invalidated,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::error::GeometryError;
    use crate::grid::GridSettings;
    use crate::model::{AxisClustering, LeafName, MergeHeight, MergeStep};
    use crate::settings::ClusterRequestBuilder;

    use super::*;

    fn axis(names: &[&str], merge: Vec<(i64, i64)>, heights: Vec<f64>) -> AxisClustering {
        AxisClustering {
            merge: merge
                .into_iter()
                .map(|(n1, n2)| MergeStep { n1, n2 })
                .collect(),
            height: heights
                .into_iter()
                .map(|height| MergeHeight { height })
                .collect(),
            order: names
                .iter()
                .map(|name| LeafName {
                    name: (*name).to_owned(),
                })
                .collect(),
            input_order: names.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    fn payload() -> ClusteringPayload {
        let row = axis(&["G1", "G2", "G3"], vec![(-1, -2), (-3, 1)], vec![1.0, 2.0]);
        let col = axis(
            &["S1", "S2", "S3", "S4"],
            vec![(-1, -2), (-3, -4), (1, 2)],
            vec![1.0, 1.5, 2.0],
        );
        ClusteringPayload {
            clustering: Clustering {
                matrix: vec![vec![0.0; 4]; 3],
                row,
                col,
            },
        }
    }

    fn grid() -> MatrixGrid {
        MatrixGrid::new(GridSettings::default(), 3, 4, 80.0).expect("grid should build")
    }

    fn ready_session() -> RenderSession {
        let mut session = RenderSession::new();
        let ticket = session.begin_request();
        session
            .complete_request(ticket, payload())
            .expect("payload should apply");
        session
    }

    #[test]
    fn discards_stale_response_after_newer_request_resolves() {
        let mut session = RenderSession::new();
        let older = session.begin_request();
        let newer = session.begin_request();

        session
            .complete_request(newer, payload())
            .expect("newest response should apply");
        let err = session
            .complete_request(older, payload())
            .expect_err("stale response must be discarded");
        assert_eq!(
            err,
            SessionError::StaleResponse {
                ticket: older.seq(),
                newest: newer.seq()
            }
        );
        assert!(session.clustering().is_some());
    }

    #[test]
    fn rejects_ticket_never_issued() {
        let mut session = RenderSession::new();
        let err = session
            .complete_request(RequestTicket(7), payload())
            .expect_err("unissued ticket must be rejected");
        assert_eq!(err, SessionError::UnknownTicket { ticket: 7 });
    }

    #[test]
    fn renders_both_axes_with_defaults() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");

        let row = state.row.as_ref().expect("row dendrogram built");
        let col = state.col.as_ref().expect("col dendrogram built");
        assert_eq!(row.nodes.len(), 2);
        assert_eq!(col.nodes.len(), 3);
        assert_eq!(row.geometry.pixel_scale(), 50.0);
    }

    #[test]
    fn disabled_axis_renders_as_none() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new()
            .with_row_dendrogram_extent(0.0)
            .build()
            .expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");
        assert!(state.row.is_none());
        assert!(state.col.is_some());
    }

    #[test]
    fn render_without_payload_is_empty() {
        let mut session = RenderSession::new();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");
        assert_eq!(state, RenderState::default());
    }

    #[test]
    fn single_leaf_axis_surfaces_the_user_facing_condition() {
        let mut session = RenderSession::new();
        let ticket = session.begin_request();
        let mut bad = payload();
        bad.clustering.row = axis(&["G1"], vec![], vec![]);
        bad.clustering.matrix = vec![vec![0.0; 4]];
        session
            .complete_request(ticket, bad)
            .expect("payload should apply");

        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let err = session
            .render(&request, &grid())
            .expect_err("single leaf must be rejected");
        assert_eq!(err, GeometryError::TooFewLeaves { leaves: 1 });
        assert!(err.user_message().is_some());
    }

    #[test]
    fn click_selects_branch_and_invalidates_only_that_axis() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");

        // Column cluster 1's bar: leaves at cross 10 and 30, bar at main 50.
        let outcome = session
            .click_branch(Axis::Col, 20.0, 50.0, &state)
            .expect("click should resolve");
        let (id, ids) = outcome.selected.expect("branch selected");
        assert_eq!(id.get(), 1);
        assert_eq!(ids.len(), 1);
        assert_eq!(
            outcome.invalidated,
            AxisInvalidation {
                row: false,
                col: true
            }
        );
        assert_eq!(session.highlight().active_axis(), Some(Axis::Col));
    }

    #[test]
    fn clicking_the_other_axis_clears_the_previous_highlight() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");

        session
            .click_branch(Axis::Col, 20.0, 50.0, &state)
            .expect("column click should resolve");
        // Row root bar: row axis has 3 leaves of 18px, scale 50; root bar at 0.
        let outcome = session
            .click_branch(Axis::Row, 22.5, 0.0, &state)
            .expect("row click should resolve");

        assert!(outcome.selected.is_some());
        assert_eq!(outcome.invalidated, AxisInvalidation { row: true, col: true });
        assert_eq!(session.highlight().active_axis(), Some(Axis::Row));
    }

    #[test]
    fn empty_space_click_clears_and_invalidates_the_highlighted_axis() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");

        session
            .click_branch(Axis::Col, 20.0, 50.0, &state)
            .expect("column click should resolve");
        let outcome = session
            .click_branch(Axis::Col, 40.0, 80.0, &state)
            .expect("miss should resolve");

        assert!(outcome.selected.is_none());
        assert_eq!(
            outcome.invalidated,
            AxisInvalidation {
                row: false,
                col: true
            }
        );
        assert_eq!(session.highlight(), &HighlightState::None);
    }

    #[test]
    fn new_payload_clears_highlight_when_structure_changes() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");
        session
            .click_branch(Axis::Col, 20.0, 50.0, &state)
            .expect("click should resolve");
        assert_ne!(session.highlight(), &HighlightState::None);

        let ticket = session.begin_request();
        let mut changed = payload();
        changed.clustering.col.height[0].height = 1.2;
        session
            .complete_request(ticket, changed)
            .expect("payload should apply");
        assert_eq!(session.highlight(), &HighlightState::None);
    }

    #[test]
    fn identical_payload_keeps_highlight() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");
        session
            .click_branch(Axis::Col, 20.0, 50.0, &state)
            .expect("click should resolve");

        let ticket = session.begin_request();
        session
            .complete_request(ticket, payload())
            .expect("payload should apply");
        assert_eq!(session.highlight().active_axis(), Some(Axis::Col));
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn settings_change_clears_highlight(#[case] select_first: bool) {
        let mut session = ready_session();
        if select_first {
            let request = ClusterRequestBuilder::new().build().expect("request builds");
            let state = session.render(&request, &grid()).expect("render should succeed");
            session
                .click_branch(Axis::Col, 20.0, 50.0, &state)
                .expect("click should resolve");
        }
        session.on_settings_changed();
        assert_eq!(session.highlight(), &HighlightState::None);
    }

    #[test]
    fn render_memoises_against_the_grid_generation() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let grid = grid();

        let first = session.render(&request, &grid).expect("render should succeed");
        assert_eq!(
            session.cache.as_ref().map(|(generation, _)| *generation),
            Some(grid.generation())
        );
        let second = session.render(&request, &grid).expect("render should succeed");
        assert_eq!(second, first);
    }

    #[test]
    fn grid_mutation_invalidates_the_cached_render() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let mut grid = grid();

        let first = session.render(&request, &grid).expect("render should succeed");
        grid.set_zoom(2.0).expect("zoom should apply");
        let second = session.render(&request, &grid).expect("render should succeed");

        let before = first.col.as_ref().expect("col dendrogram built");
        let after = second.col.as_ref().expect("col dendrogram built");
        assert_eq!(before.geometry.css_size().leaf_axis, 80.0);
        assert_eq!(after.geometry.css_size().leaf_axis, 160.0);
    }

    #[test]
    fn click_drops_the_cached_render() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");
        assert!(session.cache.is_some());

        session
            .click_branch(Axis::Col, 20.0, 50.0, &state)
            .expect("click should resolve");
        assert!(session.cache.is_none());
    }

    #[test]
    fn highlight_flags_flow_into_the_next_render() {
        let mut session = ready_session();
        let request = ClusterRequestBuilder::new().build().expect("request builds");
        let state = session.render(&request, &grid()).expect("render should succeed");
        session
            .click_branch(Axis::Col, 40.0, 0.0, &state)
            .expect("root click should resolve");

        let next = session.render(&request, &grid()).expect("render should succeed");
        let col = next.col.as_ref().expect("col dendrogram built");
        assert!(col.nodes.iter().all(|(_, node)| node.highlighted));
        let row = next.row.as_ref().expect("row dendrogram built");
        assert!(row.nodes.iter().all(|(_, node)| !node.highlighted));
    }
}
