//! Matrix grid geometry shared between the cell grid and the dendrograms.
//!
//! Dendrogram geometry is only pixel-correct when it is computed from the
//! same per-cell sizes, group gaps, and cumulative offset adjustments as the
//! matrix itself, so this module owns those numbers for both. Column width
//! is auto-fit to the available viewport width, clamped between configured
//! bounds, and scaled by the zoom level; rows keep a fixed base height plus
//! optional per-row adjustments for taller tracks such as continuous-value
//! rows.
//!
//! Every mutation bumps a generation counter. The render session compares
//! generations to decide when cached dendrogram geometry must be discarded.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{GeometryError, Result};

/// Which side of the matrix an operation refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Axis {
    /// Gene/term rows.
    Row,
    /// Sample columns.
    Col,
}

impl Axis {
    /// Returns the other axis.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Row => Self::Col,
            Self::Col => Self::Row,
        }
    }

    /// Human-readable label used in messages and log fields.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Col => "column",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Static sizing configuration for the grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSettings {
    /// Base row height in CSS pixels.
    pub row_height: f64,
    /// Lower clamp for the auto-fit column width.
    pub min_col_width: f64,
    /// Upper clamp for the auto-fit column width.
    pub max_col_width: f64,
    /// Gap inserted before each group break, in CSS pixels.
    pub group_gap: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            row_height: 18.0,
            min_col_width: 1.0,
            max_col_width: 24.0,
            group_gap: 4.0,
        }
    }
}

/// Per-axis leaf bookkeeping: group breaks and per-leaf size adjustments.
#[derive(Clone, Debug, Default, PartialEq)]
struct AxisTrack {
    count: usize,
    /// Leaf indices that start a new group; a gap is inserted before each.
    group_breaks: Vec<usize>,
    /// Extra extent for individual leaves, keyed by index.
    adjustments: BTreeMap<usize, f64>,
}

/// Mutable grid state the dendrograms must stay aligned with.
///
/// # Examples
/// ```
/// use dendrogrid_core::{Axis, GridSettings, MatrixGrid};
///
/// let mut grid = MatrixGrid::new(GridSettings::default(), 10, 40, 400.0)?;
/// let width = grid.cell_size(Axis::Col);
/// grid.set_zoom(2.0)?;
/// assert_eq!(grid.cell_size(Axis::Col), width * 2.0);
/// # Ok::<(), dendrogrid_core::GeometryError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixGrid {
    settings: GridSettings,
    rows: AxisTrack,
    cols: AxisTrack,
    available_width: f64,
    zoom: f64,
    transposed: bool,
    generation: u64,
}

impl MatrixGrid {
    /// Builds a grid for the given leaf counts and viewport width.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidDimension`] when the viewport width
    /// or any configured size is not positive and finite.
    pub fn new(
        settings: GridSettings,
        row_count: usize,
        col_count: usize,
        available_width: f64,
    ) -> Result<Self> {
        for (what, value) in [
            ("row height", settings.row_height),
            ("minimum column width", settings.min_col_width),
            ("maximum column width", settings.max_col_width),
            ("available width", available_width),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::InvalidDimension { what, value });
            }
        }
        if !settings.group_gap.is_finite() || settings.group_gap < 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "group gap",
                value: settings.group_gap,
            });
        }
        Ok(Self {
            settings,
            rows: AxisTrack {
                count: row_count,
                ..AxisTrack::default()
            },
            cols: AxisTrack {
                count: col_count,
                ..AxisTrack::default()
            },
            available_width,
            zoom: 1.0,
            transposed: false,
            generation: 0,
        })
    }

    /// Returns the per-cell extent along an axis in CSS pixels.
    ///
    /// Columns auto-fit the available width, clamped to the configured
    /// bounds and scaled by the zoom level; rows use the fixed base height.
    #[must_use]
    pub fn cell_size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Col => {
                let count = self.track(Axis::Col).count.max(1);
                let fitted = self.available_width / count as f64;
                fitted
                    .clamp(self.settings.min_col_width, self.settings.max_col_width)
                    * self.zoom
            }
            Axis::Row => self.settings.row_height,
        }
    }

    /// Returns the cumulative pixel offset of a leaf's near edge, including
    /// every group gap and size adjustment before it.
    ///
    /// Linear in the leaf index; fine at the hundreds-of-leaves scale this
    /// grid serves.
    ///
    /// # Errors
    /// Returns [`GeometryError::LeafOffsetOutOfBounds`] when the index is
    /// past the axis leaf count.
    pub fn leaf_offset(&self, axis: Axis, index: usize) -> Result<f64> {
        let track = self.track(axis);
        if index >= track.count {
            return Err(GeometryError::LeafOffsetOutOfBounds {
                index,
                leaves: track.count,
            });
        }
        let cell = self.cell_size(axis);
        let mut offset = index as f64 * cell;
        offset += track
            .adjustments
            .range(..index)
            .map(|(_, extra)| extra)
            .sum::<f64>();
        let gaps = track
            .group_breaks
            .iter()
            .filter(|break_at| **break_at <= index && **break_at > 0)
            .count();
        offset += gaps as f64 * self.settings.group_gap;
        Ok(offset)
    }

    /// Returns the current zoom level applied to the column axis.
    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Returns whether the matrix is currently transposed.
    #[must_use]
    pub const fn transposed(&self) -> bool {
        self.transposed
    }

    /// Returns the leaf count along an axis.
    #[must_use]
    pub fn leaf_count(&self, axis: Axis) -> usize {
        self.track(axis).count
    }

    /// Returns the generation counter; any change invalidates cached
    /// dendrogram geometry.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Updates the zoom level.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidDimension`] for a non-positive or
    /// non-finite zoom.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "zoom level",
                value: zoom,
            });
        }
        self.zoom = zoom;
        self.bump();
        Ok(())
    }

    /// Updates the viewport width the columns auto-fit into.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidDimension`] for a non-positive or
    /// non-finite width.
    pub fn resize(&mut self, available_width: f64) -> Result<()> {
        if !available_width.is_finite() || available_width <= 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "available width",
                value: available_width,
            });
        }
        self.available_width = available_width;
        self.bump();
        Ok(())
    }

    /// Swaps the row and column axes.
    pub fn transpose(&mut self) {
        std::mem::swap(&mut self.rows, &mut self.cols);
        self.transposed = !self.transposed;
        self.bump();
        debug!(transposed = self.transposed, "transposed matrix grid");
    }

    /// Replaces the group breaks along an axis. Indices past the leaf count
    /// are ignored by offset accumulation.
    pub fn set_group_breaks(&mut self, axis: Axis, breaks: Vec<usize>) {
        self.track_mut(axis).group_breaks = breaks;
        self.bump();
    }

    /// Adds extra extent to one leaf along an axis, for taller tracks.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidDimension`] for a negative or
    /// non-finite adjustment.
    pub fn set_leaf_adjustment(&mut self, axis: Axis, index: usize, extra: f64) -> Result<()> {
        if !extra.is_finite() || extra < 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "leaf adjustment",
                value: extra,
            });
        }
        self.track_mut(axis).adjustments.insert(index, extra);
        self.bump();
        Ok(())
    }

    const fn track(&self, axis: Axis) -> &AxisTrack {
        match axis {
            Axis::Row => &self.rows,
            Axis::Col => &self.cols,
        }
    }

    const fn track_mut(&mut self, axis: Axis) -> &mut AxisTrack {
        match axis {
            Axis::Row => &mut self.rows,
            Axis::Col => &mut self.cols,
        }
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn grid() -> MatrixGrid {
        MatrixGrid::new(GridSettings::default(), 6, 20, 400.0).expect("grid should build")
    }

    #[test]
    fn auto_fits_column_width_to_viewport() {
        let grid = grid();
        assert_eq!(grid.cell_size(Axis::Col), 20.0);
        assert_eq!(grid.cell_size(Axis::Row), 18.0);
    }

    #[rstest]
    #[case(4000.0, 24.0)] // clamped to max
    #[case(10.0, 1.0)] // clamped to min
    fn clamps_auto_fit_width(#[case] width: f64, #[case] expected: f64) {
        let mut grid = grid();
        grid.resize(width).expect("resize should succeed");
        assert_eq!(grid.cell_size(Axis::Col), expected);
    }

    #[test]
    fn zoom_scales_columns_only() {
        let mut grid = grid();
        grid.set_zoom(1.5).expect("zoom should apply");
        assert_eq!(grid.cell_size(Axis::Col), 30.0);
        assert_eq!(grid.cell_size(Axis::Row), 18.0);
    }

    #[test]
    fn accumulates_offsets_with_gaps_and_adjustments() {
        let mut grid = grid();
        grid.set_group_breaks(Axis::Col, vec![4, 10]);
        grid.set_leaf_adjustment(Axis::Col, 2, 6.0)
            .expect("adjustment should apply");

        // Leaf 1: one cell, before any break or adjustment.
        assert_eq!(grid.leaf_offset(Axis::Col, 1).expect("offset"), 20.0);
        // Leaf 3: three cells plus leaf 2's extra extent.
        assert_eq!(grid.leaf_offset(Axis::Col, 3).expect("offset"), 66.0);
        // Leaf 4 starts a group: gap applies from the break onwards.
        assert_eq!(grid.leaf_offset(Axis::Col, 4).expect("offset"), 90.0);
        // Leaf 12 is past both breaks.
        assert_eq!(grid.leaf_offset(Axis::Col, 12).expect("offset"), 254.0);
    }

    #[test]
    fn rejects_offset_past_leaf_count() {
        let grid = grid();
        let err = grid
            .leaf_offset(Axis::Row, 6)
            .expect_err("out-of-range index must be rejected");
        assert_eq!(err, GeometryError::LeafOffsetOutOfBounds { index: 6, leaves: 6 });
    }

    #[test]
    fn transpose_swaps_axes_and_bumps_generation() {
        let mut grid = grid();
        let before = grid.generation();
        grid.transpose();
        assert!(grid.transposed());
        assert_eq!(grid.leaf_count(Axis::Row), 20);
        assert_eq!(grid.leaf_count(Axis::Col), 6);
        assert!(grid.generation() > before);
    }

    #[test]
    fn every_mutation_bumps_the_generation() {
        let mut grid = grid();
        let mut last = grid.generation();
        grid.set_zoom(2.0).expect("zoom should apply");
        assert!(grid.generation() > last);
        last = grid.generation();
        grid.resize(500.0).expect("resize should succeed");
        assert!(grid.generation() > last);
        last = grid.generation();
        grid.set_group_breaks(Axis::Row, vec![2]);
        assert!(grid.generation() > last);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-2.0)]
    #[case(f64::NAN)]
    fn rejects_invalid_zoom(#[case] zoom: f64) {
        let mut grid = grid();
        let err = grid.set_zoom(zoom).expect_err("zoom must be rejected");
        assert!(matches!(err, GeometryError::InvalidDimension { .. }));
    }
}
