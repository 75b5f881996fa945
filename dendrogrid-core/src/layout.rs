//! Pixel layout for one axis's dendrogram canvas.
//!
//! The dendrogram shares its leaf axis with the matrix grid, so its canvas is
//! sized from the grid's per-cell pixel size and the leaf count, while the
//! height axis spans a user-configured maximum extent. Merge heights map to
//! pixels through a single linear scale factor; dendrograms emphasise
//! topology over exact height comparison, so nothing fancier is warranted.
//!
//! Layout is a pure function of the current settings. It owns no mutable
//! state and is recomputed whenever zoom, transposition, window size, or
//! clustering parameters change.

use tracing::debug;

use crate::error::{GeometryError, Result};

/// Device pixel ratios below 1 are treated as 1 so canvases never shrink
/// under CSS size.
pub const MIN_DEVICE_PIXEL_RATIO: f64 = 1.0;

/// Validated inputs for one axis's dendrogram layout.
///
/// # Examples
/// ```
/// use dendrogrid_core::DendrogramSpec;
///
/// let spec = DendrogramSpec::new(100.0, 18.0, 3, 2.0)?;
/// assert_eq!(spec.max_extent_px(), 100.0);
/// assert_eq!(spec.device_pixel_ratio(), 2.0);
/// # Ok::<(), dendrogrid_core::GeometryError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DendrogramSpec {
    max_extent_px: f64,
    cell_size_px: f64,
    leaf_count: usize,
    device_pixel_ratio: f64,
}

impl DendrogramSpec {
    /// Builds a spec from the configured maximum extent, the grid's cell
    /// size along this axis, the leaf count, and the display's pixel ratio.
    ///
    /// The pixel ratio is clamped to [`MIN_DEVICE_PIXEL_RATIO`].
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidDimension`] when the extent or cell
    /// size is not positive and finite, and [`GeometryError::TooFewLeaves`]
    /// when fewer than two leaves are present.
    pub fn new(
        max_extent_px: f64,
        cell_size_px: f64,
        leaf_count: usize,
        device_pixel_ratio: f64,
    ) -> Result<Self> {
        if !max_extent_px.is_finite() || max_extent_px <= 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "dendrogram extent",
                value: max_extent_px,
            });
        }
        if !cell_size_px.is_finite() || cell_size_px <= 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "cell size",
                value: cell_size_px,
            });
        }
        if leaf_count < 2 {
            return Err(GeometryError::TooFewLeaves { leaves: leaf_count });
        }
        let ratio = if device_pixel_ratio.is_finite() {
            device_pixel_ratio.max(MIN_DEVICE_PIXEL_RATIO)
        } else {
            MIN_DEVICE_PIXEL_RATIO
        };
        Ok(Self {
            max_extent_px,
            cell_size_px,
            leaf_count,
            device_pixel_ratio: ratio,
        })
    }

    /// Returns the configured maximum dendrogram extent in CSS pixels.
    #[must_use]
    pub const fn max_extent_px(&self) -> f64 {
        self.max_extent_px
    }

    /// Returns the per-cell size along the leaf axis in CSS pixels.
    #[must_use]
    pub const fn cell_size_px(&self) -> f64 {
        self.cell_size_px
    }

    /// Returns the number of leaves along this axis.
    #[must_use]
    pub const fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Returns the clamped device pixel ratio.
    #[must_use]
    pub const fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

/// Canvas dimensions in one coordinate space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    /// Extent along the leaf axis.
    pub leaf_axis: f64,
    /// Extent along the height axis.
    pub height_axis: f64,
}

/// Computed pixel geometry for one axis's dendrogram.
///
/// Coordinates handed to consumers stay in CSS pixels; the device size only
/// tells the rasteriser how many physical pixels to allocate, with the ratio
/// applied as a uniform transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DendrogramGeometry {
    spec: DendrogramSpec,
    pixel_scale: f64,
}

impl DendrogramGeometry {
    /// Derives the geometry for one axis from its spec and the largest merge
    /// height of that axis's clustering result.
    ///
    /// # Errors
    /// Returns [`GeometryError::NonPositiveMaxHeight`] when the maximum
    /// height is not a positive finite number, since no meaningful scale can
    /// be derived from it.
    ///
    /// # Examples
    /// ```
    /// use dendrogrid_core::{DendrogramGeometry, DendrogramSpec};
    ///
    /// let spec = DendrogramSpec::new(100.0, 18.0, 3, 1.0)?;
    /// let geometry = DendrogramGeometry::for_axis(spec, 2.0)?;
    /// assert_eq!(geometry.pixel_scale(), 50.0);
    /// assert_eq!(geometry.css_size().leaf_axis, 54.0);
    /// assert_eq!(geometry.css_size().height_axis, 100.0);
    /// # Ok::<(), dendrogrid_core::GeometryError>(())
    /// ```
    pub fn for_axis(spec: DendrogramSpec, max_merge_height: f64) -> Result<Self> {
        if !max_merge_height.is_finite() || max_merge_height <= 0.0 {
            return Err(GeometryError::NonPositiveMaxHeight {
                value: max_merge_height,
            });
        }
        let pixel_scale = spec.max_extent_px / max_merge_height;
        debug!(
            pixel_scale,
            max_merge_height,
            leaves = spec.leaf_count,
            "derived dendrogram scale"
        );
        Ok(Self { spec, pixel_scale })
    }

    /// Returns the linear height-to-pixel scale factor.
    #[must_use]
    pub const fn pixel_scale(&self) -> f64 {
        self.pixel_scale
    }

    /// Returns the coordinate of the zero-height edge, where leaves anchor.
    #[must_use]
    pub const fn leaf_extent(&self) -> f64 {
        self.spec.max_extent_px
    }

    /// Returns the per-cell size along the leaf axis.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.spec.cell_size_px
    }

    /// Returns the number of leaves this geometry was computed for.
    #[must_use]
    pub const fn leaf_count(&self) -> usize {
        self.spec.leaf_count
    }

    /// Returns the cross-axis anchor of the leaf at a display position: the
    /// centre of its matrix cell, not the edge.
    #[must_use]
    pub fn leaf_anchor(&self, display_index: usize) -> f64 {
        display_index as f64 * self.spec.cell_size_px + 0.5 * self.spec.cell_size_px
    }

    /// Converts a merge height to its branch-bar pixel coordinate, measured
    /// from the zero-height edge towards the canvas origin.
    #[must_use]
    pub fn bar_coordinate(&self, merge_height: f64) -> f64 {
        self.spec.max_extent_px - merge_height * self.pixel_scale
    }

    /// Returns the canvas size in CSS pixels.
    #[must_use]
    pub fn css_size(&self) -> CanvasSize {
        CanvasSize {
            leaf_axis: self.spec.cell_size_px * self.spec.leaf_count as f64,
            height_axis: self.spec.max_extent_px,
        }
    }

    /// Returns the canvas size in physical device pixels.
    #[must_use]
    pub fn device_size(&self) -> CanvasSize {
        let css = self.css_size();
        CanvasSize {
            leaf_axis: css.leaf_axis * self.spec.device_pixel_ratio,
            height_axis: css.height_axis * self.spec.device_pixel_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn pixel_scale_round_trips_to_configured_extent() {
        let spec = DendrogramSpec::new(240.0, 12.0, 8, 1.0).expect("spec should build");
        let geometry = DendrogramGeometry::for_axis(spec, 3.7).expect("geometry should build");
        assert!((geometry.pixel_scale() * 3.7 - 240.0).abs() < 1e-9);
        assert!((geometry.bar_coordinate(3.7)).abs() < 1e-9);
    }

    #[test]
    fn sizes_canvas_from_cells_and_extent() {
        let spec = DendrogramSpec::new(100.0, 18.0, 5, 1.0).expect("spec should build");
        let geometry = DendrogramGeometry::for_axis(spec, 4.0).expect("geometry should build");
        let css = geometry.css_size();
        assert_eq!(css.leaf_axis, 90.0);
        assert_eq!(css.height_axis, 100.0);
    }

    #[rstest]
    #[case(2.0, 180.0, 200.0)]
    #[case(0.5, 90.0, 100.0)]
    #[case(f64::NAN, 90.0, 100.0)]
    fn scales_device_size_by_clamped_ratio(
        #[case] ratio: f64,
        #[case] expected_leaf: f64,
        #[case] expected_height: f64,
    ) {
        let spec = DendrogramSpec::new(100.0, 18.0, 5, ratio).expect("spec should build");
        let geometry = DendrogramGeometry::for_axis(spec, 4.0).expect("geometry should build");
        let device = geometry.device_size();
        assert_eq!(device.leaf_axis, expected_leaf);
        assert_eq!(device.height_axis, expected_height);
    }

    #[test]
    fn anchors_leaves_at_cell_centres() {
        let spec = DendrogramSpec::new(100.0, 10.0, 4, 1.0).expect("spec should build");
        let geometry = DendrogramGeometry::for_axis(spec, 1.0).expect("geometry should build");
        assert_eq!(geometry.leaf_anchor(0), 5.0);
        assert_eq!(geometry.leaf_anchor(3), 35.0);
    }

    #[rstest]
    #[case(0.0, 18.0)]
    #[case(-5.0, 18.0)]
    #[case(f64::INFINITY, 18.0)]
    #[case(100.0, 0.0)]
    #[case(100.0, f64::NAN)]
    fn rejects_bad_dimensions(#[case] extent: f64, #[case] cell: f64) {
        let err = DendrogramSpec::new(extent, cell, 3, 1.0).expect_err("spec must be rejected");
        assert!(matches!(err, GeometryError::InvalidDimension { .. }));
    }

    #[test]
    fn rejects_single_leaf_layout() {
        let err = DendrogramSpec::new(100.0, 18.0, 1, 1.0).expect_err("spec must be rejected");
        assert_eq!(err, GeometryError::TooFewLeaves { leaves: 1 });
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn rejects_non_positive_max_height(#[case] max_height: f64) {
        let spec = DendrogramSpec::new(100.0, 18.0, 3, 1.0).expect("spec should build");
        let err =
            DendrogramGeometry::for_axis(spec, max_height).expect_err("geometry must be rejected");
        assert!(matches!(err, GeometryError::NonPositiveMaxHeight { .. }));
    }
}
