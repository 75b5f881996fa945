//! Clustering request configuration.
//!
//! The numeric clustering runs server-side; this module validates the user's
//! method and geometry settings before any request is issued, so an
//! unrecognised linkage or distance name never leaves the client.

use std::str::FromStr;

use crate::error::SettingsError;

/// Agglomeration linkage methods the server accepts.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ClusterMethod {
    /// UPGMA average linkage.
    #[default]
    Average,
    /// Complete (maximum) linkage.
    Complete,
    /// Single (minimum) linkage.
    Single,
    /// Ward's minimum-variance method.
    Ward,
    /// WPGMA linkage.
    McQuitty,
    /// Median (WPGMC) linkage.
    Median,
    /// Centroid (UPGMC) linkage.
    Centroid,
}

impl ClusterMethod {
    /// Returns the wire name sent to the server.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Complete => "complete",
            Self::Single => "single",
            Self::Ward => "ward.D2",
            Self::McQuitty => "mcquitty",
            Self::Median => "median",
            Self::Centroid => "centroid",
        }
    }
}

impl FromStr for ClusterMethod {
    type Err = SettingsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "average" => Ok(Self::Average),
            "complete" => Ok(Self::Complete),
            "single" => Ok(Self::Single),
            "ward.D2" | "ward" => Ok(Self::Ward),
            "mcquitty" => Ok(Self::McQuitty),
            "median" => Ok(Self::Median),
            "centroid" => Ok(Self::Centroid),
            _ => Err(SettingsError::UnknownClusterMethod {
                provided: raw.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for ClusterMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pairwise distance methods the server accepts.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DistanceMethod {
    /// Euclidean distance.
    #[default]
    Euclidean,
    /// Chebyshev (maximum coordinate difference) distance.
    Maximum,
    /// Manhattan (city block) distance.
    Manhattan,
    /// Canberra distance.
    Canberra,
    /// One minus Pearson correlation.
    Correlation,
}

impl DistanceMethod {
    /// Returns the wire name sent to the server.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Maximum => "maximum",
            Self::Manhattan => "manhattan",
            Self::Canberra => "canberra",
            Self::Correlation => "correlation",
        }
    }
}

impl FromStr for DistanceMethod {
    type Err = SettingsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "euclidean" => Ok(Self::Euclidean),
            "maximum" => Ok(Self::Maximum),
            "manhattan" => Ok(Self::Manhattan),
            "canberra" => Ok(Self::Canberra),
            "correlation" => Ok(Self::Correlation),
            _ => Err(SettingsError::UnknownDistanceMethod {
                provided: raw.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configures and validates a [`ClusterRequest`].
///
/// # Examples
/// ```
/// use dendrogrid_core::{ClusterMethod, ClusterRequestBuilder, DistanceMethod};
///
/// let request = ClusterRequestBuilder::new()
///     .with_cluster_method(ClusterMethod::Complete)
///     .with_distance_method(DistanceMethod::Correlation)
///     .with_row_dendrogram_extent(0.0)
///     .build()?;
/// assert!(!request.row_dendrogram_enabled());
/// assert!(request.col_dendrogram_enabled());
/// # Ok::<(), dendrogrid_core::SettingsError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ClusterRequestBuilder {
    cluster_method: ClusterMethod,
    distance_method: DistanceMethod,
    row_dendrogram_extent: f64,
    col_dendrogram_extent: f64,
    cluster_rows: bool,
    cluster_cols: bool,
    z_score_transform: bool,
}

impl Default for ClusterRequestBuilder {
    fn default() -> Self {
        Self {
            cluster_method: ClusterMethod::default(),
            distance_method: DistanceMethod::default(),
            row_dendrogram_extent: 100.0,
            col_dendrogram_extent: 100.0,
            cluster_rows: true,
            cluster_cols: true,
            z_score_transform: true,
        }
    }
}

impl ClusterRequestBuilder {
    /// Creates a builder populated with defaults: average linkage, euclidean
    /// distance, 100-pixel dendrograms on both axes, z-score transform on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the linkage method.
    #[must_use]
    pub const fn with_cluster_method(mut self, method: ClusterMethod) -> Self {
        self.cluster_method = method;
        self
    }

    /// Overrides the distance method.
    #[must_use]
    pub const fn with_distance_method(mut self, method: DistanceMethod) -> Self {
        self.distance_method = method;
        self
    }

    /// Sets the row dendrogram's maximum extent; `0` disables the row
    /// dendrogram and its clustering.
    #[must_use]
    pub const fn with_row_dendrogram_extent(mut self, extent: f64) -> Self {
        self.row_dendrogram_extent = extent;
        self
    }

    /// Sets the column dendrogram's maximum extent; `0` disables the column
    /// dendrogram and its clustering.
    #[must_use]
    pub const fn with_col_dendrogram_extent(mut self, extent: f64) -> Self {
        self.col_dendrogram_extent = extent;
        self
    }

    /// Gates whether rows are clustered at all versus simply sorted.
    #[must_use]
    pub const fn with_cluster_rows(mut self, cluster: bool) -> Self {
        self.cluster_rows = cluster;
        self
    }

    /// Gates whether columns are clustered at all versus simply sorted.
    #[must_use]
    pub const fn with_cluster_cols(mut self, cluster: bool) -> Self {
        self.cluster_cols = cluster;
        self
    }

    /// Toggles the z-score transform applied before clustering.
    #[must_use]
    pub const fn with_z_score_transform(mut self, transform: bool) -> Self {
        self.z_score_transform = transform;
        self
    }

    /// Validates the configuration and produces an immutable request.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidExtent`] when either dendrogram
    /// extent is negative or non-finite.
    pub fn build(self) -> Result<ClusterRequest, SettingsError> {
        for (axis, extent) in [
            ("row", self.row_dendrogram_extent),
            ("column", self.col_dendrogram_extent),
        ] {
            if !extent.is_finite() || extent < 0.0 {
                return Err(SettingsError::InvalidExtent {
                    axis,
                    value: extent,
                });
            }
        }
        Ok(ClusterRequest {
            cluster_method: self.cluster_method,
            distance_method: self.distance_method,
            row_dendrogram_extent: self.row_dendrogram_extent,
            col_dendrogram_extent: self.col_dendrogram_extent,
            cluster_rows: self.cluster_rows,
            cluster_cols: self.cluster_cols,
            z_score_transform: self.z_score_transform,
        })
    }
}

/// A validated clustering request ready to be issued.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRequest {
    cluster_method: ClusterMethod,
    distance_method: DistanceMethod,
    row_dendrogram_extent: f64,
    col_dendrogram_extent: f64,
    cluster_rows: bool,
    cluster_cols: bool,
    z_score_transform: bool,
}

impl ClusterRequest {
    /// Returns the linkage method.
    #[must_use]
    pub const fn cluster_method(&self) -> ClusterMethod {
        self.cluster_method
    }

    /// Returns the distance method.
    #[must_use]
    pub const fn distance_method(&self) -> DistanceMethod {
        self.distance_method
    }

    /// Returns the row dendrogram's maximum extent in CSS pixels.
    #[must_use]
    pub const fn row_dendrogram_extent(&self) -> f64 {
        self.row_dendrogram_extent
    }

    /// Returns the column dendrogram's maximum extent in CSS pixels.
    #[must_use]
    pub const fn col_dendrogram_extent(&self) -> f64 {
        self.col_dendrogram_extent
    }

    /// Returns whether the row dendrogram (and row clustering) is enabled.
    #[must_use]
    pub fn row_dendrogram_enabled(&self) -> bool {
        self.cluster_rows && self.row_dendrogram_extent > 0.0
    }

    /// Returns whether the column dendrogram (and column clustering) is
    /// enabled.
    #[must_use]
    pub fn col_dendrogram_enabled(&self) -> bool {
        self.cluster_cols && self.col_dendrogram_extent > 0.0
    }

    /// Returns whether values are z-score transformed before clustering.
    #[must_use]
    pub const fn z_score_transform(&self) -> bool {
        self.z_score_transform
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::error::SettingsError;

    use super::*;

    #[rstest]
    #[case("average", ClusterMethod::Average)]
    #[case("ward.D2", ClusterMethod::Ward)]
    #[case("ward", ClusterMethod::Ward)]
    #[case("mcquitty", ClusterMethod::McQuitty)]
    fn parses_cluster_methods(#[case] raw: &str, #[case] expected: ClusterMethod) {
        assert_eq!(raw.parse::<ClusterMethod>().expect("method parses"), expected);
    }

    #[test]
    fn rejects_unknown_cluster_method_before_request_build() {
        let err = "kmeans"
            .parse::<ClusterMethod>()
            .expect_err("unknown method must be rejected");
        assert_eq!(
            err,
            SettingsError::UnknownClusterMethod {
                provided: "kmeans".into()
            }
        );
    }

    #[rstest]
    #[case("euclidean", DistanceMethod::Euclidean)]
    #[case("canberra", DistanceMethod::Canberra)]
    fn parses_distance_methods(#[case] raw: &str, #[case] expected: DistanceMethod) {
        assert_eq!(
            raw.parse::<DistanceMethod>().expect("method parses"),
            expected
        );
    }

    #[test]
    fn rejects_unknown_distance_method() {
        let err = "cosine"
            .parse::<DistanceMethod>()
            .expect_err("unknown method must be rejected");
        assert!(matches!(err, SettingsError::UnknownDistanceMethod { .. }));
    }

    #[test]
    fn zero_extent_disables_an_axis() {
        let request = ClusterRequestBuilder::new()
            .with_col_dendrogram_extent(0.0)
            .build()
            .expect("request should build");
        assert!(!request.col_dendrogram_enabled());
        assert!(request.row_dendrogram_enabled());
    }

    #[test]
    fn cluster_gate_disables_an_axis_regardless_of_extent() {
        let request = ClusterRequestBuilder::new()
            .with_cluster_rows(false)
            .build()
            .expect("request should build");
        assert!(!request.row_dendrogram_enabled());
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_invalid_extents(#[case] extent: f64) {
        let err = ClusterRequestBuilder::new()
            .with_row_dendrogram_extent(extent)
            .build()
            .expect_err("extent must be rejected");
        assert!(matches!(err, SettingsError::InvalidExtent { axis: "row", .. }));
    }
}
