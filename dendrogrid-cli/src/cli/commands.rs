//! Command definitions and execution for the dendrogrid CLI.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use dendrogrid_core::{
    Axis, ClusterRequestBuilder, ClusteringPayload, GeometryError, GridSettings, MatrixGrid,
    RenderSession, RenderState, SessionError, SettingsError, expand_descendants, hit_test,
};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "dendrogrid", about = "Compute dendrogram geometry for clustered matrices.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compute and report dendrogram geometry for both axes.
    Layout(LayoutArgs),
    /// Resolve a dendrogram-local click against one axis's tree.
    Hit(HitArgs),
}

/// Geometry options shared by all commands.
#[derive(Debug, Args, Clone)]
pub struct LayoutArgs {
    /// Path to a JSON clustering payload.
    pub path: PathBuf,

    /// Maximum row dendrogram extent in CSS pixels (0 disables the axis).
    #[arg(long, default_value_t = 100.0)]
    pub row_extent: f64,

    /// Maximum column dendrogram extent in CSS pixels (0 disables the axis).
    #[arg(long, default_value_t = 100.0)]
    pub col_extent: f64,

    /// Viewport width the columns auto-fit into.
    #[arg(long, default_value_t = 800.0)]
    pub viewport_width: f64,

    /// Zoom level applied to the column axis.
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f64,

    /// Device pixel ratio of the target display.
    #[arg(long, default_value_t = 1.0)]
    pub pixel_ratio: f64,
}

/// Options for the `hit` command.
#[derive(Debug, Args, Clone)]
pub struct HitArgs {
    /// Geometry options.
    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Axis whose dendrogram receives the click.
    #[arg(long, value_enum)]
    pub axis: AxisArg,

    /// Click position along the leaf axis, in dendrogram-local CSS pixels.
    #[arg(long)]
    pub cross: f64,

    /// Click position along the height axis, in dendrogram-local CSS pixels.
    #[arg(long)]
    pub main: f64,
}

/// Axis selector for the `hit` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AxisArg {
    /// The gene/term rows.
    Row,
    /// The sample columns.
    Col,
}

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Row => Self::Row,
            AxisArg::Col => Self::Col,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while loading the payload.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The payload was not valid JSON in the expected shape.
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying deserialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// Geometry validation or construction failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Request settings were invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Fetch reconciliation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CliError {
    /// Returns the geometry error code when this failure originates in the
    /// geometry layer.
    #[must_use]
    pub const fn geometry_code(&self) -> Option<dendrogrid_core::GeometryErrorCode> {
        match self {
            Self::Geometry(err) => Some(err.code()),
            _ => None,
        }
    }
}

/// Per-axis geometry report.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSummary {
    /// Axis label.
    pub axis: &'static str,
    /// Leaf count along the axis.
    pub leaves: usize,
    /// Internal node count.
    pub nodes: usize,
    /// Linear height-to-pixel scale.
    pub pixel_scale: f64,
    /// Canvas size in CSS pixels, leaf axis first.
    pub css_size: (f64, f64),
    /// Canvas size in device pixels, leaf axis first.
    pub device_size: (f64, f64),
}

/// Report of a resolved click.
#[derive(Debug, Clone, PartialEq)]
pub struct HitSummary {
    /// Axis that was clicked.
    pub axis: &'static str,
    /// The hit cluster id, or `None` for empty space.
    pub cluster: Option<usize>,
    /// Descendant cluster ids of the hit, ascending.
    pub descendants: Vec<usize>,
    /// Leaves subtended by the hit cluster, in construction order.
    pub leaves: Vec<String>,
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSummary {
    /// Payload path the geometry was computed from.
    pub source: String,
    /// Per-axis geometry, row first when enabled.
    pub axes: Vec<AxisSummary>,
    /// Click resolution, for the `hit` command.
    pub hit: Option<HitSummary>,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading, parsing, or geometry computation
/// fails.
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Layout(args) => {
            let (summary, _) = compute_layout(&args)?;
            Ok(summary)
        }
        Command::Hit(args) => {
            let (mut summary, state) = compute_layout(&args.layout)?;
            summary.hit = Some(resolve_hit(&args, &state)?);
            Ok(summary)
        }
    }
}

fn load_payload(path: &Path) -> Result<ClusteringPayload, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compute_layout(args: &LayoutArgs) -> Result<(ExecutionSummary, RenderState), CliError> {
    let payload = load_payload(&args.path)?;
    let row_leaves = payload.clustering.row.leaf_count();
    let col_leaves = payload.clustering.col.leaf_count();

    let mut grid = MatrixGrid::new(GridSettings::default(), row_leaves, col_leaves, args.viewport_width)
        .map_err(CliError::from)?;
    grid.set_zoom(args.zoom)?;

    let request = ClusterRequestBuilder::new()
        .with_row_dendrogram_extent(args.row_extent)
        .with_col_dendrogram_extent(args.col_extent)
        .build()?;

    let mut session = RenderSession::new();
    session.set_device_pixel_ratio(args.pixel_ratio);
    let ticket = session.begin_request();
    session.complete_request(ticket, payload)?;

    let state = session.render(&request, &grid)?;
    let mut axes = Vec::new();
    for (label, axis) in [("row", state.row.as_ref()), ("col", state.col.as_ref())] {
        let Some(render) = axis else { continue };
        let css = render.geometry.css_size();
        let device = render.geometry.device_size();
        axes.push(AxisSummary {
            axis: label,
            leaves: render.geometry.leaf_count(),
            nodes: render.nodes.len(),
            pixel_scale: render.geometry.pixel_scale(),
            css_size: (css.leaf_axis, css.height_axis),
            device_size: (device.leaf_axis, device.height_axis),
        });
    }

    let summary = ExecutionSummary {
        source: args.path.display().to_string(),
        axes,
        hit: None,
    };
    Ok((summary, state))
}

fn resolve_hit(args: &HitArgs, state: &RenderState) -> Result<HitSummary, CliError> {
    let axis = Axis::from(args.axis);
    let Some(render) = state.axis(axis) else {
        return Ok(HitSummary {
            axis: axis.label(),
            cluster: None,
            descendants: Vec::new(),
            leaves: Vec::new(),
        });
    };

    match hit_test(args.cross, args.main, &render.nodes) {
        Some(id) => {
            let descendants = expand_descendants(id, &render.nodes)?
                .into_iter()
                .map(dendrogrid_core::ClusterId::get)
                .collect();
            let leaves = render
                .nodes
                .get(id)
                .map(|node| node.leaves.clone())
                .unwrap_or_default();
            Ok(HitSummary {
                axis: axis.label(),
                cluster: Some(id.get()),
                descendants,
                leaves,
            })
        }
        None => Ok(HitSummary {
            axis: axis.label(),
            cluster: None,
            descendants: Vec::new(),
            leaves: Vec::new(),
        }),
    }
}

/// Renders an execution summary to the provided writer.
///
/// # Errors
/// Propagates writer failures.
pub fn render_summary(summary: &ExecutionSummary, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "payload: {}", summary.source)?;
    for axis in &summary.axes {
        writeln!(
            writer,
            "{} dendrogram: {} leaves, {} nodes, pixel scale {:.4}",
            axis.axis, axis.leaves, axis.nodes, axis.pixel_scale
        )?;
        writeln!(
            writer,
            "  canvas: {:.1}x{:.1} css px, {:.1}x{:.1} device px",
            axis.css_size.0, axis.css_size.1, axis.device_size.0, axis.device_size.1
        )?;
    }
    if let Some(hit) = &summary.hit {
        match hit.cluster {
            Some(id) => {
                writeln!(
                    writer,
                    "{} axis hit: cluster {} ({} descendants)",
                    hit.axis,
                    id,
                    hit.descendants.len()
                )?;
                writeln!(writer, "  leaves: {}", hit.leaves.join(", "))?;
            }
            None => writeln!(writer, "{} axis hit: empty space", hit.axis)?,
        }
    }
    Ok(())
}
