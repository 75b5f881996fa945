//! Command-line interface orchestration for dendrogrid.
//!
//! Offers a `layout` command that loads a clustering payload from JSON and
//! reports the computed dendrogram geometry, and a `hit` command that
//! additionally resolves a local-coordinate click against one axis's tree.

mod commands;

pub use commands::{
    AxisArg, AxisSummary, Cli, CliError, Command, ExecutionSummary, HitArgs, HitSummary,
    LayoutArgs, render_summary, run_cli,
};
