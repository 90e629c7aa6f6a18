#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `locator`: find the features that contain, or lie near, a point.
//!
//! `locator resolve --lat 29.76 --lon -95.37 --radius 5` queries every
//! registered layer and prints the containing features first, then nearby
//! ones by distance. `locator layers` lists what can be queried.
//!
//! Uses `indicatif-log-bridge` (via [`locator_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and per-layer spinners never fight for the terminal.

mod config;
mod output;
mod resolve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use locator_layers::LayersError;
use locator_resolver::ResolveError;
use locator_resolver_models::LayerDefinition;

/// Errors surfaced by the `locator` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A requested layer id isn't registered.
    #[error("Unknown layer: {id} (run `locator layers` to list them)")]
    UnknownLayer { id: String },

    /// Loading `--layers-file` failed.
    #[error(transparent)]
    Layers(#[from] LayersError),

    /// The query itself was rejected.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve a point against feature service layers.
#[derive(Parser)]
#[command(name = "locator")]
#[command(about = "Find features containing or near a point")]
struct Cli {
    /// Extra layer definitions (`[[layer]]` tables); same ids replace
    /// built-in layers.
    #[arg(long, global = true)]
    layers_file: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve a point against one or more layers.
    Resolve(resolve::ResolveArgs),

    /// List available layers.
    Layers,
}

/// Built-in layers, plus those in `layers_file` when given.
fn load_layers(layers_file: Option<&Path>) -> Result<Vec<LayerDefinition>, CliError> {
    Ok(match layers_file {
        Some(path) => locator_layers::merge_layers(locator_layers::load_layers_file(path)?),
        None => locator_layers::all_layers(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = locator_cli_utils::init_logger();
    let cli = Cli::parse();

    let layers = load_layers(cli.layers_file.as_deref())?;

    match cli.command {
        Commands::Resolve(args) => resolve::run(args, layers, &multi).await?,
        Commands::Layers => print!("{}", output::render_layers(&layers)),
    }

    Ok(())
}
