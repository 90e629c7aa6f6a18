//! The `resolve` subcommand: one point against every selected layer.
//!
//! Layers are resolved concurrently over one shared HTTP connection pool.
//! Within a layer the containment and proximity queries still run in
//! sequence. Ctrl-C cancels every in-flight query; whatever each layer had
//! fetched by then is still printed.

use std::sync::Arc;

use futures::future::join_all;
use locator_cli_utils::{IndicatifProgress, MultiProgress};
use locator_feature_service::arcgis::ArcGisClient;
use locator_resolver::ContainmentProximityResolver;
use locator_resolver_models::{LayerDefinition, Point, Resolution};
use tokio_util::sync::CancellationToken;

use crate::CliError;
use crate::config::{Overrides, Settings};
use crate::output::{self, OutputFormat};

/// Arguments for `locator resolve`.
#[derive(Debug, clap::Args)]
pub struct ResolveArgs {
    /// Latitude of the query point (WGS84).
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the query point (WGS84).
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Search radius in miles, clamped to each layer's maximum.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub radius: f64,

    /// Layer id to query; repeat for several (default: all layers).
    #[arg(long = "layer")]
    pub layers: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Picks the layers named in `wanted`, in that order, or all of them when
/// `wanted` is empty.
///
/// # Errors
///
/// Returns [`CliError::UnknownLayer`] for an id that isn't available.
pub fn select_layers(
    available: Vec<LayerDefinition>,
    wanted: &[String],
) -> Result<Vec<LayerDefinition>, CliError> {
    if wanted.is_empty() {
        return Ok(available);
    }

    wanted
        .iter()
        .map(|id| {
            available
                .iter()
                .find(|layer| &layer.id == id)
                .cloned()
                .ok_or_else(|| CliError::UnknownLayer { id: id.clone() })
        })
        .collect()
}

/// Runs `locator resolve`.
///
/// # Errors
///
/// * [`CliError::UnknownLayer`] if a requested layer doesn't exist
/// * [`CliError::Http`] if the HTTP client cannot be built
/// * [`CliError::Resolve`] if the query point or radius is invalid
/// * [`CliError::Json`] if JSON output fails to serialize
pub async fn run(
    args: ResolveArgs,
    layers: Vec<LayerDefinition>,
    multi: &MultiProgress,
) -> Result<(), CliError> {
    let settings = Settings::from_env().with_overrides(args.overrides);
    let selected = select_layers(layers, &args.layers)?;
    let point = Point::new(args.lat, args.lon);
    let radius = args.radius;

    log::info!(
        "Resolving ({}, {}) within {radius} mi against {} layers",
        point.lat,
        point.lon,
        selected.len()
    );

    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout())
        .build()?;
    let options = settings.resolver_options();
    let retry = settings.retry_policy();

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling in-flight queries");
                cancel.cancel();
            }
        }
    });

    let tasks = selected.into_iter().map(|layer| {
        let client = ArcGisClient::from_client(http.clone(), &layer.url, &layer.id)
            .with_retry(retry);
        let progress = IndicatifProgress::records_spinner(multi, &layer.id);
        let cancel = cancel.clone();

        async move {
            let result = ContainmentProximityResolver::new(&client, &layer)
                .with_options(options)
                .with_cancellation(cancel)
                .with_progress(Arc::clone(&progress))
                .resolve_at(point, radius)
                .await;

            progress.finish(match &result {
                Ok(resolution) if resolution.all_failed() => "failed".to_string(),
                Ok(resolution) => format!("{} features", resolution.features.len()),
                Err(_) => "invalid query".to_string(),
            });

            (layer, result)
        }
    });

    let outcomes = join_all(tasks).await;
    interrupt.abort();

    let mut results: Vec<(LayerDefinition, Resolution)> = Vec::with_capacity(outcomes.len());
    for (layer, result) in outcomes {
        results.push((layer, result?));
    }

    if cancel.is_cancelled() {
        log::warn!("Results are partial: queries were cancelled");
    }
    let failed = results.iter().filter(|(_, r)| r.all_failed()).count();
    if failed > 0 {
        log::warn!("{failed} of {} layers returned no usable data", results.len());
    }

    println!("{}", output::render(args.format, &results)?);

    Ok(())
}
