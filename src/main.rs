//! GTFS alerts enricher: binary entrypoint.
//! Boots the Axum HTTP server with the shared cache and upstream source.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gtfs_alerts_enricher::config::EnricherConfig;
use gtfs_alerts_enricher::metrics::Metrics;
use gtfs_alerts_enricher::{router, AppState};

/// Compact local logs, enabled with ENRICHER_DEV_LOG=1 in a dev environment
/// (debug build OR SHUTTLE_ENV in {local, development, dev}).
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ENRICHER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pipeline=info,cache=debug,upstream=info,api=info,warn"));

    // The runtime may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = EnricherConfig::load_default().context("loading enricher config")?;
    tracing::info!(
        alerts_url = %cfg.alerts_url,
        metadata_url = %cfg.metadata_url,
        api_key_set = cfg.api_key.is_some(),
        ttl_secs = cfg.cache_ttl_secs,
        "enricher config loaded"
    );

    let metrics = Metrics::init(cfg.cache_ttl())?;
    let state = AppState::from_config(&cfg).context("building upstream client")?;
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}
