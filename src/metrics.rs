use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the cache TTL as a static gauge.
    pub fn init(ttl: Duration) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        describe_counter!("alerts_cache_hits_total", "Requests served from the cache.");
        describe_counter!(
            "alerts_cache_misses_total",
            "Requests that started or joined a refresh."
        );
        describe_counter!("alerts_refresh_errors_total", "Failed feed refreshes.");
        describe_counter!("alerts_enriched_total", "Alerts run through enrichment.");
        describe_counter!(
            "alerts_matched_total",
            "Alerts matched to a metadata record."
        );
        describe_counter!("upstream_errors_total", "Upstream fetches that gave up.");
        describe_histogram!("alerts_pipeline_ms", "Decode + enrich + partition time.");
        describe_gauge!(
            "alerts_last_refresh_ts",
            "Unix ts of the last successful refresh."
        );

        gauge!("alerts_cache_ttl_ms").set(ttl.as_millis() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
