use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and describe the digest metrics.
    pub fn init() -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
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

fn describe() {
    describe_counter!(
        "digest_fetch_errors_total",
        "Feed fetches that failed (transport, status or parse)"
    );
    describe_histogram!(
        "digest_fetch_ms",
        Unit::Milliseconds,
        "Wall time of one feed fetch"
    );
    describe_counter!(
        "digest_items_scraped_total",
        "Items surviving the fetch filters, per category"
    );
    describe_counter!(
        "digest_ranking_tokens_total",
        "Tokens reported by the ranking provider"
    );
    describe_counter!("digest_ranking_errors_total", "Failed ranking calls");
    describe_counter!("digest_runs_total", "Completed digest runs by outcome");
}
