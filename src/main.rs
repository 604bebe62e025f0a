//! News digest service: binary entrypoint.
//! Boots the Axum HTTP server, the daily scheduler and the Prometheus endpoint.

use news_digest::{build_orchestrator, create_router, job, metrics::Metrics, AppConfig, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a subscriber unless the runtime already did. `LOG_FORMAT=json` switches to
/// JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_digest=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env()?;
    let metrics = Metrics::init()?;
    let orchestrator = build_orchestrator(&cfg)?;

    let status = orchestrator.status();
    tracing::info!(
        next_run = %status.next_run,
        categories = ?cfg.scheduled_categories,
        "news digest service starting"
    );
    job::spawn_daily_scheduler(orchestrator.clone(), cfg.scheduled_categories.clone());

    let router = create_router(AppState { orchestrator }).merge(metrics.router());
    Ok(router.into())
}
