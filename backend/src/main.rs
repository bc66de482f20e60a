// main.rs

use std::sync::Arc;

use axum::Router;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::info;

use helmstation_backend::aggregate::AggregateConfig;
use helmstation_backend::config::Config;
use helmstation_backend::scene::probe_scene_assets;
use helmstation_backend::state::AppState;
use helmstation_backend::update_task::update_task;
use helmstation_backend::{simulator, source, web};
use helmstation_shared::DashboardSnapshot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = Config::from_env();
    let scene = probe_scene_assets(&cfg.assets_dir).await;

    // --- Channels ---
    let (feed_tx, feed_rx) = mpsc::channel(256);
    let (events_tx, _) = broadcast::channel(512);
    let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());

    let start = Instant::now();

    // --- Background tasks ---
    let agg_cfg = AggregateConfig {
        history_cap: cfg.history_cap,
        track_cap: cfg.track_cap,
        offline_timeout_ms: cfg.offline_timeout.as_millis() as u64,
        status_display_ms: cfg.status_display.as_millis() as u64,
    };
    let _ut = tokio::spawn(update_task(
        start,
        agg_cfg,
        feed_rx,
        snapshot_tx,
        events_tx.clone(),
    ));

    if cfg.simulate {
        let _sim = tokio::spawn(simulator::simulator_task(feed_tx));
    } else {
        let _feed = tokio::spawn(source::feed_task(cfg.feed_url.clone(), feed_tx));
    }

    // --- Shared state ---
    let state = Arc::new(AppState {
        snapshot_rx,
        events_tx,
        scene,
    });

    // --- Webserver ---
    let app: Router = web::router(state, &cfg.assets_dir, &cfg.static_dir);

    info!(addr = %cfg.http_addr, "helmstation dashboard listening");
    let listener = tokio::net::TcpListener::bind(cfg.http_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
