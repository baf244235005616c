use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::middleware as axum_middleware;
use tower_http::trace::TraceLayer;

use schema_studio::{
    config::AppConfig,
    logging::init_tracing,
    middleware::{catch_panic_layer, json_error_middleware},
    routes::router,
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        eprintln!("server failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("failed to load config")?;
    init_tracing(&cfg.logging.rust_log);

    let addr: SocketAddr = format!("{}:{}", cfg.general.host, cfg.general.port)
        .parse()
        .context("invalid host/port")?;
    tracing::info!(
        files_dir = %cfg.storage.files_dir.display(),
        profiles_dir = %cfg.storage.profiles_dir.display(),
        dump_timeout_secs = cfg.dump.timeout_secs,
        "configuration loaded"
    );

    let state = AppState::from_config(cfg);
    let app = router(Arc::clone(&state))
        .layer(axum_middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http());

    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
