//! orch-control-plane entry point.
//!
//! Thin on purpose: load config, connect and migrate the pool, build shared
//! state, wire middleware, and serve. All route handlers live in
//! `routes.rs`; all shared state lives in `state.rs`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use orch_config::{bootstrap_dotenv, ControlPlaneConfig};
use orch_control_plane::{routes, state::AppState};
use orch_queue::InMemoryQueue;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap_dotenv();
    init_tracing();

    let config = ControlPlaneConfig::from_env().context("loading control-plane config")?;
    let pool = orch_store::connect_and_migrate_from_env()
        .await
        .context("connecting to Postgres")?;

    // The production queue transport is pluggable behind `orch_queue::Queue`;
    // this binary wires the in-process queue so it runs standalone. A real
    // deployment swaps this for an adapter over the actual transport without
    // touching `routes.rs`.
    let queue: Arc<dyn orch_queue::Queue> = Arc::new(InMemoryQueue::new());

    let state = AppState::new(pool, queue, config.bearer_secret);
    let app = routes::build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    ).layer(CorsLayer::permissive());

    let addr: SocketAddr = config
        .bind_addr
        .as_deref()
        .unwrap_or("127.0.0.1:8081")
        .parse()
        .context("invalid ORCH_CONTROL_PLANE_ADDR")?;
    info!("orch-control-plane listening on http://{addr}");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
