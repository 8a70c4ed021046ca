//! orch-execution-engine entry point.
//!
//! Thin on purpose: load config, connect and migrate the pool, build the
//! configured Coderunner adapter, wire middleware, and serve.

use std::net::SocketAddr;

use anyhow::Context;
use orch_config::{bootstrap_dotenv, ExecutionEngineConfig};
use orch_execution_engine::{build_adapter, routes, state::AppState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap_dotenv();
    init_tracing();

    let config = ExecutionEngineConfig::from_env().context("loading execution-engine config")?;
    let pool = orch_store::connect_and_migrate_from_env()
        .await
        .context("connecting to Postgres")?;
    let adapter = build_adapter(&config.coderunner).context("building coderunner adapter")?;

    let state = AppState::new(pool, adapter, config.queue_consume_secret);
    let app = routes::build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr: SocketAddr = config
        .bind_addr
        .as_deref()
        .unwrap_or("127.0.0.1:8082")
        .parse()
        .context("invalid ORCH_EXECUTION_ENGINE_ADDR")?;
    info!("orch-execution-engine listening on http://{addr}");

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
