//! Shared runtime state for the control-plane HTTP service.

use std::sync::Arc;

use orch_queue::Queue;
use sqlx::PgPool;

/// Static build metadata included in health responses (spec §0, grounded in
/// `mqk_daemon::state::BuildInfo`).
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (`Arc`-backed) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub queue: Arc<dyn Queue>,
    pub bearer_secret: Arc<str>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool, queue: Arc<dyn Queue>, bearer_secret: impl Into<String>) -> Self {
        Self {
            pool,
            queue,
            bearer_secret: Arc::from(bearer_secret.into()),
            build: BuildInfo {
                service: "orch-control-plane",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
