//! Shared runtime state for the execution-engine HTTP service.

use std::sync::Arc;

use orch_coderunner::CoderunnerAdapter;
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub adapter: Arc<dyn CoderunnerAdapter>,
    pub bearer_secret: Arc<str>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool, adapter: Arc<dyn CoderunnerAdapter>, bearer_secret: impl Into<String>) -> Self {
        Self {
            pool,
            adapter,
            bearer_secret: Arc::from(bearer_secret.into()),
            build: BuildInfo {
                service: "orch-execution-engine",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
