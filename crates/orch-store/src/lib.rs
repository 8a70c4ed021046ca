//! Postgres-backed store for the orchestrator. Every state transition is
//! written as a CAS (compare-and-set) statement with an explicit predicate on
//! observed state; no table-level locking is assumed (spec §5).

pub mod artifact;
pub mod error;
pub mod idempotency;
pub mod pool;
pub mod repo;
pub mod run;
pub mod station;

pub use error::{StoreError, StoreResult};
pub use pool::{connect, connect_and_migrate_from_env, connect_from_env, migrate, ENV_DB_URL};

#[cfg(test)]
mod tests {
    use super::*;

    /// Exercised only when `ORCH_DATABASE_URL` points at a real Postgres
    /// instance; skipped otherwise since this crate carries no embedded DB.
    #[tokio::test]
    async fn connect_from_env_reports_missing_var() {
        std::env::remove_var(ENV_DB_URL);
        let result = connect_from_env().await;
        assert!(result.is_err());
    }
}
