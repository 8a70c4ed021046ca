//! HTTP control-plane service: repo registration, run submission (with the
//! idempotency protocol), and read-side projections over runs, stations, and
//! artifacts. Does not touch the queue consumer side or run stations itself
//! — that's `orch-execution-engine` and `orch-engine`.

pub mod api_types;
pub mod idempotency;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
