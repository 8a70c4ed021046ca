//! HTTP surface over the queue-consumer station pipeline. The actual state
//! machine (claiming, heartbeats, `executeStation`) lives in `orch-engine`;
//! this crate wires it to a configured Coderunner adapter and a synthetic
//! HTTP delivery endpoint for local and test use.

pub mod adapter_factory;
pub mod routes;
pub mod state;

pub use adapter_factory::build_adapter;
pub use routes::build_router;
pub use state::AppState;
