//! The Execution Engine's station-pipeline state machine: queue-message
//! handling, single-writer CAS claiming, the heartbeat ticker, and
//! `executeStation`.

pub mod error;
pub mod heartbeat;
pub mod message;
pub mod station;

pub use error::{RetryableStationExecutionError, StationError, StationTerminalFailureError};
pub use heartbeat::{HeartbeatGuard, HEARTBEAT_PERIOD, STALE_THRESHOLD};
pub use message::handle_message;
pub use station::execute_station;
