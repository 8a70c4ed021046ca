//! Queue abstraction: at-least-once, ack/retry delivery (spec §2/§6). Ships
//! an in-process implementation used by the execution engine's local
//! `/__queue/consume` test harness; a production deployment plugs in an
//! external transport behind the same [`Queue`] trait.

pub mod error;
pub mod in_memory;
pub mod queue;

pub use error::EnqueueError;
pub use in_memory::{FailingQueue, InMemoryQueue};
pub use queue::Queue;
