//! Coderunner Adapter: the polymorphic boundary between the execution engine
//! and the opaque external code-running executor.

pub mod adapter;
pub mod external;
pub mod mock;
pub mod transport;

pub use adapter::CoderunnerAdapter;
pub use external::ExternalCoderunnerAdapter;
pub use mock::MockCoderunnerAdapter;
pub use transport::{JobHandle, JobResult, JobStatus, SubmitJobRequest};
