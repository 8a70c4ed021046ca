use async_trait::async_trait;
use orch_types::{CoderunnerError, CoderunnerTaskInput, StationExecutionResponse};

/// The engine depends only on these two methods plus the retryable
/// classification carried on [`CoderunnerError`]. Injecting an adapter
/// instance is the preferred test seam.
#[async_trait]
pub trait CoderunnerAdapter: Send + Sync {
    async fn run_implement_task(
        &self,
        input: CoderunnerTaskInput,
    ) -> Result<StationExecutionResponse, CoderunnerError>;

    async fn run_verify_task(
        &self,
        input: CoderunnerTaskInput,
    ) -> Result<StationExecutionResponse, CoderunnerError>;
}
