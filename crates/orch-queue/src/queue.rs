use async_trait::async_trait;
use orch_types::RunQueueMessage;

use crate::error::EnqueueError;

/// Publish side of the queue abstraction (spec §2/§6): the control plane's
/// only interaction with the queue is `publish`. At-least-once, no ordering
/// guarantee across runs.
#[async_trait]
pub trait Queue: Send + Sync {
    async fn publish(&self, message: RunQueueMessage) -> Result<(), EnqueueError>;
}
