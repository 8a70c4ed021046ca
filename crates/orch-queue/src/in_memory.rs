use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use orch_types::{DeliveryOutcome, RunQueueMessage};
use tokio::sync::Mutex;

use crate::error::EnqueueError;
use crate::queue::Queue;

/// In-process queue standing in for the external transport (spec §2: "A
/// synthetic HTTP 'inject message' endpoint ... exists for local
/// single-process testing"). Redelivery on `Retry` is modeled by pushing the
/// message back onto the tail of the queue, matching at-least-once, no
/// cross-run ordering semantics.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<Mutex<VecDeque<RunQueueMessage>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the next message, if any, for a consumer loop to process.
    pub async fn pop(&self) -> Option<RunQueueMessage> {
        self.inner.lock().await.pop_front()
    }

    /// Requeue a message after a `Retry` outcome (pushed to the tail, so
    /// other queued runs are served first).
    pub async fn requeue(&self, message: RunQueueMessage) {
        self.inner.lock().await.push_back(message);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drain every pending message through `handler`, requeuing on
    /// [`DeliveryOutcome::Retry`] until the queue is empty or `max_rounds` is
    /// hit (a safety bound against infinite-retry loops in tests).
    pub async fn drain_until_empty<F, Fut>(&self, max_rounds: usize, mut handler: F)
    where
        F: FnMut(RunQueueMessage) -> Fut,
        Fut: std::future::Future<Output = DeliveryOutcome>,
    {
        let mut rounds = 0;
        while let Some(message) = self.pop().await {
            rounds += 1;
            if rounds > max_rounds {
                self.requeue(message).await;
                break;
            }
            let outcome = handler(message.clone()).await;
            if outcome == DeliveryOutcome::Retry {
                self.requeue(message).await;
            }
        }
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn publish(&self, message: RunQueueMessage) -> Result<(), EnqueueError> {
        self.inner.lock().await.push_back(message);
        Ok(())
    }
}

/// Test double that always fails to publish, for exercising the
/// enqueue-failed-then-retry scenario (spec §8 scenario 4).
#[derive(Clone, Default)]
pub struct FailingQueue;

#[async_trait]
impl Queue for FailingQueue {
    async fn publish(&self, _message: RunQueueMessage) -> Result<(), EnqueueError> {
        Err(EnqueueError::new("simulated transport failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orch_types::PrMode;
    use uuid::Uuid;

    fn sample_message() -> RunQueueMessage {
        RunQueueMessage {
            run_id: Uuid::new_v4(),
            repo_id: Uuid::new_v4(),
            issue_number: 7,
            requested_at: Utc::now(),
            pr_mode: PrMode::Draft,
            requestor: "u".into(),
        }
    }

    #[tokio::test]
    async fn publish_then_pop_round_trips() {
        let q = InMemoryQueue::new();
        let msg = sample_message();
        q.publish(msg.clone()).await.unwrap();
        let popped = q.pop().await.unwrap();
        assert_eq!(popped.run_id, msg.run_id);
        assert!(q.is_empty().await);
    }

    #[tokio::test]
    async fn retry_requeues_to_tail() {
        let q = InMemoryQueue::new();
        let first = sample_message();
        let second = sample_message();
        q.publish(first.clone()).await.unwrap();
        q.publish(second.clone()).await.unwrap();

        let popped = q.pop().await.unwrap();
        assert_eq!(popped.run_id, first.run_id);
        q.requeue(popped).await;

        let next = q.pop().await.unwrap();
        assert_eq!(next.run_id, second.run_id);
    }

    #[tokio::test]
    async fn failing_queue_reports_enqueue_error() {
        let q = FailingQueue;
        let err = q.publish(sample_message()).await.unwrap_err();
        assert!(err.message.contains("simulated"));
    }
}
