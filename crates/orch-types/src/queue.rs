use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run::PrMode;

/// Wire shape published by the Control Plane and consumed by the Execution
/// Engine (spec §6). Validation is exact: any missing or mistyped field means
/// the message is acked and dropped, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunQueueMessage {
    pub run_id: Uuid,
    pub repo_id: Uuid,
    pub issue_number: i64,
    pub requested_at: DateTime<Utc>,
    pub pr_mode: PrMode,
    pub requestor: String,
}

/// Outcome a consumer reports back to the queue transport for a single
/// delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Ack,
    Retry,
}
