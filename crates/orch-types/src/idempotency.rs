use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Succeeded,
    Failed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Succeeded => "succeeded",
            ClaimStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ClaimStatus::Pending),
            "succeeded" => Some(ClaimStatus::Succeeded),
            "failed" => Some(ClaimStatus::Failed),
            _ => None,
        }
    }
}

/// Unique on `key`. `request_hash` is a SHA-256 over the canonical submission
/// payload (spec §4.1); grounds the requeue-claim CAS recovery path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyClaim {
    pub key: String,
    pub request_hash: String,
    pub run_id: Uuid,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stale `pending` claims older than this are eligible for requeue-claim
/// recovery consideration (spec §3 lifecycle note, grace window >= 30s).
pub const CLAIM_GRACE_WINDOW_SECONDS: i64 = 30;

/// The run-side marker written when an enqueue attempt fails, consulted by
/// the `create_run` branch logic in spec §4.1 step 1.
pub const QUEUE_PUBLISH_FAILED_REASON: &str = "queue_publish_failed";
