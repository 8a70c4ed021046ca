use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run::Station;

/// Allowed transitions: `Pending -> {Running, Skipped}`; `Running -> {Succeeded, Failed, Skipped}`.
/// Terminal set is `{Succeeded, Failed, Skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationStatus::Pending => "pending",
            StationStatus::Running => "running",
            StationStatus::Succeeded => "succeeded",
            StationStatus::Failed => "failed",
            StationStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StationStatus::Pending),
            "running" => Some(StationStatus::Running),
            "succeeded" => Some(StationStatus::Succeeded),
            "failed" => Some(StationStatus::Failed),
            "skipped" => Some(StationStatus::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StationStatus::Succeeded | StationStatus::Failed | StationStatus::Skipped
        )
    }

    /// Counts as "cleared" for station-ordering purposes (spec §3: a station
    /// of index `i` may run once all stations `< i` are succeeded or skipped).
    pub fn clears_ordering(&self) -> bool {
        matches!(self, StationStatus::Succeeded | StationStatus::Skipped)
    }
}

/// `{phase, mode, attempt>=1, providerStatus?, updatedAt?}`, validated on read (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationMetadata {
    pub phase: Station,
    pub mode: String,
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StationMetadata {
    /// `attempt = (resumeMetadata.attempt ?? 0) + 1`, floored at 1 (spec §4.4).
    pub fn next_attempt(prior: Option<&StationMetadata>) -> u32 {
        prior.map(|m| m.attempt).unwrap_or(0).saturating_add(1).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationExecution {
    pub id: String,
    pub run_id: Uuid,
    pub station: Station,
    pub status: StationStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub summary: Option<String>,
    pub external_ref: Option<String>,
    pub metadata_json: Option<serde_json::Value>,
    /// Supplemental attempt counter mirrored from `metadata_json.attempt`,
    /// surfaced as its own column for cheap filtering/ordering on reads.
    pub attempt: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_clears_on_succeeded_or_skipped() {
        assert!(StationStatus::Succeeded.clears_ordering());
        assert!(StationStatus::Skipped.clears_ordering());
        assert!(!StationStatus::Failed.clears_ordering());
        assert!(!StationStatus::Running.clears_ordering());
    }

    #[test]
    fn attempt_counter_floors_at_one() {
        assert_eq!(StationMetadata::next_attempt(None), 1);
        let prior = StationMetadata {
            phase: Station::Implement,
            mode: "mock".into(),
            attempt: 3,
            provider_status: None,
            updated_at: None,
        };
        assert_eq!(StationMetadata::next_attempt(Some(&prior)), 4);
    }
}
