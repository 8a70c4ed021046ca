use async_trait::async_trait;
use chrono::Utc;
use orch_types::{
    run::Station, CoderunnerError, CoderunnerTaskInput, StationExecutionResponse, StationMetadata, StationOutcome,
};

use crate::adapter::CoderunnerAdapter;

const MARKER_TIMEOUT: &str = "[mock-timeout]";
const MARKER_CANCELED: &str = "[mock-canceled]";
const MARKER_FAIL: &str = "[mock-fail]";
const MARKER_VERIFY_FAIL: &str = "[verify-fail]";

/// Deterministic synchronous adapter for `mock` mode. Goal markers pick the
/// outcome; everything else succeeds. Always terminal — mock never returns
/// a non-terminal handle.
#[derive(Debug, Clone, Default)]
pub struct MockCoderunnerAdapter;

impl MockCoderunnerAdapter {
    pub fn new() -> Self {
        Self
    }

    fn outcome_for(goal: Option<&str>, station: Station) -> StationOutcome {
        let goal = goal.unwrap_or("");
        if goal.contains(MARKER_TIMEOUT) {
            StationOutcome::Timeout
        } else if goal.contains(MARKER_CANCELED) {
            StationOutcome::Canceled
        } else if goal.contains(MARKER_FAIL) {
            StationOutcome::Failed
        } else if goal.contains(MARKER_VERIFY_FAIL) && station == Station::Verify {
            StationOutcome::Failed
        } else {
            StationOutcome::Succeeded
        }
    }

    async fn run(&self, input: CoderunnerTaskInput, station: Station) -> Result<StationExecutionResponse, CoderunnerError> {
        let outcome = Self::outcome_for(input.goal.as_deref(), station);
        let attempt = StationMetadata::next_attempt(None);
        let metadata = serde_json::to_value(StationMetadata {
            phase: station,
            mode: "mock".to_string(),
            attempt,
            provider_status: Some(format!("{outcome:?}").to_lowercase()),
            updated_at: Some(Utc::now()),
        })
        .ok();

        let summary = format!(
            "mock {} task for run {} (issue #{}) => {:?}",
            station.as_str(),
            input.run_id,
            input.issue_number,
            outcome
        );

        Ok(StationExecutionResponse::Terminal {
            outcome,
            summary,
            external_ref: None,
            metadata,
            logs_inline: Some(format!("mock adapter executed {} deterministically", station.as_str())),
        })
    }
}

#[async_trait]
impl CoderunnerAdapter for MockCoderunnerAdapter {
    async fn run_implement_task(&self, input: CoderunnerTaskInput) -> Result<StationExecutionResponse, CoderunnerError> {
        self.run(input, Station::Implement).await
    }

    async fn run_verify_task(&self, input: CoderunnerTaskInput) -> Result<StationExecutionResponse, CoderunnerError> {
        self.run(input, Station::Verify).await
    }
}
