use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    IntakeSummary,
    PlanSummary,
    CreatePrSummary,
    ImplementSummary,
    VerifySummary,
    ImplementRunnerLogsExcerpt,
    VerifyRunnerLogsExcerpt,
    WorkflowSummary,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::IntakeSummary => "intake_summary",
            ArtifactType::PlanSummary => "plan_summary",
            ArtifactType::CreatePrSummary => "create_pr_summary",
            ArtifactType::ImplementSummary => "implement_summary",
            ArtifactType::VerifySummary => "verify_summary",
            ArtifactType::ImplementRunnerLogsExcerpt => "implement_runner_logs_excerpt",
            ArtifactType::VerifyRunnerLogsExcerpt => "verify_runner_logs_excerpt",
            ArtifactType::WorkflowSummary => "workflow_summary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "intake_summary" => Some(ArtifactType::IntakeSummary),
            "plan_summary" => Some(ArtifactType::PlanSummary),
            "create_pr_summary" => Some(ArtifactType::CreatePrSummary),
            "implement_summary" => Some(ArtifactType::ImplementSummary),
            "verify_summary" => Some(ArtifactType::VerifySummary),
            "implement_runner_logs_excerpt" => Some(ArtifactType::ImplementRunnerLogsExcerpt),
            "verify_runner_logs_excerpt" => Some(ArtifactType::VerifyRunnerLogsExcerpt),
            "workflow_summary" => Some(ArtifactType::WorkflowSummary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStorage {
    Inline,
    External,
}

/// Upsert-on-conflict by deterministic id; later writes supersede earlier
/// payloads. Callers must never rely on artifact immutability (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub run_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ArtifactType,
    pub storage: ArtifactStorage,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
