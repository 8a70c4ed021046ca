//! Wire DTOs for the HTTP API. Internal entities stay snake_case for storage
//! and CAS-predicate clarity; everything crossing the HTTP boundary is
//! camelCase, so the two are kept as separate types rather than tagging the
//! domain structs directly.

use chrono::{DateTime, Utc};
use orch_types::{Artifact, Repo, Run, StationExecution};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRepoRequest {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub config_path: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoView {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub config_path: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Repo> for RepoView {
    fn from(r: Repo) -> Self {
        Self {
            id: r.id,
            owner: r.owner,
            name: r.name,
            default_branch: r.default_branch,
            config_path: r.config_path,
            enabled: r.enabled,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterRepoResponse {
    pub repo: RepoView,
}

#[derive(Debug, Serialize)]
pub struct ListReposResponse {
    pub repos: Vec<RepoView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequestBody {
    pub repo: RepoRef,
    pub issue: IssueRef,
    pub requestor: String,
    #[serde(default)]
    pub pr_mode: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct IssueRef {
    pub number: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRepoSummary {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub id: Uuid,
    pub repo: RunRepoSummary,
    pub issue_number: i64,
    pub goal: Option<String>,
    pub status: String,
    pub current_station: Option<String>,
    pub requestor: String,
    pub base_branch: String,
    pub work_branch: Option<String>,
    pub pr_mode: String,
    pub pr_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl RunView {
    pub fn new(run: Run, repo: &Repo) -> Self {
        Self {
            id: run.id,
            repo: RunRepoSummary {
                id: repo.id,
                owner: repo.owner.clone(),
                name: repo.name.clone(),
            },
            issue_number: run.issue_number,
            goal: run.goal,
            status: run.status.as_str().to_string(),
            current_station: run.current_station.map(|s| s.as_str().to_string()),
            requestor: run.requestor,
            base_branch: run.base_branch,
            work_branch: run.work_branch,
            pr_mode: run.pr_mode.as_str().to_string(),
            pr_url: run.pr_url,
            created_at: run.created_at,
            started_at: run.started_at,
            heartbeat_at: run.heartbeat_at,
            finished_at: run.finished_at,
            failure_reason: run.failure_reason,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationExecutionView {
    pub id: String,
    pub run_id: Uuid,
    pub station: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub summary: Option<String>,
    pub external_ref: Option<String>,
    pub metadata: Option<Value>,
    pub attempt: i32,
}

impl From<StationExecution> for StationExecutionView {
    fn from(e: StationExecution) -> Self {
        Self {
            id: e.id,
            run_id: e.run_id,
            station: e.station.as_str().to_string(),
            status: e.status.as_str().to_string(),
            started_at: e.started_at,
            finished_at: e.finished_at,
            duration_ms: e.duration_ms,
            summary: e.summary,
            external_ref: e.external_ref,
            metadata: e.metadata_json,
            attempt: e.attempt,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactView {
    pub id: String,
    pub run_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub storage: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl From<Artifact> for ArtifactView {
    fn from(a: Artifact) -> Self {
        Self {
            id: a.id,
            run_id: a.run_id,
            kind: a.kind.as_str().to_string(),
            storage: match a.storage {
                orch_types::ArtifactStorage::Inline => "inline".to_string(),
                orch_types::ArtifactStorage::External => "external".to_string(),
            },
            payload: a.payload,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyView {
    pub key: String,
    pub status: String,
    pub replayed: bool,
    pub requeued: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run: RunView,
    pub idempotency: IdempotencyView,
}

#[derive(Debug, Serialize)]
pub struct GetRunResponse {
    pub run: RunView,
    pub stations: Vec<StationExecutionView>,
    pub artifacts: Vec<ArtifactView>,
}

#[derive(Debug, Serialize)]
pub struct ListRunsResponse {
    pub runs: Vec<RunView>,
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub status: Option<String>,
    pub repo: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub queued: i64,
    pub running: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub canceled: i64,
}
