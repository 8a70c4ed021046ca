use serde::{Deserialize, Serialize};

/// Status reported by the external job transport. Terminal states are
/// `{Succeeded, Failed, Canceled, Timeout}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Timeout,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled | JobStatus::Timeout
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub external_ref: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    pub summary: String,
    #[serde(default)]
    pub logs: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest<'a> {
    pub run_id: String,
    pub phase: &'a str,
    pub issue_number: i64,
    pub goal: Option<&'a str>,
    pub requestor: &'a str,
    pub pr_mode: &'a str,
    pub repo_owner: &'a str,
    pub repo_name: &'a str,
    pub base_branch: &'a str,
}
