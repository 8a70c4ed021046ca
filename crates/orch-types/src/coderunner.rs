use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run::PrMode;

/// `repo:{id,owner,name,baseBranch,configPath}` slice of `CoderunnerTaskInput` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoderunnerRepoRef {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub base_branch: String,
    pub config_path: Option<String>,
}

/// Carries the prior `externalRef` (and parsed metadata) when a phase is
/// being resumed rather than submitted fresh. When present, the adapter MUST
/// poll rather than call `submitJob` again (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeHandle {
    pub external_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoderunnerTaskInput {
    pub run_id: Uuid,
    pub issue_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    pub requestor: String,
    pub pr_mode: PrMode,
    pub repo: CoderunnerRepoRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeHandle>,
}

/// Terminal outcomes an adapter (mock or external) may report. Non-terminal
/// progress is represented by the *absence* of an outcome — see
/// [`StationExecutionResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationOutcome {
    Succeeded,
    Failed,
    Canceled,
    Timeout,
}

impl StationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StationOutcome::Succeeded)
    }
}

/// Tagged union distinguishing non-terminal (`outcome: null`) from terminal
/// station responses by a single discriminant, per spec §9's guidance to
/// encode this as a sum type rather than an optional-field struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationExecutionResponse {
    NonTerminal {
        summary: String,
        external_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    Terminal {
        outcome: StationOutcome,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        external_ref: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        logs_inline: Option<String>,
    },
}

impl StationExecutionResponse {
    pub fn summary(&self) -> &str {
        match self {
            StationExecutionResponse::NonTerminal { summary, .. } => summary,
            StationExecutionResponse::Terminal { summary, .. } => summary,
        }
    }

    pub fn external_ref(&self) -> Option<&str> {
        match self {
            StationExecutionResponse::NonTerminal { external_ref, .. } => Some(external_ref.as_str()),
            StationExecutionResponse::Terminal { external_ref, .. } => external_ref.as_deref(),
        }
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        match self {
            StationExecutionResponse::NonTerminal { metadata, .. } => metadata.as_ref(),
            StationExecutionResponse::Terminal { metadata, .. } => metadata.as_ref(),
        }
    }
}

/// Error category classifying adapter failures (spec §6). Drives the
/// `retryable` flag propagated up to the engine's exception handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Config,
    Auth,
    TransportRetryable,
    Provider,
}

impl ErrorCategory {
    /// Only `TransportRetryable` is retryable; config/auth/provider failures
    /// are terminal station failures (spec §7 error taxonomy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::TransportRetryable)
    }
}

#[derive(Debug, Clone)]
pub struct CoderunnerError {
    pub category: ErrorCategory,
    pub message: String,
}

impl CoderunnerError {
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

impl std::fmt::Display for CoderunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "coderunner error [{:?}]: {}", self.category, self.message)
    }
}

impl std::error::Error for CoderunnerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_terminal_response_round_trips_without_outcome() {
        let resp = StationExecutionResponse::NonTerminal {
            summary: "waiting on job".into(),
            external_ref: "job-1".into(),
            metadata: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("outcome").is_none());
        assert_eq!(resp.external_ref(), Some("job-1"));
    }

    #[test]
    fn only_transport_retryable_is_retryable() {
        assert!(ErrorCategory::TransportRetryable.is_retryable());
        assert!(!ErrorCategory::Config.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Provider.is_retryable());
    }
}
