use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use orch_types::{
    run::Station, CoderunnerError, CoderunnerTaskInput, ErrorCategory, StationExecutionResponse, StationMetadata,
    StationOutcome,
};
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::adapter::CoderunnerAdapter;
use crate::transport::{JobHandle, JobResult, JobStatus, SubmitJobRequest};

/// Three-operation HTTP transport over the opaque external executor (spec
/// §4.4/§6). Resume policy: if `input.resume` is present, only `getJobStatus`
/// (and, once terminal, `getJobResult`) is called — `submitJob` is never
/// invoked on resume.
pub struct ExternalCoderunnerAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExternalCoderunnerAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, CoderunnerError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| CoderunnerError {
            category: ErrorCategory::Config,
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn submit_job(&self, req: &SubmitJobRequest<'_>) -> Result<JobHandle, CoderunnerError> {
        let url = format!("{}/jobs", self.base_url);
        let resp = self
            .auth(self.client.post(&url).json(req))
            .send()
            .await
            .map_err(classify_transport_error)?;
        parse_or_classify(resp).await
    }

    async fn get_job_status(&self, external_ref: &str) -> Result<JobHandle, CoderunnerError> {
        let url = format!("{}/jobs/{}/status", self.base_url, external_ref);
        let resp = self
            .auth(self.client.get(&url))
            .send()
            .await
            .map_err(classify_transport_error)?;
        parse_or_classify(resp).await
    }

    async fn get_job_result(&self, external_ref: &str) -> Result<JobResult, CoderunnerError> {
        let url = format!("{}/jobs/{}/result", self.base_url, external_ref);
        let resp = self
            .auth(self.client.get(&url))
            .send()
            .await
            .map_err(classify_transport_error)?;
        parse_or_classify(resp).await
    }

    async fn run(
        &self,
        input: CoderunnerTaskInput,
        station: Station,
    ) -> Result<StationExecutionResponse, CoderunnerError> {
        if let Some(resume) = &input.resume {
            let prior_metadata: Option<StationMetadata> = resume
                .metadata
                .as_ref()
                .and_then(|v| serde_json::from_value(v.clone()).ok());
            let handle = self.get_job_status(&resume.external_ref).await?;
            if !handle.status.is_terminal() {
                return Ok(non_terminal_response(station, &resume.external_ref, handle.status, prior_metadata.as_ref()));
            }
            let result = self.get_job_result(&resume.external_ref).await?;
            return Ok(terminal_response(station, Some(resume.external_ref.clone()), result, prior_metadata.as_ref()));
        }

        let submit_req = SubmitJobRequest {
            run_id: input.run_id.to_string(),
            phase: station.as_str(),
            issue_number: input.issue_number,
            goal: input.goal.as_deref(),
            requestor: &input.requestor,
            pr_mode: input.pr_mode.as_str(),
            repo_owner: &input.repo.owner,
            repo_name: &input.repo.name,
            base_branch: &input.repo.base_branch,
        };
        let handle = self.submit_job(&submit_req).await?;

        if !handle.status.is_terminal() {
            return Ok(non_terminal_response(station, &handle.external_ref, handle.status, None));
        }

        let result = self.get_job_result(&handle.external_ref).await?;
        Ok(terminal_response(station, Some(handle.external_ref), result, None))
    }
}

fn non_terminal_response(
    station: Station,
    external_ref: &str,
    status: JobStatus,
    prior: Option<&StationMetadata>,
) -> StationExecutionResponse {
    let metadata = build_metadata(station, prior, Some(format!("{status:?}").to_lowercase()));
    StationExecutionResponse::NonTerminal {
        summary: format!("{} job {} is {:?}", station.as_str(), external_ref, status),
        external_ref: external_ref.to_string(),
        metadata: serde_json::to_value(metadata).ok(),
    }
}

fn terminal_response(
    station: Station,
    external_ref: Option<String>,
    result: JobResult,
    prior: Option<&StationMetadata>,
) -> StationExecutionResponse {
    let outcome = match result.status {
        JobStatus::Succeeded => StationOutcome::Succeeded,
        JobStatus::Failed => StationOutcome::Failed,
        JobStatus::Canceled => StationOutcome::Canceled,
        JobStatus::Timeout => StationOutcome::Timeout,
        non_terminal => {
            warn!(?non_terminal, "getJobResult returned a non-terminal status; treating as failed");
            StationOutcome::Failed
        }
    };
    let metadata = build_metadata(station, prior, Some(format!("{:?}", result.status).to_lowercase()));

    StationExecutionResponse::Terminal {
        outcome,
        summary: result.summary,
        external_ref,
        metadata: serde_json::to_value(metadata).ok(),
        logs_inline: result.logs,
    }
}

fn build_metadata(station: Station, prior: Option<&StationMetadata>, provider_status: Option<String>) -> StationMetadata {
    StationMetadata {
        phase: station,
        mode: "external".to_string(),
        attempt: StationMetadata::next_attempt(prior),
        provider_status,
        updated_at: Some(Utc::now()),
    }
}

async fn parse_or_classify<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, CoderunnerError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(|e| CoderunnerError {
            category: ErrorCategory::Provider,
            message: format!("failed to parse coderunner response body: {e}"),
        });
    }
    Err(CoderunnerError {
        category: classify_status(status),
        message: format!("coderunner transport returned {status}"),
    })
}

/// Maps HTTP-style failures to three categories: auth/config (non-retryable),
/// retryable transport (408, 429, >=500), provider (other 4xx).
fn classify_status(status: StatusCode) -> ErrorCategory {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ErrorCategory::Auth
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ErrorCategory::TransportRetryable
    } else {
        ErrorCategory::Provider
    }
}

fn classify_transport_error(err: reqwest::Error) -> CoderunnerError {
    let category = if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorCategory::TransportRetryable
    } else if let Some(status) = err.status() {
        classify_status(status)
    } else {
        ErrorCategory::TransportRetryable
    };
    CoderunnerError {
        category,
        message: err.to_string(),
    }
}

#[async_trait]
impl CoderunnerAdapter for ExternalCoderunnerAdapter {
    async fn run_implement_task(&self, input: CoderunnerTaskInput) -> Result<StationExecutionResponse, CoderunnerError> {
        self.run(input, Station::Implement).await
    }

    async fn run_verify_task(&self, input: CoderunnerTaskInput) -> Result<StationExecutionResponse, CoderunnerError> {
        self.run(input, Station::Verify).await
    }
}
