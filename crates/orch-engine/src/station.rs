use chrono::Utc;
use orch_coderunner::CoderunnerAdapter;
use orch_types::{
    excerpt_logs, run::Station, ArtifactStorage, ArtifactType, CoderunnerRepoRef, CoderunnerTaskInput, ResumeHandle,
    Run, StationExecution, StationExecutionResponse, StationStatus,
};
use orch_types::Repo;
use sqlx::PgPool;

use crate::error::StationError;
use crate::heartbeat;

/// Drives a single station of a single run through to a terminal or
/// retryable outcome. A `succeeded` station is a no-op; every other exit
/// path upserts the running row, runs the station body, persists the
/// response, and writes the station's artifacts.
pub async fn execute_station(
    pool: &PgPool,
    adapter: &dyn CoderunnerAdapter,
    run: &Run,
    repo: &Repo,
    station: Station,
) -> Result<(), StationError> {
    let existing = orch_store::station::get_station_execution(pool, run.id, station)
        .await
        .map_err(|e| StationError::terminal(station, format!("station lookup failed: {e}")))?;

    if let Some(ex) = &existing {
        if ex.status == StationStatus::Succeeded {
            tracing::info!(run_id = %run.id, station = station.as_str(), "station.skip.already_succeeded");
            return Ok(());
        }
    }

    let started_at = existing.as_ref().and_then(|e| e.started_at).unwrap_or_else(Utc::now);
    let started_at_ms = started_at.timestamp_millis();

    if let Err(err) = orch_store::run::set_current_station_cas(pool, run.id, station).await {
        tracing::warn!(run_id = %run.id, station = station.as_str(), error = %err, "current_station CAS did not land");
    }

    orch_store::station::upsert_station_running(pool, run.id, station, started_at)
        .await
        .map_err(|e| StationError::terminal(station, format!("failed to upsert station running: {e}")))?;

    let _heartbeat = heartbeat::spawn(pool.clone(), run.id, station);

    let response = run_station_body(adapter, run, repo, station, existing.as_ref()).await?;

    persist_station_response(pool, run, station, &response, started_at_ms).await
}

async fn run_station_body(
    adapter: &dyn CoderunnerAdapter,
    run: &Run,
    repo: &Repo,
    station: Station,
    existing: Option<&StationExecution>,
) -> Result<StationExecutionResponse, StationError> {
    match station {
        Station::Intake => Ok(skeleton_response(format!(
            "Intake captured {}/{}#{}",
            repo.owner, repo.name, run.issue_number
        ))),
        Station::Plan => {
            let summary = match run.goal.as_deref() {
                Some(goal) if !goal.is_empty() => format!("Plan drafted for goal: {goal}"),
                _ => "Plan drafted with no goal supplied; proceeding with default scope".to_string(),
            };
            Ok(skeleton_response(summary))
        }
        Station::CreatePr => Ok(skeleton_response(format!(
            "Pull request placeholder created for {}/{}#{} ({} mode)",
            repo.owner,
            repo.name,
            run.issue_number,
            run.pr_mode.as_str()
        ))),
        Station::Implement | Station::Verify => {
            let input = build_task_input(run, repo, existing);
            let result = match station {
                Station::Implement => adapter.run_implement_task(input).await,
                Station::Verify => adapter.run_verify_task(input).await,
                _ => unreachable!("only implement/verify call the coderunner adapter"),
            };
            result.map_err(|e| StationError::from_coderunner_error(station, e))
        }
    }
}

/// A station that never calls the adapter still reports a terminal,
/// successful `StationExecutionResponse` so it flows through the same
/// persistence path as implement/verify.
fn skeleton_response(summary: String) -> StationExecutionResponse {
    StationExecutionResponse::Terminal {
        outcome: orch_types::StationOutcome::Succeeded,
        summary,
        external_ref: None,
        metadata: None,
        logs_inline: None,
    }
}

/// Carries the prior `externalRef` forward as a resume handle only when the
/// station is still `running` with one set: resume by polling, never by
/// resubmitting.
fn build_task_input(run: &Run, repo: &Repo, existing: Option<&StationExecution>) -> CoderunnerTaskInput {
    let resume = existing.filter(|e| e.status == StationStatus::Running).and_then(|e| {
        e.external_ref.clone().map(|external_ref| ResumeHandle {
            external_ref,
            metadata: e.metadata_json.clone(),
        })
    });

    CoderunnerTaskInput {
        run_id: run.id,
        issue_number: run.issue_number,
        goal: run.goal.clone(),
        requestor: run.requestor.clone(),
        pr_mode: run.pr_mode,
        repo: CoderunnerRepoRef {
            id: repo.id,
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            base_branch: run.base_branch.clone(),
            config_path: repo.config_path.clone(),
        },
        resume,
    }
}

async fn persist_station_response(
    pool: &PgPool,
    run: &Run,
    station: Station,
    response: &StationExecutionResponse,
    started_at_ms: i64,
) -> Result<(), StationError> {
    match response {
        StationExecutionResponse::NonTerminal {
            summary,
            external_ref,
            metadata,
        } => {
            let attempt = metadata
                .as_ref()
                .and_then(|m| m.get("attempt"))
                .and_then(|a| a.as_i64())
                .unwrap_or(1) as i32;

            orch_store::station::persist_non_terminal(pool, run.id, station, summary, external_ref, metadata.clone(), attempt)
                .await
                .map_err(|e| StationError::terminal(station, format!("failed to persist non-terminal station state: {e}")))?;

            write_artifacts(pool, run, station, response).await;

            Err(StationError::retryable(station, summary.clone()))
        }
        StationExecutionResponse::Terminal { outcome, summary, .. } => {
            if outcome.is_success() {
                let changed = orch_store::station::mark_succeeded_cas(pool, run.id, station, summary, started_at_ms)
                    .await
                    .map_err(|e| StationError::terminal(station, format!("failed to mark station succeeded: {e}")))?;
                if !changed {
                    tracing::warn!(run_id = %run.id, station = station.as_str(), "mark_succeeded_cas changed 0 rows");
                }

                write_artifacts(pool, run, station, response).await;
                Ok(())
            } else {
                if let Err(err) = orch_store::station::mark_failed_cas(pool, run.id, station, summary, started_at_ms).await {
                    tracing::warn!(run_id = %run.id, station = station.as_str(), error = %err, "best-effort station-failed CAS did not land");
                }

                write_artifacts(pool, run, station, response).await;
                Err(StationError::terminal(station, summary.clone()))
            }
        }
    }
}

/// Best-effort: an artifact write failure never turns a retryable station
/// into a terminal run failure, or vice versa.
async fn write_artifacts(pool: &PgPool, run: &Run, station: Station, response: &StationExecutionResponse) {
    if station.uses_coderunner() {
        write_coderunner_artifacts(pool, run, station, response).await;
    } else {
        write_skeleton_artifact(pool, run, station, response).await;
    }
}

async fn write_coderunner_artifacts(pool: &PgPool, run: &Run, station: Station, response: &StationExecutionResponse) {
    let kind = match station {
        Station::Implement => ArtifactType::ImplementSummary,
        Station::Verify => ArtifactType::VerifySummary,
        _ => unreachable!("only implement/verify use the coderunner artifact path"),
    };

    let outcome_str = match response {
        StationExecutionResponse::Terminal { outcome, .. } => Some(format!("{outcome:?}").to_lowercase()),
        StationExecutionResponse::NonTerminal { .. } => None,
    };

    let payload = serde_json::json!({
        "station": station.as_str(),
        "outcome": outcome_str,
        "summary": response.summary(),
        "external_ref": response.external_ref(),
        "metadata": response.metadata(),
    });

    if let Err(err) = orch_store::artifact::upsert_artifact(pool, run.id, kind, ArtifactStorage::Inline, payload).await {
        tracing::warn!(run_id = %run.id, station = station.as_str(), error = %err, "{} artifact write failed", kind.as_str());
    }

    if let StationExecutionResponse::Terminal {
        logs_inline: Some(logs), ..
    } = response
    {
        if !logs.is_empty() {
            let excerpt_kind = match station {
                Station::Implement => ArtifactType::ImplementRunnerLogsExcerpt,
                Station::Verify => ArtifactType::VerifyRunnerLogsExcerpt,
                _ => unreachable!(),
            };
            let excerpt = excerpt_logs(logs);
            let logs_payload = serde_json::json!({
                "station": station.as_str(),
                "text": excerpt.text,
                "truncated": excerpt.truncated,
                "original_length": excerpt.original_length,
            });
            if let Err(err) = orch_store::artifact::upsert_artifact(pool, run.id, excerpt_kind, ArtifactStorage::Inline, logs_payload).await
            {
                tracing::warn!(run_id = %run.id, station = station.as_str(), error = %err, "{} artifact write failed", excerpt_kind.as_str());
            }
        }
    }
}

async fn write_skeleton_artifact(pool: &PgPool, run: &Run, station: Station, response: &StationExecutionResponse) {
    let kind = match station {
        Station::Intake => ArtifactType::IntakeSummary,
        Station::Plan => ArtifactType::PlanSummary,
        Station::CreatePr => ArtifactType::CreatePrSummary,
        _ => unreachable!("only skeleton stations use the lightweight artifact path"),
    };

    let payload = serde_json::json!({
        "station": station.as_str(),
        "summary": response.summary(),
    });

    if let Err(err) = orch_store::artifact::upsert_artifact(pool, run.id, kind, ArtifactStorage::Inline, payload).await {
        tracing::warn!(run_id = %run.id, station = station.as_str(), error = %err, "{} artifact write failed", kind.as_str());
    }
}
