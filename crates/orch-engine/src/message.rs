use chrono::{DateTime, Utc};
use orch_coderunner::CoderunnerAdapter;
use orch_types::{run::Station, ArtifactStorage, ArtifactType, DeliveryOutcome, Run, RunQueueMessage, RunStatus, StationStatus, STATION_ORDER};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StationError;
use crate::heartbeat::STALE_THRESHOLD;
use crate::station;

/// Processes one queue delivery end to end. Never panics or propagates an
/// error to the caller: every failure path resolves to an [`DeliveryOutcome`].
pub async fn handle_message(pool: &PgPool, adapter: &dyn CoderunnerAdapter, message: &RunQueueMessage) -> DeliveryOutcome {
    if message.issue_number <= 0 {
        tracing::warn!(run_id = %message.run_id, issue_number = message.issue_number, "queue.message.invalid");
        return DeliveryOutcome::Ack;
    }

    let run = match orch_store::run::get_run(pool, message.run_id).await {
        Ok(Some(run)) => run,
        Ok(None) => {
            tracing::info!(run_id = %message.run_id, "run.missing");
            return DeliveryOutcome::Ack;
        }
        Err(err) => {
            tracing::error!(run_id = %message.run_id, error = %err, "run lookup failed");
            return DeliveryOutcome::Retry;
        }
    };

    if run.status.is_terminal() {
        tracing::info!(run_id = %run.id, status = run.status.as_str(), "run.skip.terminal");
        return DeliveryOutcome::Ack;
    }

    let start_index = match run.status {
        RunStatus::Queued => match claim_queued(pool, &run).await {
            ClaimOutcome::Claimed => 0,
            ClaimOutcome::LostRace => return reread_after_failed_claim(pool, run.id).await,
        },
        RunStatus::Running => match claim_stale(pool, &run).await {
            StaleClaimOutcome::Fresh => return DeliveryOutcome::Retry,
            StaleClaimOutcome::Claimed(index) => index,
            StaleClaimOutcome::LostRace => return DeliveryOutcome::Retry,
        },
        other => {
            tracing::warn!(run_id = %run.id, status = other.as_str(), "run.status.unexpected");
            return DeliveryOutcome::Ack;
        }
    };

    let repo = match orch_store::repo::get_repo_by_id(pool, run.repo_id).await {
        Ok(repo) => repo,
        Err(err) => {
            let failure_station = run.current_station.unwrap_or(Station::Intake);
            return handle_terminal_run_failure(pool, run.id, failure_station, &format!("repo lookup failed: {err}")).await;
        }
    };

    for index in start_index..STATION_ORDER.len() {
        let station = Station::from_index(index).expect("index is within STATION_ORDER bounds");
        match station::execute_station(pool, adapter, &run, &repo, station).await {
            Ok(()) => continue,
            Err(StationError::Retryable(e)) => {
                tracing::info!(run_id = %run.id, station = station.as_str(), reason = %e.reason, "station retryable, deferring redelivery");
                return DeliveryOutcome::Retry;
            }
            Err(StationError::Terminal(e)) => {
                return handle_terminal_run_failure(pool, run.id, station, &e.reason).await;
            }
        }
    }

    finalize_run(pool, &run).await
}

enum ClaimOutcome {
    Claimed,
    LostRace,
}

/// Claim-queued CAS: `queued -> running`.
async fn claim_queued(pool: &PgPool, run: &Run) -> ClaimOutcome {
    match orch_store::run::claim_queued_cas(pool, run.id).await {
        Ok(true) => ClaimOutcome::Claimed,
        Ok(false) => ClaimOutcome::LostRace,
        Err(err) => {
            tracing::error!(run_id = %run.id, error = %err, "claim-queued CAS failed");
            ClaimOutcome::LostRace
        }
    }
}

async fn reread_after_failed_claim(pool: &PgPool, run_id: Uuid) -> DeliveryOutcome {
    match orch_store::run::get_run(pool, run_id).await {
        Ok(Some(run)) if run.status.is_terminal() => DeliveryOutcome::Ack,
        Ok(_) => DeliveryOutcome::Retry,
        Err(err) => {
            tracing::error!(%run_id, error = %err, "re-read after failed claim-queued CAS failed");
            DeliveryOutcome::Retry
        }
    }
}

enum StaleClaimOutcome {
    Fresh,
    Claimed(usize),
    LostRace,
}

/// Liveness check plus claim-stale CAS. `heartbeat_at` is preferred over
/// `started_at` as the liveness reference, matching the
/// `COALESCE(heartbeat_at, started_at)` predicate used by the CAS itself.
async fn claim_stale(pool: &PgPool, run: &Run) -> StaleClaimOutcome {
    let reference: DateTime<Utc> = run.heartbeat_at.or(run.started_at).unwrap_or(run.created_at);
    if !is_stale(reference, Utc::now()) {
        return StaleClaimOutcome::Fresh;
    }

    let observed_started_at = run.started_at.unwrap_or(run.created_at);
    match orch_store::run::claim_stale_cas(pool, run.id, run.heartbeat_at, observed_started_at).await {
        Ok(true) => StaleClaimOutcome::Claimed(resume_start_index(pool, run).await),
        Ok(false) => StaleClaimOutcome::LostRace,
        Err(err) => {
            tracing::error!(run_id = %run.id, error = %err, "claim-stale CAS failed");
            StaleClaimOutcome::LostRace
        }
    }
}

/// Resume start index: resume at the successor of `currentStation` if it
/// already succeeded, else re-enter `currentStation` itself.
async fn resume_start_index(pool: &PgPool, run: &Run) -> usize {
    let station = match run.current_station {
        Some(s) => s,
        None => return 0,
    };

    let prior_status = match orch_store::station::get_station_execution(pool, run.id, station).await {
        Ok(exec) => exec.map(|e| e.status),
        Err(err) => {
            tracing::warn!(run_id = %run.id, station = station.as_str(), error = %err, "resume-index lookup failed, re-entering current station");
            None
        }
    };

    start_index_from_prior_status(station, prior_status)
}

/// Pure resume-index decision, split out from its store lookup for testing
/// without a database.
fn start_index_from_prior_status(station: Station, prior_status: Option<StationStatus>) -> usize {
    match prior_status {
        Some(StationStatus::Succeeded) => station.index() + 1,
        _ => station.index(),
    }
}

/// Pure liveness predicate underlying the claim-stale branch:
/// `now - reference >= 30s`.
fn is_stale(reference: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let threshold = chrono::Duration::from_std(STALE_THRESHOLD).expect("stale threshold fits in chrono::Duration");
    now.signed_duration_since(reference) >= threshold
}

/// `running -> failed` CAS, tolerant of a concurrent finisher.
async fn handle_terminal_run_failure(pool: &PgPool, run_id: Uuid, station: Station, reason: &str) -> DeliveryOutcome {
    match orch_store::run::fail_run_cas(pool, run_id, station, reason).await {
        Ok(true) => DeliveryOutcome::Ack,
        Ok(false) => match orch_store::run::get_run(pool, run_id).await {
            Ok(Some(run)) if run.status.is_terminal() => DeliveryOutcome::Ack,
            Ok(_) => DeliveryOutcome::Retry,
            Err(err) => {
                tracing::error!(%run_id, error = %err, "re-read after failed terminal-failure CAS failed");
                DeliveryOutcome::Retry
            }
        },
        Err(err) => {
            tracing::error!(%run_id, error = %err, "terminal-failure CAS failed");
            DeliveryOutcome::Retry
        }
    }
}

/// Finalize-run CAS plus `workflow_summary` artifact.
async fn finalize_run(pool: &PgPool, run: &Run) -> DeliveryOutcome {
    match orch_store::run::finalize_run_succeeded_cas(pool, run.id).await {
        Ok(true) => {
            upsert_workflow_summary(pool, run).await;
            DeliveryOutcome::Ack
        }
        Ok(false) => {
            tracing::info!(run_id = %run.id, "run.succeeded.noop");
            upsert_workflow_summary(pool, run).await;
            DeliveryOutcome::Ack
        }
        Err(err) => {
            tracing::error!(run_id = %run.id, error = %err, "finalize-run CAS failed");
            DeliveryOutcome::Retry
        }
    }
}

async fn upsert_workflow_summary(pool: &PgPool, run: &Run) {
    let payload = serde_json::json!({
        "run_id": run.id,
        "issue_number": run.issue_number,
        "stations": STATION_ORDER.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    });
    if let Err(err) = orch_store::artifact::upsert_artifact(pool, run.id, ArtifactType::WorkflowSummary, ArtifactStorage::Inline, payload).await
    {
        tracing::warn!(run_id = %run.id, error = %err, "workflow_summary artifact write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_heartbeat_is_not_stale() {
        let now = Utc::now();
        let reference = now - Duration::seconds(10);
        assert!(!is_stale(reference, now));
    }

    #[test]
    fn heartbeat_at_exactly_30s_is_stale() {
        let now = Utc::now();
        let reference = now - Duration::seconds(30);
        assert!(is_stale(reference, now));
    }

    #[test]
    fn resume_index_advances_past_succeeded_station() {
        let index = start_index_from_prior_status(Station::Plan, Some(StationStatus::Succeeded));
        assert_eq!(index, Station::Implement.index());
    }

    #[test]
    fn resume_index_re_enters_unfinished_station() {
        assert_eq!(start_index_from_prior_status(Station::Plan, Some(StationStatus::Running)), Station::Plan.index());
        assert_eq!(start_index_from_prior_status(Station::Plan, None), Station::Plan.index());
    }
}
