//! The `create_run` submission protocol: resolve an `Idempotency-Key` against
//! any prior claim, then either replay, requeue, or mint a brand-new run.
//! This is the one place in the control plane where more than one CAS write
//! has to agree with each other, so the whole decision tree lives in a single
//! function instead of being spread across the HTTP handler.

use std::sync::Arc;

use chrono::Utc;
use orch_queue::Queue;
use orch_store::error::StoreError;
use orch_types::{ClaimStatus, IdempotencyClaim, PrMode, Repo, Run, RunQueueMessage};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// A small bound on the no-prior-claim insert race: each loss means a
/// concurrent submitter inserted the claim first, so the next iteration finds
/// it on lookup. Real contention resolves within a handful of attempts.
const MAX_RACE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct CreateRunInput {
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: i64,
    pub goal: Option<String>,
    pub requestor: String,
    pub pr_mode: PrMode,
    pub idempotency_key: String,
}

#[derive(Serialize)]
struct CanonicalSubmission<'a> {
    repo_owner: &'a str,
    repo_name: &'a str,
    issue_number: i64,
    goal: &'a Option<String>,
    requestor: &'a str,
    pr_mode: &'a str,
}

#[derive(Debug)]
pub enum CreateRunOutcome {
    /// 202, brand-new run inserted and enqueued.
    Created { run: Run, claim: IdempotencyClaim },
    /// 200, prior submission under this key already succeeded.
    ReplayedSucceeded { run: Run, claim: IdempotencyClaim },
    /// 202, prior submission is in flight (pending, no failure marker) or a
    /// concurrent requeue attempt lost its CAS.
    ReplayedPending { run: Run, claim: IdempotencyClaim },
    /// 202, a requeue-claim CAS won and a fresh enqueue just succeeded.
    Requeued { run: Run, claim: IdempotencyClaim },
    /// 409, same key reused with a different submission payload.
    KeyConflict,
    /// 400, the referenced repo isn't registered (or is disabled).
    RepoNotFound,
    /// 503, the queue publish failed (on first attempt or on a requeue).
    EnqueueFailed { run: Run, claim: IdempotencyClaim },
    /// 500, something went wrong that no retry of this function will fix.
    Internal(String),
}

pub async fn create_run(pool: &PgPool, queue: &Arc<dyn Queue>, input: CreateRunInput) -> CreateRunOutcome {
    let repo = match orch_store::repo::get_repo_by_slug(pool, &input.repo_owner, &input.repo_name).await {
        Ok(Some(repo)) if repo.enabled => repo,
        Ok(_) => return CreateRunOutcome::RepoNotFound,
        Err(e) => return CreateRunOutcome::Internal(format!("repo lookup failed: {e}")),
    };

    let request_hash = match compute_request_hash(&input) {
        Ok(h) => h,
        Err(e) => return CreateRunOutcome::Internal(format!("request hash failed: {e}")),
    };

    for _ in 0..MAX_RACE_ATTEMPTS {
        match orch_store::idempotency::get_claim_by_key(pool, &input.idempotency_key).await {
            Ok(Some(claim)) => return resolve_existing_claim(pool, queue, claim, &request_hash).await,
            Ok(None) => match insert_fresh_run_and_claim(pool, &repo, &input, &request_hash).await {
                InsertOutcome::Inserted { run, claim } => {
                    return enqueue_and_settle(pool, queue, run, claim, false).await;
                }
                InsertOutcome::LostRace => continue,
                InsertOutcome::Internal(msg) => return CreateRunOutcome::Internal(msg),
            },
            Err(e) => return CreateRunOutcome::Internal(format!("claim lookup failed: {e}")),
        }
    }

    CreateRunOutcome::Internal("exceeded retry attempts resolving idempotency claim race".to_string())
}

async fn resolve_existing_claim(
    pool: &PgPool,
    queue: &Arc<dyn Queue>,
    claim: IdempotencyClaim,
    request_hash: &str,
) -> CreateRunOutcome {
    if claim.request_hash != request_hash {
        return CreateRunOutcome::KeyConflict;
    }

    let run = match orch_store::run::get_run(pool, claim.run_id).await {
        Ok(Some(run)) => run,
        Ok(None) => return CreateRunOutcome::Internal("claim references a run that no longer exists".to_string()),
        Err(e) => return CreateRunOutcome::Internal(format!("run lookup failed: {e}")),
    };

    match claim.status {
        ClaimStatus::Succeeded => CreateRunOutcome::ReplayedSucceeded { run, claim },
        ClaimStatus::Failed => requeue_from_failed(pool, queue, run, claim).await,
        ClaimStatus::Pending if run.failure_reason.as_deref() == Some(orch_types::QUEUE_PUBLISH_FAILED_REASON) => {
            requeue_from_pending_marker(pool, queue, run, claim).await
        }
        ClaimStatus::Pending => CreateRunOutcome::ReplayedPending { run, claim },
    }
}

async fn requeue_from_failed(pool: &PgPool, queue: &Arc<dyn Queue>, run: Run, claim: IdempotencyClaim) -> CreateRunOutcome {
    match orch_store::idempotency::requeue_claim_from_failed_cas(pool, &claim.key).await {
        Ok(true) => {
            let claim = reread_claim_or(pool, claim).await;
            enqueue_and_settle(pool, queue, run, claim, true).await
        }
        Ok(false) => {
            let claim = reread_claim_or(pool, claim).await;
            CreateRunOutcome::ReplayedPending { run, claim }
        }
        Err(e) => {
            tracing::warn!(key = %claim.key, error = %e, "requeue-claim CAS (failed branch) errored");
            CreateRunOutcome::ReplayedPending { run, claim }
        }
    }
}

async fn requeue_from_pending_marker(pool: &PgPool, queue: &Arc<dyn Queue>, run: Run, claim: IdempotencyClaim) -> CreateRunOutcome {
    match orch_store::idempotency::requeue_claim_from_pending_cas(pool, &claim.key, claim.updated_at).await {
        Ok(true) => {
            let claim = reread_claim_or(pool, claim).await;
            enqueue_and_settle(pool, queue, run, claim, true).await
        }
        Ok(false) => {
            let claim = reread_claim_or(pool, claim).await;
            CreateRunOutcome::ReplayedPending { run, claim }
        }
        Err(e) => {
            tracing::warn!(key = %claim.key, error = %e, "requeue-claim CAS (pending-marker branch) errored");
            CreateRunOutcome::ReplayedPending { run, claim }
        }
    }
}

enum InsertOutcome {
    Inserted { run: Run, claim: IdempotencyClaim },
    LostRace,
    Internal(String),
}

async fn insert_fresh_run_and_claim(pool: &PgPool, repo: &Repo, input: &CreateRunInput, request_hash: &str) -> InsertOutcome {
    let run_id = Uuid::new_v4();
    let run = match orch_store::run::insert_queued_run(
        pool,
        orch_store::run::NewRunParams {
            id: run_id,
            repo_id: repo.id,
            issue_number: input.issue_number,
            goal: input.goal.as_deref(),
            requestor: &input.requestor,
            base_branch: &repo.default_branch,
            pr_mode: input.pr_mode,
        },
    )
    .await
    {
        Ok(run) => run,
        Err(e) => return InsertOutcome::Internal(format!("run insert failed: {e}")),
    };

    match orch_store::idempotency::insert_pending_claim(pool, &input.idempotency_key, request_hash, run_id).await {
        Ok(claim) => InsertOutcome::Inserted { run, claim },
        Err(StoreError::UniqueViolation { .. }) => match orch_store::run::delete_run(pool, run_id).await {
            Ok(()) => InsertOutcome::LostRace,
            Err(e) => InsertOutcome::Internal(format!(
                "lost idempotency-key race but failed to delete orphan run {run_id}: {e}"
            )),
        },
        Err(e) => InsertOutcome::Internal(format!("claim insert failed: {e}")),
    }
}

async fn enqueue_and_settle(pool: &PgPool, queue: &Arc<dyn Queue>, run: Run, claim: IdempotencyClaim, requeued: bool) -> CreateRunOutcome {
    let message = RunQueueMessage {
        run_id: run.id,
        repo_id: run.repo_id,
        issue_number: run.issue_number,
        requested_at: Utc::now(),
        pr_mode: run.pr_mode,
        requestor: run.requestor.clone(),
    };

    match queue.publish(message).await {
        Ok(()) => {
            if let Err(e) = orch_store::idempotency::promote_succeeded_cas(pool, &claim.key).await {
                tracing::warn!(key = %claim.key, error = %e, "promote-succeeded CAS failed");
            }
            if let Err(e) = orch_store::run::clear_failure_reason_cas(pool, run.id).await {
                tracing::warn!(run_id = %run.id, error = %e, "clear-failure-reason CAS failed");
            }
            let claim = reread_claim_or(pool, claim).await;
            let run = reread_run_or(pool, run).await;
            if requeued {
                CreateRunOutcome::Requeued { run, claim }
            } else {
                CreateRunOutcome::Created { run, claim }
            }
        }
        Err(err) => {
            tracing::error!(run_id = %run.id, error = %err, "run submission enqueue failed");
            if let Err(e) = orch_store::run::mark_queue_publish_failed(pool, run.id).await {
                tracing::warn!(run_id = %run.id, error = %e, "mark-queue-publish-failed write failed");
            }
            if let Err(e) = orch_store::idempotency::demote_failed_cas(pool, &claim.key).await {
                tracing::warn!(key = %claim.key, error = %e, "demote-failed CAS failed");
            }
            let claim = reread_claim_or(pool, claim).await;
            let run = reread_run_or(pool, run).await;
            CreateRunOutcome::EnqueueFailed { run, claim }
        }
    }
}

async fn reread_claim_or(pool: &PgPool, fallback: IdempotencyClaim) -> IdempotencyClaim {
    match orch_store::idempotency::get_claim_by_key(pool, &fallback.key).await {
        Ok(Some(claim)) => claim,
        _ => fallback,
    }
}

async fn reread_run_or(pool: &PgPool, fallback: Run) -> Run {
    match orch_store::run::get_run(pool, fallback.id).await {
        Ok(Some(run)) => run,
        _ => fallback,
    }
}

fn compute_request_hash(input: &CreateRunInput) -> anyhow::Result<String> {
    let payload = CanonicalSubmission {
        repo_owner: &input.repo_owner,
        repo_name: &input.repo_name,
        issue_number: input.issue_number,
        goal: &input.goal,
        requestor: &input.requestor,
        pr_mode: input.pr_mode.as_str(),
    };
    orch_config::request_hash(&payload)
}
