use chrono::{DateTime, Utc};
use orch_types::{truncate_summary, PrMode, Run, RunStatus, Station};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreResult;

pub struct NewRunParams<'a> {
    pub id: Uuid,
    pub repo_id: Uuid,
    pub issue_number: i64,
    pub goal: Option<&'a str>,
    pub requestor: &'a str,
    pub base_branch: &'a str,
    pub pr_mode: PrMode,
}

/// Insert a run row in `queued` (spec §3 lifecycle: Run is created by the
/// control plane in `queued`; all further transitions are CAS-owned by the
/// execution engine).
pub async fn insert_queued_run(pool: &PgPool, params: NewRunParams<'_>) -> StoreResult<Run> {
    let now = Utc::now();
    sqlx::query(
        r#"
        insert into runs (
            id, repo_id, issue_number, goal, status, current_station,
            requestor, base_branch, work_branch, pr_mode, pr_url, created_at
        ) values (
            $1, $2, $3, $4, 'queued', null, $5, $6, null, $7, null, $8
        )
        "#,
    )
    .bind(params.id)
    .bind(params.repo_id)
    .bind(params.issue_number)
    .bind(params.goal)
    .bind(params.requestor)
    .bind(params.base_branch)
    .bind(params.pr_mode.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Run {
        id: params.id,
        repo_id: params.repo_id,
        issue_number: params.issue_number,
        goal: params.goal.map(|s| s.to_string()),
        status: RunStatus::Queued,
        current_station: None,
        requestor: params.requestor.to_string(),
        base_branch: params.base_branch.to_string(),
        work_branch: None,
        pr_mode: params.pr_mode,
        pr_url: None,
        created_at: now,
        started_at: None,
        heartbeat_at: None,
        finished_at: None,
        failure_reason: None,
    })
}

/// Used on the no-prior-claim path when idempotency-claim insertion loses a
/// race: the just-inserted run is deleted and the caller restarts from
/// lookup-by-key (spec §4.1 step 2).
pub async fn delete_run(pool: &PgPool, run_id: Uuid) -> StoreResult<()> {
    sqlx::query("delete from runs where id = $1")
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_run(pool: &PgPool, id: Uuid) -> StoreResult<Option<Run>> {
    let row = sqlx::query(
        r#"
        select id, repo_id, issue_number, goal, status, current_station, requestor,
               base_branch, work_branch, pr_mode, pr_url, created_at, started_at,
               heartbeat_at, finished_at, failure_reason
        from runs
        where id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_run).transpose()
}

pub struct ListRunsFilter {
    pub status: Option<RunStatus>,
    pub repo_id: Option<Uuid>,
    pub limit: i64,
}

pub async fn list_runs(pool: &PgPool, filter: ListRunsFilter) -> StoreResult<Vec<Run>> {
    let rows = sqlx::query(
        r#"
        select id, repo_id, issue_number, goal, status, current_station, requestor,
               base_branch, work_branch, pr_mode, pr_url, created_at, started_at,
               heartbeat_at, finished_at, failure_reason
        from runs
        where ($1::text is null or status = $1)
          and ($2::uuid is null or repo_id = $2)
        order by created_at desc
        limit $3
        "#,
    )
    .bind(filter.status.map(|s| s.as_str().to_string()))
    .bind(filter.repo_id)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_run).collect()
}

/// Claim-queued CAS (spec §4.2 step 5). Returns true iff this call won
/// exclusive ownership (exactly one row changed).
pub async fn claim_queued_cas(pool: &PgPool, run_id: Uuid) -> StoreResult<bool> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        update runs
        set status = 'running',
            started_at = coalesce(started_at, $2),
            current_station = 'intake',
            heartbeat_at = $2,
            failure_reason = null
        where id = $1 and status = 'queued'
        "#,
    )
    .bind(run_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Claim-stale CAS (spec §4.2 step 5, §5). The predicate reproduces the
/// observed heartbeat snapshot exactly: if a heartbeat was observed, it must
/// still match; if none was ever written, `started_at` must still match.
/// This is the optimistic-concurrency token that lets a lone winner resume a
/// run without explicit leases.
pub async fn claim_stale_cas(
    pool: &PgPool,
    run_id: Uuid,
    observed_heartbeat_at: Option<DateTime<Utc>>,
    observed_started_at: DateTime<Utc>,
) -> StoreResult<bool> {
    let now = Utc::now();
    let result = match observed_heartbeat_at {
        Some(observed) => {
            sqlx::query(
                r#"
                update runs
                set heartbeat_at = $3
                where id = $1 and status = 'running' and heartbeat_at = $2
                "#,
            )
            .bind(run_id)
            .bind(observed)
            .bind(now)
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                update runs
                set heartbeat_at = $3
                where id = $1 and status = 'running' and heartbeat_at is null and started_at = $2
                "#,
            )
            .bind(run_id)
            .bind(observed_started_at)
            .bind(now)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() == 1)
}

/// Heartbeat ticker write (spec §5): refreshes `(current_station, heartbeat_at)`
/// under the predicate `status='running'`. A 0-row result is tolerated by the
/// caller (logged only, never treated as an error).
pub async fn touch_heartbeat(pool: &PgPool, run_id: Uuid, station: Station) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        update runs
        set current_station = $2, heartbeat_at = $3
        where id = $1 and status = 'running'
        "#,
    )
    .bind(run_id)
    .bind(station.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Finalize-run CAS (spec §4.2 step 8): `running -> succeeded`.
pub async fn finalize_run_succeeded_cas(pool: &PgPool, run_id: Uuid) -> StoreResult<bool> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        update runs
        set status = 'succeeded', finished_at = $2, current_station = null,
            failure_reason = null, heartbeat_at = $2
        where id = $1 and status = 'running'
        "#,
    )
    .bind(run_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Terminal-failure CAS (spec §4.2 `handleTerminalRunFailure`): `running -> failed`.
pub async fn fail_run_cas(
    pool: &PgPool,
    run_id: Uuid,
    failure_station: Station,
    failure_reason: &str,
) -> StoreResult<bool> {
    let now = Utc::now();
    let bounded = truncate_summary(failure_reason);
    let result = sqlx::query(
        r#"
        update runs
        set status = 'failed', finished_at = $2, current_station = $3,
            failure_reason = $4, heartbeat_at = $2
        where id = $1 and status = 'running'
        "#,
    )
    .bind(run_id)
    .bind(now)
    .bind(failure_station.as_str())
    .bind(&bounded)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// CAS on current_station+heartbeat only, used by `executeStation` step 3.
/// Tolerates 0 rows changed (logs only per spec §4.3 step 3).
pub async fn set_current_station_cas(pool: &PgPool, run_id: Uuid, station: Station) -> StoreResult<bool> {
    touch_heartbeat(pool, run_id, station).await
}

/// Set `runs.failure_reason = "queue_publish_failed"` on the enqueue-failure
/// path (spec §4.1 step 3). Best-effort: caller logs if this returns 0 rows.
pub async fn mark_queue_publish_failed(pool: &PgPool, run_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("update runs set failure_reason = $2 where id = $1")
        .bind(run_id)
        .bind(orch_types::QUEUE_PUBLISH_FAILED_REASON)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Clear a still-`queued` run's `failure_reason` after a winning enqueue
/// retry (spec §4.1 step 4). Best-effort: a 0-row result means the run has
/// already moved past `queued`, which is fine — `claim_queued_cas` clears
/// the same column on its own transition.
pub async fn clear_failure_reason_cas(pool: &PgPool, run_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("update runs set failure_reason = null where id = $1 and status = 'queued'")
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Rollup of run counts grouped by status, for the stats endpoint.
pub struct StatusCount {
    pub status: RunStatus,
    pub count: i64,
}

pub async fn count_by_status(pool: &PgPool) -> StoreResult<Vec<StatusCount>> {
    let rows = sqlx::query("select status, count(*) as count from runs group by status")
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let status_raw: String = row.try_get("status")?;
            let status = RunStatus::parse(&status_raw).unwrap_or(RunStatus::Queued);
            let count: i64 = row.try_get("count")?;
            Ok(StatusCount { status, count })
        })
        .collect()
}

fn row_to_run(row: sqlx::postgres::PgRow) -> StoreResult<Run> {
    let status_raw: String = row.try_get("status")?;
    let status = RunStatus::parse(&status_raw).unwrap_or(RunStatus::Queued);

    let current_station_raw: Option<String> = row.try_get("current_station")?;
    let current_station = current_station_raw.and_then(|s| Station::parse(&s));

    let pr_mode_raw: String = row.try_get("pr_mode")?;
    let pr_mode = PrMode::parse(&pr_mode_raw).unwrap_or(PrMode::Draft);

    Ok(Run {
        id: row.try_get("id")?,
        repo_id: row.try_get("repo_id")?,
        issue_number: row.try_get("issue_number")?,
        goal: row.try_get("goal")?,
        status,
        current_station,
        requestor: row.try_get("requestor")?,
        base_branch: row.try_get("base_branch")?,
        work_branch: row.try_get("work_branch")?,
        pr_mode,
        pr_url: row.try_get("pr_url")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        heartbeat_at: row.try_get("heartbeat_at")?,
        finished_at: row.try_get("finished_at")?,
        failure_reason: row.try_get("failure_reason")?,
    })
}
