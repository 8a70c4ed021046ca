use chrono::{DateTime, Utc};
use orch_types::{station_execution_id, truncate_summary, Station, StationExecution, StationStatus};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreResult;

pub async fn get_station_execution(
    pool: &PgPool,
    run_id: Uuid,
    station: Station,
) -> StoreResult<Option<StationExecution>> {
    let id = station_execution_id(run_id, station);
    let row = sqlx::query(
        r#"
        select id, run_id, station, status, started_at, finished_at, duration_ms,
               summary, external_ref, metadata_json, attempt
        from station_executions
        where id = $1
        "#,
    )
    .bind(&id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_station).transpose()
}

/// Upsert the station row to `running`, preserving `started_at` via
/// `COALESCE`. `external_ref` is never overwritten with null once set.
pub async fn upsert_station_running(
    pool: &PgPool,
    run_id: Uuid,
    station: Station,
    started_at: DateTime<Utc>,
) -> StoreResult<StationExecution> {
    let id = station_execution_id(run_id, station);
    sqlx::query(
        r#"
        insert into station_executions (id, run_id, station, status, started_at, attempt)
        values ($1, $2, $3, 'running', $4, 0)
        on conflict (id) do update
        set status = 'running',
            started_at = coalesce(station_executions.started_at, excluded.started_at)
        "#,
    )
    .bind(&id)
    .bind(run_id)
    .bind(station.as_str())
    .bind(started_at)
    .execute(pool)
    .await?;

    get_station_execution(pool, run_id, station)
        .await?
        .ok_or(crate::error::StoreError::NotFound)
}

/// Persist a non-terminal response onto the still-`running` row: bounded
/// summary, `external_ref`, and `metadata_json`. Coalesces `external_ref` so
/// a prior handle is never clobbered with null.
pub async fn persist_non_terminal(
    pool: &PgPool,
    run_id: Uuid,
    station: Station,
    summary: &str,
    external_ref: &str,
    metadata_json: Option<Value>,
    attempt: i32,
) -> StoreResult<()> {
    let id = station_execution_id(run_id, station);
    let bounded = truncate_summary(summary);
    sqlx::query(
        r#"
        update station_executions
        set summary = $2,
            external_ref = coalesce($3, external_ref),
            metadata_json = $4,
            attempt = $5
        where id = $1 and status = 'running'
        "#,
    )
    .bind(&id)
    .bind(&bounded)
    .bind(external_ref)
    .bind(metadata_json)
    .bind(attempt)
    .execute(pool)
    .await?;

    Ok(())
}

/// `running -> succeeded` CAS.
pub async fn mark_succeeded_cas(
    pool: &PgPool,
    run_id: Uuid,
    station: Station,
    summary: &str,
    started_at_ms: i64,
) -> StoreResult<bool> {
    let id = station_execution_id(run_id, station);
    let now = Utc::now();
    let duration_ms = (now.timestamp_millis() - started_at_ms).max(1);
    let bounded = truncate_summary(summary);

    let result = sqlx::query(
        r#"
        update station_executions
        set status = 'succeeded', finished_at = $2, duration_ms = $3, summary = $4
        where id = $1 and status = 'running'
        "#,
    )
    .bind(&id)
    .bind(now)
    .bind(duration_ms)
    .bind(&bounded)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `running -> failed` CAS, best-effort (spec §4.3 step 9: "mark station
/// `failed` (best-effort)" — callers must not fail the overall handler if
/// this returns `false`).
pub async fn mark_failed_cas(
    pool: &PgPool,
    run_id: Uuid,
    station: Station,
    summary: &str,
    started_at_ms: i64,
) -> StoreResult<bool> {
    let id = station_execution_id(run_id, station);
    let now = Utc::now();
    let duration_ms = (now.timestamp_millis() - started_at_ms).max(1);
    let bounded = truncate_summary(summary);

    let result = sqlx::query(
        r#"
        update station_executions
        set status = 'failed', finished_at = $2, duration_ms = $3, summary = $4
        where id = $1 and status = 'running'
        "#,
    )
    .bind(&id)
    .bind(now)
    .bind(duration_ms)
    .bind(&bounded)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All station executions for a run, ordered by the fixed pipeline order
/// then `started_at` (spec §4.1 `get_run` projection).
pub async fn list_station_executions_for_run(pool: &PgPool, run_id: Uuid) -> StoreResult<Vec<StationExecution>> {
    let rows = sqlx::query(
        r#"
        select id, run_id, station, status, started_at, finished_at, duration_ms,
               summary, external_ref, metadata_json, attempt
        from station_executions
        where run_id = $1
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    let mut stations = rows.into_iter().map(row_to_station).collect::<StoreResult<Vec<_>>>()?;
    stations.sort_by_key(|s| (s.station.index(), s.started_at.unwrap_or_default()));
    Ok(stations)
}

fn row_to_station(row: sqlx::postgres::PgRow) -> StoreResult<StationExecution> {
    let station_raw: String = row.try_get("station")?;
    let station = Station::parse(&station_raw).ok_or(crate::error::StoreError::NotFound)?;

    let status_raw: String = row.try_get("status")?;
    let status = StationStatus::parse(&status_raw).unwrap_or(StationStatus::Pending);

    Ok(StationExecution {
        id: row.try_get("id")?,
        run_id: row.try_get("run_id")?,
        station,
        status,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        duration_ms: row.try_get("duration_ms")?,
        summary: row.try_get("summary")?,
        external_ref: row.try_get("external_ref")?,
        metadata_json: row.try_get("metadata_json")?,
        attempt: row.try_get("attempt")?,
    })
}
