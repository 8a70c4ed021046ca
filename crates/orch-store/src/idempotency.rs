use chrono::{DateTime, Utc};
use orch_types::{ClaimStatus, IdempotencyClaim};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Insert a `pending` claim alongside the first successful run insert.
/// Unique collision on `key` surfaces as [`StoreError::UniqueViolation`] —
/// the caller treats this as "a concurrent submitter won the race" and
/// restarts from lookup-by-key.
pub async fn insert_pending_claim(
    pool: &PgPool,
    key: &str,
    request_hash: &str,
    run_id: Uuid,
) -> StoreResult<IdempotencyClaim> {
    let now = Utc::now();
    sqlx::query(
        r#"
        insert into idempotency_claims (key, request_hash, run_id, status, created_at, updated_at)
        values ($1, $2, $3, 'pending', $4, $4)
        "#,
    )
    .bind(key)
    .bind(request_hash)
    .bind(run_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(IdempotencyClaim {
        key: key.to_string(),
        request_hash: request_hash.to_string(),
        run_id,
        status: ClaimStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_claim_by_key(pool: &PgPool, key: &str) -> StoreResult<Option<IdempotencyClaim>> {
    let row = sqlx::query(
        r#"
        select key, request_hash, run_id, status, created_at, updated_at
        from idempotency_claims
        where key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_claim).transpose()
}

/// CAS-promote `pending -> succeeded` after a successful enqueue. If this
/// loses to a concurrent writer, the caller re-reads and proceeds — never
/// downgrades `succeeded` back to `failed`.
pub async fn promote_succeeded_cas(pool: &PgPool, key: &str) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        update idempotency_claims
        set status = 'succeeded', updated_at = $2
        where key = $1 and status = 'pending'
        "#,
    )
    .bind(key)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// CAS-demote `pending -> failed` on enqueue failure.
pub async fn demote_failed_cas(pool: &PgPool, key: &str) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        update idempotency_claims
        set status = 'failed', updated_at = $2
        where key = $1 and status = 'pending'
        "#,
    )
    .bind(key)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Requeue-claim CAS, `failed` branch: `UPDATE claim SET status='pending'
/// WHERE key=? AND status='failed'`. Exactly one concurrent retry wins; the
/// winner proceeds to enqueue.
pub async fn requeue_claim_from_failed_cas(pool: &PgPool, key: &str) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        update idempotency_claims
        set status = 'pending', updated_at = $2
        where key = $1 and status = 'failed'
        "#,
    )
    .bind(key)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Requeue-claim CAS, pending-with-failure-marker branch: optimistic
/// concurrency keyed on the previously observed `updated_at`.
pub async fn requeue_claim_from_pending_cas(
    pool: &PgPool,
    key: &str,
    observed_updated_at: DateTime<Utc>,
) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        update idempotency_claims
        set updated_at = $3
        where key = $1 and status = 'pending' and updated_at = $2
        "#,
    )
    .bind(key)
    .bind(observed_updated_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn row_to_claim(row: sqlx::postgres::PgRow) -> StoreResult<IdempotencyClaim> {
    let status_raw: String = row.try_get("status")?;
    let status = ClaimStatus::parse(&status_raw).ok_or(StoreError::NotFound)?;

    Ok(IdempotencyClaim {
        key: row.try_get("key")?,
        request_hash: row.try_get("request_hash")?,
        run_id: row.try_get("run_id")?,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
