use chrono::Utc;
use orch_types::{artifact_id, Artifact, ArtifactStorage, ArtifactType};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreResult;

/// Upsert-on-conflict by deterministic id; later writes supersede earlier
/// payloads (spec §3/§9). Callers must never rely on artifact immutability.
pub async fn upsert_artifact(
    pool: &PgPool,
    run_id: Uuid,
    kind: ArtifactType,
    storage: ArtifactStorage,
    payload: Value,
) -> StoreResult<Artifact> {
    let id = artifact_id(run_id, kind);
    let now = Utc::now();
    let storage_str = match storage {
        ArtifactStorage::Inline => "inline",
        ArtifactStorage::External => "external",
    };

    sqlx::query(
        r#"
        insert into artifacts (id, run_id, type, storage, payload, created_at)
        values ($1, $2, $3, $4, $5, $6)
        on conflict (id) do update
        set payload = excluded.payload, created_at = excluded.created_at
        "#,
    )
    .bind(&id)
    .bind(run_id)
    .bind(kind.as_str())
    .bind(storage_str)
    .bind(&payload)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Artifact {
        id,
        run_id,
        kind,
        storage,
        payload,
        created_at: now,
    })
}

/// Artifacts for a run, newest first (spec §4.1 `get_run` projection).
pub async fn list_artifacts_for_run(pool: &PgPool, run_id: Uuid) -> StoreResult<Vec<Artifact>> {
    let rows = sqlx::query(
        r#"
        select id, run_id, type, storage, payload, created_at
        from artifacts
        where run_id = $1
        order by created_at desc
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_artifact).collect()
}

fn row_to_artifact(row: sqlx::postgres::PgRow) -> StoreResult<Artifact> {
    let type_raw: String = row.try_get("type")?;
    let kind = ArtifactType::parse(&type_raw).ok_or(crate::error::StoreError::NotFound)?;

    let storage_raw: String = row.try_get("storage")?;
    let storage = if storage_raw == "external" {
        ArtifactStorage::External
    } else {
        ArtifactStorage::Inline
    };

    Ok(Artifact {
        id: row.try_get("id")?,
        run_id: row.try_get("run_id")?,
        kind,
        storage,
        payload: row.try_get("payload")?,
        created_at: row.try_get("created_at")?,
    })
}
