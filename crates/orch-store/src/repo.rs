use chrono::Utc;
use orch_types::{NewRepo, Repo, DEFAULT_BRANCH};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreResult;

/// Insert a new repo row. Unique collision on `(owner, name)` surfaces as
/// [`crate::error::StoreError::UniqueViolation`] for the caller to map to 409.
pub async fn register_repo(pool: &PgPool, new_repo: &NewRepo) -> StoreResult<Repo> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let default_branch = new_repo
        .default_branch
        .clone()
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    let enabled = new_repo.enabled.unwrap_or(true);

    sqlx::query(
        r#"
        insert into repos (id, owner, name, default_branch, config_path, enabled, created_at, updated_at)
        values ($1, $2, $3, $4, $5, $6, $7, $7)
        "#,
    )
    .bind(id)
    .bind(&new_repo.owner)
    .bind(&new_repo.name)
    .bind(&default_branch)
    .bind(&new_repo.config_path)
    .bind(enabled)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Repo {
        id,
        owner: new_repo.owner.clone(),
        name: new_repo.name.clone(),
        default_branch,
        config_path: new_repo.config_path.clone(),
        enabled,
        created_at: now,
        updated_at: now,
    })
}

pub async fn list_repos(pool: &PgPool) -> StoreResult<Vec<Repo>> {
    let rows = sqlx::query(
        r#"
        select id, owner, name, default_branch, config_path, enabled, created_at, updated_at
        from repos
        order by owner, name
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_repo).collect()
}

pub async fn get_repo_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Repo> {
    let row = sqlx::query(
        r#"
        select id, owner, name, default_branch, config_path, enabled, created_at, updated_at
        from repos
        where id = $1
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    row_to_repo(row)
}

pub async fn get_repo_by_slug(pool: &PgPool, owner: &str, name: &str) -> StoreResult<Option<Repo>> {
    let row = sqlx::query(
        r#"
        select id, owner, name, default_branch, config_path, enabled, created_at, updated_at
        from repos
        where owner = $1 and name = $2
        "#,
    )
    .bind(owner)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_repo).transpose()
}

fn row_to_repo(row: sqlx::postgres::PgRow) -> StoreResult<Repo> {
    Ok(Repo {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        name: row.try_get("name")?,
        default_branch: row.try_get("default_branch")?,
        config_path: row.try_get("config_path")?,
        enabled: row.try_get("enabled")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
