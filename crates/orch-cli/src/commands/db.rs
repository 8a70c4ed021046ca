//! Direct-to-Postgres admin commands. These bypass the HTTP services
//! entirely since migrations need to run before either service can serve
//! traffic.

use anyhow::{Context, Result};

pub async fn status() -> Result<()> {
    let pool = orch_store::connect_from_env().await.context("connecting to Postgres")?;
    let ok = sqlx::query("select 1").fetch_one(&pool).await.is_ok();
    println!("db_ok={ok}");
    Ok(())
}

pub async fn migrate() -> Result<()> {
    let pool = orch_store::connect_from_env().await.context("connecting to Postgres")?;
    orch_store::migrate(&pool).await.context("running migrations")?;
    println!("migrations_applied=true");
    Ok(())
}
