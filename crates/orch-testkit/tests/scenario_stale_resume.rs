//! Stale resume: a run seeded as `running` with
//! `currentStation="plan"`, a stale heartbeat, and `intake`/`plan` already
//! `succeeded`. A single delivery must take over starting at `implement`
//! without re-running the earlier stations, and the run must reach
//! `succeeded`.
//!
//! Skipped when `ORCH_DATABASE_URL` isn't set.

use chrono::{Duration as ChronoDuration, Utc};
use orch_store::run::NewRunParams;
use orch_store::station;
use orch_testkit::Harness;
use orch_types::{run::Station, PrMode, RunQueueMessage};
use uuid::Uuid;

async fn connect_test_pool() -> Option<sqlx::PgPool> {
    match std::env::var(orch_store::ENV_DB_URL) {
        Ok(url) => {
            let pool = orch_store::connect(&url).await.expect("connect to test database");
            orch_store::migrate(&pool).await.expect("migrate test database");
            Some(pool)
        }
        Err(_) => None,
    }
}

#[tokio::test]
async fn stale_run_resumes_at_implement_without_rerunning_intake_or_plan() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let harness = Harness::new(pool.clone());

    let repo = orch_store::repo::register_repo(
        &pool,
        &orch_types::NewRepo {
            owner: format!("stale-owner-{}", Uuid::new_v4()),
            name: format!("stale-repo-{}", Uuid::new_v4()),
            default_branch: None,
            config_path: None,
            enabled: Some(true),
        },
    )
    .await
    .expect("register repo");

    let run_id = Uuid::new_v4();
    orch_store::run::insert_queued_run(
        &pool,
        NewRunParams {
            id: run_id,
            repo_id: repo.id,
            issue_number: 42,
            goal: None,
            requestor: "dana",
            base_branch: &repo.default_branch,
            pr_mode: PrMode::Draft,
        },
    )
    .await
    .expect("insert run");

    assert!(orch_store::run::claim_queued_cas(&pool, run_id).await.unwrap());

    let started_at = Utc::now();
    for station in [Station::Intake, Station::Plan] {
        station::upsert_station_running(&pool, run_id, station, started_at).await.unwrap();
        assert!(
            station::mark_succeeded_cas(&pool, run_id, station, "seeded", started_at.timestamp_millis())
                .await
                .unwrap()
        );
    }

    let stale_heartbeat = Utc::now() - ChronoDuration::seconds(60);
    sqlx::query("update runs set current_station = 'plan', heartbeat_at = $2 where id = $1")
        .bind(run_id)
        .bind(stale_heartbeat)
        .execute(&pool)
        .await
        .unwrap();

    let message = RunQueueMessage {
        run_id,
        repo_id: repo.id,
        issue_number: 42,
        requested_at: Utc::now(),
        pr_mode: PrMode::Draft,
        requestor: "dana".to_string(),
    };
    harness.deliver(&message).await;

    let run = orch_store::run::get_run(&pool, run_id).await.unwrap().expect("run exists");
    assert_eq!(run.status, orch_types::RunStatus::Succeeded);

    let intake = station::get_station_execution(&pool, run_id, Station::Intake).await.unwrap().unwrap();
    assert_eq!(intake.summary.as_deref(), Some("seeded"), "intake must not be re-run");
    let plan = station::get_station_execution(&pool, run_id, Station::Plan).await.unwrap().unwrap();
    assert_eq!(plan.summary.as_deref(), Some("seeded"), "plan must not be re-run");

    let implement = station::get_station_execution(&pool, run_id, Station::Implement).await.unwrap().unwrap();
    assert_eq!(implement.status, orch_types::StationStatus::Succeeded);
}
