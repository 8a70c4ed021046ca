//! Non-terminal external job then resume: the first
//! delivery gets a non-terminal job handle from the coderunner, persists
//! `externalRef` on the still-`running` station, and retries. Once the
//! heartbeat goes stale, the second delivery resumes with
//! `resume.externalRef` set and never calls `submitJob` again.
//!
//! Skipped when `ORCH_DATABASE_URL` isn't set.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use httpmock::prelude::*;
use orch_coderunner::ExternalCoderunnerAdapter;
use orch_store::run::NewRunParams;
use orch_testkit::Harness;
use orch_types::{PrMode, RunQueueMessage};
use serde_json::json;
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
async fn non_terminal_job_resumes_without_resubmitting() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };

    let server = MockServer::start();
    let submit = server.mock(|when, then| {
        when.method(POST).path("/jobs");
        then.status(200).json_body(json!({"externalRef": "job-1", "status": "running"}));
    });
    let status_check = server.mock(|when, then| {
        when.method(GET).path("/jobs/job-1/status");
        then.status(200).json_body(json!({"externalRef": "job-1", "status": "succeeded"}));
    });
    let result = server.mock(|when, then| {
        when.method(GET).path("/jobs/job-1/result");
        then.status(200).json_body(json!({"status": "succeeded", "summary": "implemented", "logs": null}));
    });

    let adapter = Arc::new(ExternalCoderunnerAdapter::new(server.base_url(), None, Duration::from_secs(5)).unwrap());
    let harness = Harness::with_adapter(pool.clone(), adapter);

    let repo = orch_store::repo::register_repo(
        &pool,
        &orch_types::NewRepo {
            owner: format!("ext-owner-{}", Uuid::new_v4()),
            name: format!("ext-repo-{}", Uuid::new_v4()),
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
            issue_number: 9,
            goal: None,
            requestor: "dana",
            base_branch: &repo.default_branch,
            pr_mode: PrMode::Draft,
        },
    )
    .await
    .expect("insert run");

    let message = RunQueueMessage {
        run_id,
        repo_id: repo.id,
        issue_number: 9,
        requested_at: Utc::now(),
        pr_mode: PrMode::Draft,
        requestor: "dana".to_string(),
    };

    // First delivery: intake and plan complete deterministically, then
    // implement hits the coderunner and gets a non-terminal handle back.
    let outcome = harness.deliver(&message).await;
    assert_eq!(outcome, orch_types::DeliveryOutcome::Retry);
    submit.assert_hits(1);

    let implement = orch_store::station::get_station_execution(&pool, run_id, orch_types::run::Station::Implement)
        .await
        .unwrap()
        .expect("implement station row exists");
    assert_eq!(implement.status, orch_types::StationStatus::Running);
    assert_eq!(implement.external_ref.as_deref(), Some("job-1"));

    // Force staleness so the takeover CAS in claim_stale_cas succeeds.
    let stale_heartbeat = Utc::now() - ChronoDuration::seconds(60);
    sqlx::query("update runs set heartbeat_at = $2 where id = $1")
        .bind(run_id)
        .bind(stale_heartbeat)
        .execute(&pool)
        .await
        .unwrap();

    let outcome = harness.deliver(&message).await;
    assert_eq!(outcome, orch_types::DeliveryOutcome::Ack);
    submit.assert_hits(1);
    status_check.assert();
    result.assert();

    let run = orch_store::run::get_run(&pool, run_id).await.unwrap().expect("run exists");
    assert_eq!(run.status, orch_types::RunStatus::Succeeded);
}
