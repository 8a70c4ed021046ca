//! End-to-end happy path: register a repo, submit a run, drain the queue
//! through the execution engine, and confirm the run reaches `succeeded`
//! with all five stations and a `workflow_summary` artifact.
//!
//! Skipped when `ORCH_DATABASE_URL` isn't set.

use orch_testkit::Harness;
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
async fn happy_path_reaches_succeeded_with_five_stations_and_workflow_summary() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let harness = Harness::new(pool);

    let owner = format!("acme-{}", Uuid::new_v4());
    let name = "svc".to_string();

    let (status, _) = harness.call_control_plane(orch_testkit::register_repo_request(&owner, &name)).await;
    assert_eq!(status, axum::http::StatusCode::CREATED);

    let (status, body) = harness
        .call_control_plane(orch_testkit::create_run_request(&owner, &name, 7, "u", "k1", None))
        .await;
    assert_eq!(status, axum::http::StatusCode::ACCEPTED);
    assert_eq!(body["run"]["status"], "queued");
    let run_id = body["run"]["id"].as_str().unwrap().to_string();

    assert_eq!(harness.queue.len().await, 1);
    harness.drain_queue(10).await;

    let (status, body) = harness.call_control_plane(orch_testkit::get_run_request(&run_id)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["run"]["status"], "succeeded");

    let stations = body["stations"].as_array().unwrap();
    assert_eq!(stations.len(), 5);
    assert!(stations.iter().all(|s| s["status"] == "succeeded"));

    let artifacts = body["artifacts"].as_array().unwrap();
    assert!(artifacts.iter().any(|a| a["type"] == "workflow_summary"));
}
