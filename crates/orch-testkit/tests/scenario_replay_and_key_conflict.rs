//! Idempotency replay and key-reuse-with-different-payload behavior.
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
async fn replay_returns_200_with_same_run_id_and_no_new_queue_message() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let harness = Harness::new(pool);

    let owner = format!("acme-{}", Uuid::new_v4());
    let name = "svc".to_string();
    harness.call_control_plane(orch_testkit::register_repo_request(&owner, &name)).await;

    let (status, first) = harness
        .call_control_plane(orch_testkit::create_run_request(&owner, &name, 7, "u", "k1", None))
        .await;
    assert_eq!(status, axum::http::StatusCode::ACCEPTED);
    let run_id = first["run"]["id"].as_str().unwrap().to_string();
    assert_eq!(harness.queue.len().await, 1);

    let (status, second) = harness
        .call_control_plane(orch_testkit::create_run_request(&owner, &name, 7, "u", "k1", None))
        .await;
    assert_eq!(status, axum::http::StatusCode::ACCEPTED);
    assert_eq!(second["run"]["id"], run_id);
    assert_eq!(second["idempotency"]["replayed"], true);
    assert_eq!(harness.queue.len().await, 1, "replay must not enqueue a second message");
}

#[tokio::test]
async fn same_key_different_payload_is_409_with_no_writes() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let harness = Harness::new(pool);

    let owner = format!("acme-{}", Uuid::new_v4());
    let name = "svc".to_string();
    harness.call_control_plane(orch_testkit::register_repo_request(&owner, &name)).await;

    let (status, _) = harness
        .call_control_plane(orch_testkit::create_run_request(&owner, &name, 7, "u", "k1", None))
        .await;
    assert_eq!(status, axum::http::StatusCode::ACCEPTED);
    assert_eq!(harness.queue.len().await, 1);

    let (status, _) = harness
        .call_control_plane(orch_testkit::create_run_request(&owner, &name, 8, "u", "k1", None))
        .await;
    assert_eq!(status, axum::http::StatusCode::CONFLICT);
    assert_eq!(harness.queue.len().await, 1, "a rejected key-reuse submission must not enqueue");
}
