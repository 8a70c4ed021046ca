//! Enqueue-failed-then-retry: the first submission hits
//! a queue that always rejects publish, gets a 503 with
//! `failureReason="queue_publish_failed"`; the client repeats the same
//! key+body against a working queue and gets 202 with `idempotency.requeued`.
//!
//! Skipped when `ORCH_DATABASE_URL` isn't set.

use std::sync::Arc;

use orch_queue::{FailingQueue, InMemoryQueue};
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
async fn enqueue_failure_then_retry_requeues_exactly_once() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };

    let owner = format!("acme-{}", Uuid::new_v4());
    let name = "svc".to_string();

    let failing_router = orch_testkit::control_plane_router(pool.clone(), Arc::new(FailingQueue));
    let (status, _) =
        call(failing_router.clone(), orch_testkit::register_repo_request(&owner, &name)).await;
    assert_eq!(status, axum::http::StatusCode::CREATED);

    let (status, first) = call(failing_router, orch_testkit::create_run_request(&owner, &name, 7, "u", "k1", None)).await;
    assert_eq!(status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(first["run"]["failureReason"], "queue_publish_failed");
    let run_id = first["run"]["id"].as_str().unwrap().to_string();

    let queue = Arc::new(InMemoryQueue::new());
    let working_router = orch_testkit::control_plane_router(pool.clone(), queue.clone());
    let (status, second) = call(working_router, orch_testkit::create_run_request(&owner, &name, 7, "u", "k1", None)).await;
    assert_eq!(status, axum::http::StatusCode::ACCEPTED);
    assert_eq!(second["run"]["id"], run_id);
    assert_eq!(second["idempotency"]["requeued"], true);
    assert_eq!(queue.len().await, 1, "exactly one message must land on the working queue");
}

async fn call(router: axum::Router, req: axum::http::Request<axum::body::Body>) -> (axum::http::StatusCode, serde_json::Value) {
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not valid JSON")
    };
    (status, json)
}
