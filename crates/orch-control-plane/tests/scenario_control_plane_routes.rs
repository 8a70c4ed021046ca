//! In-process scenario tests for the control-plane HTTP endpoints.
//!
//! Requests are driven through `tower::ServiceExt::oneshot` directly against
//! `routes::build_router` — no TCP socket, no separate process. Tests that
//! exercise `/v1/repos` or `/v1/runs` need a real Postgres instance (they
//! skip with a message when `ORCH_DATABASE_URL` isn't set, since this crate
//! carries no embedded database).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use orch_control_plane::{routes, state::AppState};
use orch_queue::{FailingQueue, InMemoryQueue, Queue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

const BEARER: &str = "test-secret";

async fn connect_test_pool() -> Option<PgPool> {
    match std::env::var(orch_store::ENV_DB_URL) {
        Ok(url) => {
            let pool = orch_store::connect(&url).await.expect("connect to test database");
            orch_store::migrate(&pool).await.expect("migrate test database");
            Some(pool)
        }
        Err(_) => None,
    }
}

fn router_with_queue(pool: PgPool, queue: Arc<dyn Queue>) -> axum::Router {
    routes::build_router(AppState::new(pool, queue, BEARER))
}

fn router(pool: PgPool) -> axum::Router {
    router_with_queue(pool, Arc::new(InMemoryQueue::new()))
}

async fn call(router: axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
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

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {BEARER}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {BEARER}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_requires_no_auth() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let req = Request::builder().method("GET").uri("/healthz").body(Body::empty()).unwrap();
    let (status, json) = call(router(pool), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn protected_route_without_bearer_is_401() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let req = Request::builder().method("GET").uri("/v1/ping").body(Body::empty()).unwrap();
    let (status, json) = call(router(pool), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn ping_with_bearer_returns_pong() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (status, json) = call(router(pool), get("/v1/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "pong");
}

fn unique_slug(prefix: &str) -> (String, String) {
    (format!("{prefix}-owner-{}", Uuid::new_v4()), format!("{prefix}-repo-{}", Uuid::new_v4()))
}

#[tokio::test]
async fn register_repo_then_duplicate_is_409() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (owner, name) = unique_slug("dup");
    let body = serde_json::json!({"owner": owner, "name": name});

    let (status, _) = call(router(pool.clone()), post_json("/v1/repos", body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = call(router(pool), post_json("/v1/repos", body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already registered"));
}

#[tokio::test]
async fn create_run_happy_path_reaches_queued_and_enqueues() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (owner, name) = unique_slug("happy");
    call(router(pool.clone()), post_json("/v1/repos", serde_json::json!({"owner": owner, "name": name}))).await;

    let queue = Arc::new(InMemoryQueue::new());
    let submit = Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("Authorization", format!("Bearer {BEARER}"))
        .header("content-type", "application/json")
        .header("Idempotency-Key", "key-happy-1")
        .body(Body::from(
            serde_json::json!({
                "repo": {"owner": owner, "name": name},
                "issue": {"number": 42},
                "requestor": "alice",
            })
            .to_string(),
        ))
        .unwrap();

    let (status, json) = call(router_with_queue(pool, queue.clone()), submit).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["run"]["status"], "queued");
    assert_eq!(json["idempotency"]["replayed"], false);
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn create_run_replay_with_same_key_and_body_is_200_or_202() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (owner, name) = unique_slug("replay");
    call(router(pool.clone()), post_json("/v1/repos", serde_json::json!({"owner": owner, "name": name}))).await;

    let payload = serde_json::json!({
        "repo": {"owner": owner, "name": name},
        "issue": {"number": 7},
        "requestor": "bob",
    });

    let mk_request = || {
        Request::builder()
            .method("POST")
            .uri("/v1/runs")
            .header("Authorization", format!("Bearer {BEARER}"))
            .header("content-type", "application/json")
            .header("Idempotency-Key", "key-replay-1")
            .body(Body::from(payload.to_string()))
            .unwrap()
    };

    let (status1, json1) = call(router(pool.clone()), mk_request()).await;
    assert_eq!(status1, StatusCode::ACCEPTED);
    let run_id_first = json1["run"]["id"].clone();

    let (status2, json2) = call(router(pool), mk_request()).await;
    assert!(status2 == StatusCode::OK || status2 == StatusCode::ACCEPTED);
    assert_eq!(json2["run"]["id"], run_id_first, "replay must return the same run");
    assert_eq!(json2["idempotency"]["replayed"], true);
}

#[tokio::test]
async fn create_run_same_key_different_payload_is_409() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (owner, name) = unique_slug("conflict");
    call(router(pool.clone()), post_json("/v1/repos", serde_json::json!({"owner": owner, "name": name}))).await;

    let first = Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("Authorization", format!("Bearer {BEARER}"))
        .header("content-type", "application/json")
        .header("Idempotency-Key", "key-conflict-1")
        .body(Body::from(
            serde_json::json!({"repo": {"owner": owner, "name": name}, "issue": {"number": 1}, "requestor": "a"}).to_string(),
        ))
        .unwrap();
    let (status, _) = call(router(pool.clone()), first).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let second = Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("Authorization", format!("Bearer {BEARER}"))
        .header("content-type", "application/json")
        .header("Idempotency-Key", "key-conflict-1")
        .body(Body::from(
            serde_json::json!({"repo": {"owner": owner, "name": name}, "issue": {"number": 2}, "requestor": "a"}).to_string(),
        ))
        .unwrap();
    let (status, json) = call(router(pool), second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("different"));
}

#[tokio::test]
async fn create_run_enqueue_failure_then_retry_recovers() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (owner, name) = unique_slug("retry");
    call(router(pool.clone()), post_json("/v1/repos", serde_json::json!({"owner": owner, "name": name}))).await;

    let payload = serde_json::json!({
        "repo": {"owner": owner, "name": name},
        "issue": {"number": 99},
        "requestor": "carol",
    });

    let failing = Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("Authorization", format!("Bearer {BEARER}"))
        .header("content-type", "application/json")
        .header("Idempotency-Key", "key-retry-1")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let failing_router = router_with_queue(pool.clone(), Arc::new(FailingQueue));
    let (status, json) = call(failing_router, failing).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["run"]["status"], "queued");
    assert_eq!(json["run"]["failureReason"], "queue_publish_failed");

    let queue = Arc::new(InMemoryQueue::new());
    let retry = Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("Authorization", format!("Bearer {BEARER}"))
        .header("content-type", "application/json")
        .header("Idempotency-Key", "key-retry-1")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, json) = call(router_with_queue(pool, queue.clone()), retry).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["idempotency"]["requeued"], true);
    assert_eq!(json["run"]["failureReason"], serde_json::Value::Null);
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn list_runs_rejects_limit_over_100() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (status, _) = call(router(pool), get("/v1/runs?limit=500")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_run_missing_is_404() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (status, _) = call(router(pool), get(&format!("/v1/runs/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let Some(pool) = connect_test_pool().await else {
        eprintln!("SKIP: ORCH_DATABASE_URL not set");
        return;
    };
    let (status, _) = call(router(pool), get("/v1/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
