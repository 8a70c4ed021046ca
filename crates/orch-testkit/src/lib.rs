//! Composes the control plane and execution engine into one in-process
//! harness for end-to-end scenario tests.
//!
//! Both HTTP surfaces are exercised in-process via `tower::ServiceExt`
//! (no TCP listener), and the queue between them is drained explicitly by
//! the caller rather than by a background task, so a test controls exactly
//! how many deliveries happen.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use orch_coderunner::{CoderunnerAdapter, MockCoderunnerAdapter};
use orch_queue::{InMemoryQueue, Queue};
use orch_types::{DeliveryOutcome, RunQueueMessage};
use sqlx::PgPool;
use tower::ServiceExt;

pub const CONTROL_PLANE_BEARER: &str = "testkit-control-plane-secret";
pub const EXECUTION_ENGINE_BEARER: &str = "testkit-execution-engine-secret";

/// Builds a control-plane router over any [`Queue`] implementation, so a
/// scenario that needs a `FailingQueue` doesn't have to go through the full
/// [`Harness`].
pub fn control_plane_router(pool: PgPool, queue: Arc<dyn Queue>) -> axum::Router {
    orch_control_plane::build_router(orch_control_plane::AppState::new(pool, queue, CONTROL_PLANE_BEARER))
}

pub fn execution_engine_router(pool: PgPool, adapter: Arc<dyn CoderunnerAdapter>) -> axum::Router {
    orch_execution_engine::build_router(orch_execution_engine::AppState::new(pool, adapter, EXECUTION_ENGINE_BEARER))
}

/// One composed environment: a shared Postgres pool, an in-memory queue, and
/// in-process routers for both HTTP services. Neither router binds a socket;
/// every request goes through `tower::ServiceExt::oneshot`.
pub struct Harness {
    pub pool: PgPool,
    pub queue: Arc<InMemoryQueue>,
    control_plane: axum::Router,
    execution_engine: axum::Router,
}

impl Harness {
    /// A harness wired to the deterministic mock adapter, sufficient for
    /// every scenario except the non-terminal-external-job one.
    pub fn new(pool: PgPool) -> Self {
        Self::with_adapter(pool, Arc::new(MockCoderunnerAdapter::new()))
    }

    pub fn with_adapter(pool: PgPool, adapter: Arc<dyn CoderunnerAdapter>) -> Self {
        let queue: Arc<InMemoryQueue> = Arc::new(InMemoryQueue::new());

        Self {
            control_plane: control_plane_router(pool.clone(), queue.clone()),
            execution_engine: execution_engine_router(pool.clone(), adapter),
            pool,
            queue,
        }
    }

    /// Sends a request into the control plane router and returns the parsed
    /// JSON body alongside the status code.
    pub async fn call_control_plane(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        call(self.control_plane.clone(), req).await
    }

    /// Directly delivers one `RunQueueMessage` to the execution engine's
    /// `/__queue/consume` endpoint, bypassing `self.queue` — useful when a
    /// scenario needs to construct a message by hand (e.g. the stale-resume
    /// scenario, which never goes through `POST /v1/runs`).
    pub async fn deliver(&self, message: &RunQueueMessage) -> DeliveryOutcome {
        let req = Request::builder()
            .method("POST")
            .uri("/__queue/consume")
            .header("Authorization", format!("Bearer {EXECUTION_ENGINE_BEARER}"))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(message).unwrap()))
            .unwrap();
        let (_, json) = call(self.execution_engine.clone(), req).await;
        match json["outcome"].as_str() {
            Some("retry") => DeliveryOutcome::Retry,
            _ => DeliveryOutcome::Ack,
        }
    }

    /// Pops every message currently on the queue and delivers it to the
    /// execution engine, requeuing on `Retry`, until the queue drains or
    /// `max_rounds` deliveries have happened (a safety bound for tests whose
    /// adapter never reaches a terminal outcome).
    pub async fn drain_queue(&self, max_rounds: usize) {
        let mut rounds = 0;
        while let Some(message) = self.queue.pop().await {
            rounds += 1;
            if rounds > max_rounds {
                self.queue.requeue(message).await;
                break;
            }
            if self.deliver(&message).await == DeliveryOutcome::Retry {
                self.queue.requeue(message).await;
            }
        }
    }
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

/// Builds a `POST /v1/repos` request body for the control plane.
pub fn register_repo_request(owner: &str, name: &str) -> Request<Body> {
    let body = serde_json::json!({"owner": owner, "name": name});
    Request::builder()
        .method("POST")
        .uri("/v1/repos")
        .header("Authorization", format!("Bearer {CONTROL_PLANE_BEARER}"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Builds a `POST /v1/runs` request with the given idempotency key.
pub fn create_run_request(owner: &str, name: &str, issue: i64, requestor: &str, idempotency_key: &str, goal: Option<&str>) -> Request<Body> {
    let body = serde_json::json!({
        "repo": {"owner": owner, "name": name},
        "issue": {"number": issue},
        "requestor": requestor,
        "goal": goal,
    });
    Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("Authorization", format!("Bearer {CONTROL_PLANE_BEARER}"))
        .header("Idempotency-Key", idempotency_key)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_run_request(run_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/v1/runs/{run_id}"))
        .header("Authorization", format!("Bearer {CONTROL_PLANE_BEARER}"))
        .body(Body::empty())
        .unwrap()
}
