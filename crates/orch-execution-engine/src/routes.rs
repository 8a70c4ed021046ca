//! Axum router for the execution engine. The only route besides health is
//! `/__queue/consume`, the synthetic "inject a queue delivery" endpoint that
//! stands in for an external transport's push/pull wiring in local and test
//! deployments — the engine itself never polls a real queue over HTTP.

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use orch_types::{DeliveryOutcome, RunQueueMessage};
use serde::Serialize;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/__queue/consume", post(consume_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new().route("/healthz", get(health)).merge(protected).with_state(state)
}

async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.bearer_secret);
    let ok = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if ok {
        next.run(req).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(ErrorBody { error: "Unauthorized".to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: state.build.service,
        }),
    )
}

#[derive(Serialize)]
struct ConsumeResponse {
    ok: bool,
    outcome: &'static str,
}

/// Takes the raw body rather than `Json<RunQueueMessage>` so a structurally
/// invalid message (missing/typed-wrong field) is acked and dropped here,
/// per spec, instead of axum's `Json` extractor rejecting it with a 422
/// before this handler ever runs.
async fn consume_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let message: RunQueueMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            tracing::info!(error = %err, "queue.message.invalid");
            return (StatusCode::ACCEPTED, Json(ConsumeResponse { ok: true, outcome: "ack" }));
        }
    };

    let outcome = orch_engine::handle_message(&state.pool, state.adapter.as_ref(), &message).await;
    match outcome {
        DeliveryOutcome::Ack => (StatusCode::ACCEPTED, Json(ConsumeResponse { ok: true, outcome: "ack" })),
        DeliveryOutcome::Retry => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ConsumeResponse { ok: false, outcome: "retry" }),
        ),
    }
}
