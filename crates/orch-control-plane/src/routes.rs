//! Axum router and handlers. Bearer auth is attached as a route layer here
//! rather than in `main.rs`, so in-process tests can hit `build_router`
//! directly without standing up a TCP listener.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use axum::extract::Request;
use axum::middleware::Next;
use orch_types::{PrMode, Repo, RunStatus, Station};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api_types::*;
use crate::idempotency::{self, CreateRunInput, CreateRunOutcome};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/repos", post(register_repo).get(list_repos))
        .route("/v1/runs", post(create_run_handler).get(list_runs_handler))
        .route("/v1/runs/:id", get(get_run_handler))
        .route("/v1/runs/:id/stations/:station", get(get_run_station_handler))
        .route("/v1/stats", get(stats_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/healthz", get(health))
        .merge(protected)
        .with_state(state)
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
        unauthorized()
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: state.build.service,
            version: state.build.version,
        }),
    )
}

async fn ping() -> impl IntoResponse {
    (StatusCode::OK, Json(PingResponse { ok: true, message: "pong" }))
}

async fn register_repo(State(state): State<AppState>, Json(body): Json<RegisterRepoRequest>) -> Response {
    let owner = body.owner.trim().to_string();
    let name = body.name.trim().to_string();
    if owner.is_empty() || name.is_empty() {
        return bad_request("owner and name must not be empty");
    }

    let new_repo = orch_types::NewRepo {
        owner,
        name,
        default_branch: body.default_branch,
        config_path: body.config_path,
        enabled: body.enabled,
    };

    match orch_store::repo::register_repo(&state.pool, &new_repo).await {
        Ok(repo) => (StatusCode::CREATED, Json(RegisterRepoResponse { repo: repo.into() })).into_response(),
        Err(orch_store::error::StoreError::UniqueViolation { .. }) => conflict("repo already registered"),
        Err(e) => internal_error(&e),
    }
}

async fn list_repos(State(state): State<AppState>) -> Response {
    match orch_store::repo::list_repos(&state.pool).await {
        Ok(repos) => (
            StatusCode::OK,
            Json(ListReposResponse {
                repos: repos.into_iter().map(Into::into).collect(),
            }),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn create_run_handler(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<CreateRunRequestBody>) -> Response {
    let idempotency_key = match headers.get("Idempotency-Key").and_then(|v| v.to_str().ok()) {
        Some(k) if !k.trim().is_empty() => k.trim().to_string(),
        _ => return bad_request("Idempotency-Key header is required"),
    };
    if body.issue.number <= 0 {
        return bad_request("issue.number must be positive");
    }
    if body.requestor.trim().is_empty() {
        return bad_request("requestor must not be empty");
    }
    if let Some(goal) = &body.goal {
        if goal.trim().is_empty() {
            return bad_request("goal must not be empty when provided");
        }
    }
    let pr_mode = match body.pr_mode.as_deref() {
        None => PrMode::Draft,
        Some(raw) => match PrMode::parse(raw) {
            Some(mode) => mode,
            None => return bad_request("prMode must be \"draft\" or \"ready\""),
        },
    };

    let input = CreateRunInput {
        repo_owner: body.repo.owner.trim().to_string(),
        repo_name: body.repo.name.trim().to_string(),
        issue_number: body.issue.number,
        goal: body.goal.clone(),
        requestor: body.requestor.trim().to_string(),
        pr_mode,
        idempotency_key,
    };

    match idempotency::create_run(&state.pool, &state.queue, input).await {
        CreateRunOutcome::Created { run, claim } => {
            run_response(&state.pool, StatusCode::ACCEPTED, run, claim, false, false).await
        }
        CreateRunOutcome::ReplayedSucceeded { run, claim } => {
            run_response(&state.pool, StatusCode::OK, run, claim, true, false).await
        }
        CreateRunOutcome::ReplayedPending { run, claim } => {
            run_response(&state.pool, StatusCode::ACCEPTED, run, claim, true, false).await
        }
        CreateRunOutcome::Requeued { run, claim } => {
            run_response(&state.pool, StatusCode::ACCEPTED, run, claim, true, true).await
        }
        CreateRunOutcome::EnqueueFailed { run, claim } => {
            run_response(&state.pool, StatusCode::SERVICE_UNAVAILABLE, run, claim, false, false).await
        }
        CreateRunOutcome::KeyConflict => conflict("idempotency key reused with a different submission payload"),
        CreateRunOutcome::RepoNotFound => bad_request("repo is not registered or is disabled"),
        CreateRunOutcome::Internal(msg) => internal_error(&msg),
    }
}

async fn run_response(
    pool: &PgPool,
    status: StatusCode,
    run: orch_types::Run,
    claim: orch_types::IdempotencyClaim,
    replayed: bool,
    requeued: bool,
) -> Response {
    let repo = fetch_repo_or_unknown(pool, run.repo_id).await;
    (
        status,
        Json(CreateRunResponse {
            run: RunView::new(run, &repo),
            idempotency: IdempotencyView {
                key: claim.key,
                status: claim.status.as_str().to_string(),
                replayed,
                requeued,
            },
        }),
    )
        .into_response()
}

async fn list_runs_handler(State(state): State<AppState>, Query(q): Query<ListRunsQuery>) -> Response {
    let limit = q.limit.unwrap_or(50);
    if !(1..=100).contains(&limit) {
        return bad_request("limit must be between 1 and 100");
    }

    let status = match q.status.as_deref() {
        None => None,
        Some(raw) => match RunStatus::parse(raw) {
            Some(s) => Some(s),
            None => return bad_request("invalid status filter"),
        },
    };

    let repo_id = match &q.repo {
        None => None,
        Some(slug) => match slug.split_once('/') {
            Some((owner, name)) => match orch_store::repo::get_repo_by_slug(&state.pool, owner, name).await {
                Ok(Some(repo)) => Some(repo.id),
                Ok(None) => return (StatusCode::OK, Json(ListRunsResponse { runs: vec![] })).into_response(),
                Err(e) => return internal_error(&e),
            },
            None => return bad_request("repo filter must be formatted as owner/name"),
        },
    };

    let runs = match orch_store::run::list_runs(&state.pool, orch_store::run::ListRunsFilter { status, repo_id, limit }).await {
        Ok(runs) => runs,
        Err(e) => return internal_error(&e),
    };

    let mut views = Vec::with_capacity(runs.len());
    for run in runs {
        let repo = fetch_repo_or_unknown(&state.pool, run.repo_id).await;
        views.push(RunView::new(run, &repo));
    }
    (StatusCode::OK, Json(ListRunsResponse { runs: views })).into_response()
}

async fn get_run_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let run = match orch_store::run::get_run(&state.pool, id).await {
        Ok(Some(run)) => run,
        Ok(None) => return not_found(),
        Err(e) => return internal_error(&e),
    };
    let repo = fetch_repo_or_unknown(&state.pool, run.repo_id).await;

    let stations = match orch_store::station::list_station_executions_for_run(&state.pool, id).await {
        Ok(s) => s,
        Err(e) => return internal_error(&e),
    };
    let artifacts = match orch_store::artifact::list_artifacts_for_run(&state.pool, id).await {
        Ok(a) => a,
        Err(e) => return internal_error(&e),
    };

    (
        StatusCode::OK,
        Json(GetRunResponse {
            run: RunView::new(run, &repo),
            stations: stations.into_iter().map(Into::into).collect(),
            artifacts: artifacts.into_iter().map(Into::into).collect(),
        }),
    )
        .into_response()
}

/// Supplemental read, narrower than `GET /v1/runs/:id` for callers polling a
/// single station rather than the whole projection.
async fn get_run_station_handler(State(state): State<AppState>, Path((id, station)): Path<(Uuid, String)>) -> Response {
    let station = match Station::parse(&station) {
        Some(s) => s,
        None => return not_found(),
    };
    match orch_store::station::get_station_execution(&state.pool, id, station).await {
        Ok(Some(exec)) => (StatusCode::OK, Json(StationExecutionView::from(exec))).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(&e),
    }
}

/// Supplemental read: a rollup of run counts by status, useful for an
/// operator dashboard without paging through `GET /v1/runs`.
async fn stats_handler(State(state): State<AppState>) -> Response {
    match orch_store::run::count_by_status(&state.pool).await {
        Ok(counts) => {
            let mut stats = StatsResponse {
                queued: 0,
                running: 0,
                succeeded: 0,
                failed: 0,
                canceled: 0,
            };
            for c in counts {
                match c.status {
                    RunStatus::Queued => stats.queued = c.count,
                    RunStatus::Running => stats.running = c.count,
                    RunStatus::Succeeded => stats.succeeded = c.count,
                    RunStatus::Failed => stats.failed = c.count,
                    RunStatus::Canceled => stats.canceled = c.count,
                }
            }
            (StatusCode::OK, Json(stats)).into_response()
        }
        Err(e) => internal_error(&e),
    }
}

async fn fetch_repo_or_unknown(pool: &PgPool, repo_id: Uuid) -> Repo {
    orch_store::repo::get_repo_by_id(pool, repo_id).await.unwrap_or_else(|_| {
        let now = chrono::Utc::now();
        Repo {
            id: repo_id,
            owner: "unknown".to_string(),
            name: "unknown".to_string(),
            default_branch: orch_types::DEFAULT_BRANCH.to_string(),
            config_path: None,
            enabled: false,
            created_at: now,
            updated_at: now,
        }
    })
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg))).into_response()
}

fn conflict(msg: &str) -> Response {
    (StatusCode::CONFLICT, Json(ErrorResponse::new(msg))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("not found"))).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new("Unauthorized"))).into_response()
}

fn internal_error(err: &impl std::fmt::Display) -> Response {
    tracing::error!(error = %err, "control_plane.internal_error");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new("internal error"))).into_response()
}
