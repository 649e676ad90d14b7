//! HTTP trigger and read API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/tree/full-update` | Rebuild the mirror from the configured branch (bearer auth) |
//! | `GET`  | `/content/{*path}` | Content record of the node at `path` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "update_failed", "stage": "tree_fetch", "message": "Failed to get tree: ..." } }
//! ```
//!
//! Error codes: `unauthorized` (401), `forbidden` (403), `not_found` (404),
//! `update_failed` (500), `internal` (500).
//!
//! Full updates are serialized: a trigger that arrives while a run is in
//! progress waits for it to finish. Once authorized, a run proceeds to
//! completion or failure even if the client disconnects.
//!
//! `/content` paths are resolved by name from the roots. A listed directory
//! whose parent was never seen is stored as a root, so it can shadow a later
//! root of the same name; the first one persisted wins.

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::auth::{authorize, AuthFailure};
use crate::browse::{content_at, NodeContent};
use crate::config::Config;
use crate::db;
use crate::error::FailureStage;
use crate::ingest::{full_update, TreeSelector, UpdateReport};
use crate::progress::NoProgress;
use crate::remote::{GitHubRemote, RemoteSource};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    remote: Arc<dyn RemoteSource>,
    branch: String,
    fetch_concurrency: usize,
    /// Held for the duration of a full update.
    update_lock: Arc<Mutex<()>>,
}

/// Start the server against the configured SQLite database and GitHub
/// repository. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    crate::migrate::apply(&pool).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    let remote: Arc<dyn RemoteSource> = Arc::new(GitHubRemote::new(&config.remote)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Mirror server listening on http://{}", listener.local_addr()?);
    serve(listener, config, store, remote).await
}

/// Serve on an already-bound listener with the given store and remote.
pub async fn serve(
    listener: tokio::net::TcpListener,
    config: &Config,
    store: Arc<dyn Store>,
    remote: Arc<dyn RemoteSource>,
) -> anyhow::Result<()> {
    let app = router(config, store, remote);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Exposed so callers can embed it in a larger app.
pub fn router(config: &Config, store: Arc<dyn Store>, remote: Arc<dyn RemoteSource>) -> Router {
    let state = AppState {
        store,
        remote,
        branch: config.remote.branch.clone(),
        fetch_concurrency: config.remote.fetch_concurrency,
        update_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tree/full-update", post(handle_full_update))
        .route("/content/{*path}", get(handle_content))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<FailureStage>,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    stage: Option<FailureStage>,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                stage: self.stage,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        stage: None,
        message: message.into(),
    }
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Missing => app_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing bearer token",
            ),
            AuthFailure::Invalid => {
                app_error(StatusCode::FORBIDDEN, "forbidden", "invalid token")
            }
            AuthFailure::Unavailable => app_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "auth key lookup failed",
            ),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /tree/full-update ============

#[derive(Serialize)]
struct UpdateResponse {
    status: String,
    message: String,
    report: UpdateReport,
}

/// Authorize, then run a full update of the configured branch.
///
/// Returns `401` without a bearer token, `403` for an unknown token, and
/// `500` with the failure stage when the run fails.
async fn handle_full_update(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UpdateResponse>, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    authorize(state.store.as_ref(), header).await?;

    // A started run must not be cancelled by a client disconnect.
    let run = tokio::spawn(async move {
        let _guard = state.update_lock.lock().await;
        info!(branch = %state.branch, "full update triggered");
        full_update(
            state.store.as_ref(),
            state.remote.as_ref(),
            &TreeSelector::Branch(state.branch.clone()),
            state.fetch_concurrency,
            &NoProgress,
        )
        .await
    });

    let report = run
        .await
        .map_err(|e| {
            app_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                format!("update task failed: {}", e),
            )
        })?
        .map_err(|e| {
            let stage = e.stage();
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "update_failed".to_string(),
                stage: Some(stage),
                message: format!("{}: {}", stage.summary(), e),
            }
        })?;

    Ok(Json(UpdateResponse {
        status: "ok".to_string(),
        message: "Tree updated successfully".to_string(),
        report,
    }))
}

// ============ GET /content/{*path} ============

async fn handle_content(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<NodeContent>, AppError> {
    content_at(state.store.as_ref(), &path)
        .await
        .map_err(|e| app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()))?
        .map(Json)
        .ok_or_else(|| {
            app_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("no content for path: {}", path),
            )
        })
}
