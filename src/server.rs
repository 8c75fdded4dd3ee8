//! JSON HTTP API.
//!
//! Serves the same aggregation bundles the CLI prints, one endpoint per
//! screen. Upstream failures never surface as HTTP errors: they show up as
//! fallback values inside a `200` response. The only error a client sees is
//! `404` for an unknown circuit or driver.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (version, insight model) |
//! | `GET` | `/api/dashboard` | Next race, leaders, race analysis |
//! | `GET` | `/api/standings` | Driver and constructor standings |
//! | `GET` | `/api/circuits` | Circuit list |
//! | `GET` | `/api/circuits/{id}` | Circuit gallery bundle |
//! | `GET` | `/api/drivers/{id}` | Driver detail bundle |
//! | `GET` | `/api/tracks/{id}` | Track explorer view |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "circuit not found: monaco" } }
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::aggregate::{
    Aggregator, CircuitGalleryBundle, DashboardBundle, DriverDetailBundle, StandingsBundle,
};
use crate::config::Config;
use crate::models::CircuitRecord;
use crate::views::TrackExplorerView;

#[derive(Clone)]
struct AppState {
    aggregator: Aggregator,
    model: String,
}

/// Build the router. Exposed separately from [`run_server`] so tests can
/// serve it on an ephemeral port.
pub fn router(aggregator: Aggregator, model: impl Into<String>) -> Router {
    let state = AppState {
        aggregator,
        model: model.into(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/dashboard", get(handle_dashboard))
        .route("/api/standings", get(handle_standings))
        .route("/api/circuits", get(handle_circuits))
        .route("/api/circuits/{id}", get(handle_circuit))
        .route("/api/drivers/{id}", get(handle_driver))
        .route("/api/tracks/{id}", get(handle_track))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, aggregator: Aggregator, model: &str) -> anyhow::Result<()> {
    let app = router(aggregator, model);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "paddock API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    insight_model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        insight_model: state.model,
    })
}

async fn handle_dashboard(State(state): State<AppState>) -> Json<DashboardBundle> {
    Json(state.aggregator.dashboard().await)
}

async fn handle_standings(State(state): State<AppState>) -> Json<StandingsBundle> {
    Json(state.aggregator.standings().await)
}

async fn handle_circuits(State(state): State<AppState>) -> Json<Vec<CircuitRecord>> {
    Json(state.aggregator.circuits().await)
}

async fn handle_circuit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CircuitGalleryBundle>, AppError> {
    state
        .aggregator
        .circuit_gallery(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("circuit not found: {}", id)))
}

async fn handle_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DriverDetailBundle>, AppError> {
    let driver = state
        .aggregator
        .find_driver(&id)
        .await
        .ok_or_else(|| not_found(format!("driver not found in current standings: {}", id)))?;
    Ok(Json(state.aggregator.driver_details(driver).await))
}

async fn handle_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrackExplorerView>, AppError> {
    let circuit = state
        .aggregator
        .find_circuit(&id)
        .await
        .ok_or_else(|| not_found(format!("circuit not found: {}", id)))?;
    Ok(Json(state.aggregator.track_explorer(circuit).await))
}
