use crate::api::schemas::health::{DetailedHealth, ReadinessResponse};
use crate::api::{AppState, MgmtState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Service information.
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health_service.status())
}

/// Service information plus a non-sensitive summary of the delivery configuration.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(DetailedHealth { status: state.health_service.status(), config: state.health_service.config_status() })
}

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe: checks that submissions can be recorded.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let (status_code, storage) = match state.health_service.check_storage().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, component = "storage", "Readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "error")
        }
    };

    let response = ReadinessResponse { status: storage.to_string(), storage: storage.to_string() };

    (status_code, Json(response))
}
