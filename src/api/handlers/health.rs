use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

pub const LIVENESS_MESSAGE: &str = "✅ Servidor activo y listo para recibir CSV.";

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub scratch_dir: String,
    pub drive_folder: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server is up", body = String)
    ),
    tag = "system"
)]
pub async fn index() -> &'static str {
    LIVENESS_MESSAGE
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let scratch_status = match tokio::fs::metadata(state.upload_service.scratch_dir()).await {
        Ok(meta) if meta.is_dir() => "ready",
        _ => "missing",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        scratch_dir: scratch_status.to_string(),
        drive_folder: state.upload_service.sync_service().folder_id().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
