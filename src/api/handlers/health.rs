use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub ffmpeg: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    // A missing key still proves the backend answered
    let storage = match state.storage.file_exists("health-check").await {
        Ok(_) => "connected",
        Err(_) => "unreachable",
    };

    let ffmpeg = if tool_available(&state.config.ffmpeg_path).await
        && tool_available(&state.config.ffprobe_path).await
    {
        "available"
    } else {
        "missing"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
        storage: storage.to_string(),
        ffmpeg: ffmpeg.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn tool_available(binary: &str) -> bool {
    tokio::process::Command::new(binary)
        .arg("-version")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
