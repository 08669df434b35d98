//! Health, landing, and build information endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Build information response
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

/// GET /health
///
/// Plain-text liveness check.
pub async fn health_check() -> &'static str {
    "ok"
}

/// GET /
pub async fn landing() -> &'static str {
    "MTK model host is running. Try /api/listModels"
}

/// GET /build_info
///
/// Returns build identification captured by build.rs.
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        module: "mtk-host".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

/// Build health and landing routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/health", get(health_check))
        .route("/build_info", get(get_build_info))
}
