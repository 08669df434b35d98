//! Conversion trigger endpoint
//!
//! POST /analyze accepts one CAD file, runs the external converter and
//! analyzer tools against it, and returns their captured text plus the
//! resulting bundle name. Tool failures are embedded in the success body,
//! never surfaced as HTTP errors.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub message: String,
    pub converted_folder: String,
    pub converter_output: String,
    pub feature_recognition: String,
    pub dfm_analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_url: Option<String>,
}

/// POST /analyze
///
/// Accepts the CAD file in a `cad_file` (or legacy `file`) multipart field.
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if !matches!(field.name(), Some("cad_file") | Some("file")) {
            continue;
        }
        let Some(file_name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, content)) = upload else {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    };

    // Keep only the final path component; the stem names the bundle
    let file_name = file_name
        .replace('\\', "/")
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("model")
        .to_string();

    // Stage the source in a per-run scratch directory so the tools see the
    // original file name
    let scratch = std::env::temp_dir().join(format!("mtk_host_{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&scratch).await?;
    let source_path = scratch.join(&file_name);
    tokio::fs::write(&source_path, &content).await?;

    let run = state.orchestrator.convert(&source_path).await;

    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
        tracing::warn!(path = %scratch.display(), error = %e, "Scratch cleanup failed");
    }

    let viewer_url = state.config.viewer_base_url.as_ref().map(|base| {
        format!(
            "{}/?model={}",
            base.trim_end_matches('/'),
            run.model_name
        )
    });

    Ok(Json(AnalyzeResponse {
        status: "success".to_string(),
        message: "Analysis completed".to_string(),
        converted_folder: run.model_name,
        converter_output: run.converter_output,
        feature_recognition: run.feature_recognition,
        dfm_analysis: run.dfm_analysis,
        viewer_url,
    }))
}

/// Build the analyze route
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}
