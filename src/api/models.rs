//! Model bundle API handlers
//!
//! GET /api/listModels, GET /api/getAllFiles, POST /api/uploadModel

use axum::{
    extract::{Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::encoder::{self, EncodedFile};
use crate::store::{BundleEntry, BundleStore, StoreError, BUNDLE_SUFFIX};
use crate::AppState;

/// GET /api/listModels response
#[derive(Debug, Serialize)]
pub struct ListModelsResponse {
    pub models: Vec<String>,
}

/// GET /api/getAllFiles query parameters
#[derive(Debug, Deserialize)]
pub struct GetAllFilesParams {
    #[serde(default)]
    pub folder: String,
}

/// POST /api/uploadModel response
#[derive(Debug, Serialize)]
pub struct UploadModelResponse {
    pub status: String,
    pub message: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
}

/// GET /api/listModels
///
/// Lists bundle folders inside the upload root.
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<ListModelsResponse>> {
    let models = state.store.list()?;
    Ok(Json(ListModelsResponse { models }))
}

/// GET /api/getAllFiles?folder=<name>_mtk
///
/// Returns every file in the bundle as base64. Encoding is all-or-nothing;
/// a file system error mid-walk fails the whole request.
pub async fn get_all_files(
    State(state): State<AppState>,
    Query(params): Query<GetAllFilesParams>,
) -> ApiResult<Json<Vec<EncodedFile>>> {
    let folder = params.folder.trim().to_string();
    if folder.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing ?folder=<name>_mtk".to_string(),
        ));
    }

    let bundle_dir = state.store.resolve(&folder, None).map_err(|e| match e {
        StoreError::NotFound(_) | StoreError::InvalidName(_) | StoreError::PathTraversal(_) => {
            ApiError::NotFound(format!("Folder not found: {}", folder))
        }
        StoreError::Io(err) => ApiError::Io(err),
    })?;

    // The walk reads every file; keep it off the async workers
    let files = tokio::task::spawn_blocking(move || encoder::encode_all(&bundle_dir))
        .await
        .map_err(|e| ApiError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(files))
}

/// POST /api/uploadModel
///
/// Persists a pre-converted bundle from a multipart directory upload
/// (repeated `files` fields whose filenames carry bundle-relative paths).
pub async fn upload_model(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadModelResponse>> {
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(file_name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        uploads.push((file_name, bytes.to_vec()));
    }

    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let (model_name, entries) = bundle_from_uploads(uploads);
    let file_count = entries.len();

    let store = state.store.clone();
    let name = model_name.clone();
    tokio::task::spawn_blocking(move || store.create(&name, &entries))
        .await
        .map_err(|e| ApiError::Internal(format!("Task join error: {}", e)))??;

    tracing::info!(model = %model_name, files = file_count, "Model uploaded");

    Ok(Json(UploadModelResponse {
        status: "success".to_string(),
        message: format!("Stored {} file(s)", file_count),
        model_name,
    }))
}

/// Derive the bundle name and bundle-relative entries from upload paths
///
/// Directory uploads send filenames like `barrel_mtk/geom.mtkweb/...`. When
/// the first path segment is a `_mtk` folder it names the bundle and is
/// stripped from every entry underneath it; otherwise the bundle name
/// derives from the first file's name and paths are kept as sent.
fn bundle_from_uploads(uploads: Vec<(String, Vec<u8>)>) -> (String, Vec<BundleEntry>) {
    let first = uploads[0].0.replace('\\', "/");
    let root = first.split('/').next().unwrap_or(&first).to_string();

    let model_name = if root.ends_with(BUNDLE_SUFFIX) && first.contains('/') {
        root
    } else {
        let leaf = first.rsplit('/').next().unwrap_or(&first);
        BundleStore::bundle_name_for(leaf)
    };

    let prefix = format!("{}/", model_name);
    let entries = uploads
        .into_iter()
        .map(|(path, content)| {
            let path = path.replace('\\', "/");
            let relative_path = path
                .strip_prefix(&prefix)
                .map(|p| p.to_string())
                .unwrap_or(path);
            BundleEntry {
                relative_path,
                content,
            }
        })
        .collect();

    (model_name, entries)
}

/// Build model bundle routes
pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/api/listModels", get(list_models))
        .route("/api/getAllFiles", get(get_all_files))
        .route("/api/uploadModel", post(upload_model))
}
