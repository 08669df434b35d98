//! Raw bundle file serving
//!
//! GET /uploads/<subpath> serves files straight out of the store, with one
//! special case: a final path segment of `process_data.json` does not read a
//! literal file but synthesizes the viewer manifest for the addressed bundle.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::services::manifest;
use crate::store::StoreError;
use crate::AppState;

/// Manifest file name the viewer requests per bundle
const MANIFEST_FILE: &str = "process_data.json";

/// GET /uploads/*subpath
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(subpath): Path<String>,
) -> ApiResult<Response> {
    let subpath = subpath.trim_matches('/').to_string();
    let mut segments = subpath.split('/');
    let bundle = segments.next().unwrap_or("").to_string();
    let inner: Vec<&str> = segments.collect();

    if bundle.is_empty() {
        return Err(not_found(&subpath));
    }

    // Manifest synthesis: the viewer asks for <bundle>/process_data.json,
    // which never exists on disk
    if inner.last() == Some(&MANIFEST_FILE) {
        let manifest =
            manifest::build_manifest(&state.store, &bundle, &state.config.public_base_url)?;
        return Ok(Json(manifest).into_response());
    }

    if inner.is_empty() {
        return Err(not_found(&subpath));
    }

    let inner_path = inner.join("/");
    let full_path = state
        .store
        .resolve(&bundle, Some(&inner_path))
        .map_err(|e| match e {
            // Traversal attempts and unknown names both read as absent
            StoreError::Io(err) => ApiError::Io(err),
            _ => not_found(&subpath),
        })?;

    if !full_path.is_file() {
        return Err(not_found(&subpath));
    }

    let content = tokio::fs::read(&full_path).await?;
    let content_type = content_type_for(&inner_path);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response())
}

fn not_found(subpath: &str) -> ApiError {
    ApiError::NotFound(format!("Not found: {}", subpath))
}

/// Content type by file extension, octet-stream for everything else
/// (including the viewer's binary `.mtkweb` payloads)
fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => "application/json",
        "html" => "text/html",
        "js" => "application/javascript",
        "css" => "text/css",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Build the raw file serving route
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/uploads/*subpath", get(serve_upload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("thumb.png"), "image/png");
        assert_eq!(content_type_for("a/b/data.JSON"), "application/json");
        assert_eq!(
            content_type_for("geom.mtkweb/scenegraph.mtkweb"),
            "application/octet-stream"
        );
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
