//! HTTP API integration tests
//!
//! Drives the full router through tower's oneshot against a temporary
//! upload root and a fake tool runner.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use mtk_host::config::{Config, ToolsConfig};
use mtk_host::services::tools::{ToolCommand, ToolError, ToolOutput, ToolRunner};
use mtk_host::store::BundleEntry;
use mtk_host::{build_router, AppState};

/// Converter stand-in: writes the scene tree the real tool would produce
struct FakeRunner;

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(
        &self,
        tool: &ToolCommand,
        _source: &Path,
        target: &Path,
    ) -> Result<ToolOutput, ToolError> {
        match tool.command.as_str() {
            "fake-converter" => {
                let scene = target.join("geom.mtkweb");
                std::fs::create_dir_all(&scene).unwrap();
                std::fs::write(scene.join("scenegraph.mtkweb"), b"scene").unwrap();
                Ok(ToolOutput {
                    stdout: "conversion complete\n".to_string(),
                    stderr: String::new(),
                    exit_code: Some(0),
                })
            }
            other => Ok(ToolOutput {
                stdout: format!("{} ok\n", other),
                stderr: String::new(),
                exit_code: Some(0),
            }),
        }
    }
}

fn test_config(upload_root: &Path) -> Config {
    Config {
        upload_root: upload_root.to_path_buf(),
        bind_addr: "127.0.0.1:0".to_string(),
        public_base_url: "http://localhost:5000".to_string(),
        viewer_base_url: Some("http://viewer.example".to_string()),
        max_upload_bytes: 10 * 1024 * 1024,
        tools: ToolsConfig {
            converter: Some(ToolCommand {
                command: "fake-converter".to_string(),
                args: vec![],
            }),
            feature_recognizer: None,
            dfm_analyzer: None,
            tool_timeout_secs: 5,
        },
    }
}

/// Create a test app over a fresh temporary upload root
fn test_app(dir: &TempDir) -> (axum::Router, AppState) {
    let state = AppState::with_runner(test_config(dir.path()), Arc::new(FakeRunner))
        .expect("store init");
    (build_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Build a multipart/form-data body by hand
fn multipart_body(parts: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "mtkhost-test-boundary";
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                boundary, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (
        format!("multipart/form-data; boundary={}", boundary),
        body,
    )
}

#[tokio::test]
async fn health_returns_plain_ok() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn landing_page_mentions_list_models() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/api/listModels"));
}

#[tokio::test]
async fn build_info_reports_version() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/build_info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["module"], "mtk-host");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn list_models_empty_store() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/listModels")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "models": [] }));
}

#[tokio::test]
async fn upload_then_list_then_bulk_fetch_round_trip() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    // Upload a two-file bundle as a directory upload
    let (content_type, body) = multipart_body(&[
        ("files", "part_mtk/a.txt", b"x"),
        ("files", "part_mtk/sub/b.txt", b"y"),
    ]);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/uploadModel")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["modelName"], "part_mtk");

    // It shows up in the listing
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/listModels")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "models": ["part_mtk"] })
    );

    // Bulk fetch returns both files, base64-encoded, bundle-relative
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/getAllFiles?folder=part_mtk")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let files = body_json(response).await;
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["relativePath"], "a.txt");
    assert_eq!(files[0]["name"], "a.txt");
    assert_eq!(files[0]["buffer"], "eA=="); // "x"
    assert_eq!(files[1]["relativePath"], "sub/b.txt");
    assert_eq!(files[1]["buffer"], "eQ=="); // "y"
}

#[tokio::test]
async fn get_all_files_requires_folder_param() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/getAllFiles")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn get_all_files_unknown_folder_is_404() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/getAllFiles?folder=ghost_mtk")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let (content_type, body) = multipart_body(&[("unrelated", "x.txt", b"x")]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/uploadModel")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyze_without_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let (content_type, body) = multipart_body(&[]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/analyze")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyze_runs_tools_and_reports_bundle() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);

    let (content_type, body) = multipart_body(&[("cad_file", "barrel.step", b"solid")]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/analyze")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["converted_folder"], "barrel_mtk");
    assert_eq!(json["converter_output"], "conversion complete\n");
    // Unconfigured stages report inline, never as HTTP failures
    assert!(json["feature_recognition"]
        .as_str()
        .unwrap()
        .contains("not configured"));
    assert!(json["dfm_analysis"]
        .as_str()
        .unwrap()
        .contains("not configured"));
    assert_eq!(json["viewer_url"], "http://viewer.example/?model=barrel_mtk");

    // The fake converter's side effect landed in the store
    assert!(state
        .store
        .resolve("barrel_mtk", Some("geom.mtkweb/scenegraph.mtkweb"))
        .is_ok());
}

#[tokio::test]
async fn uploads_serves_raw_bundle_files() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);
    state
        .store
        .create(
            "part_mtk",
            &[BundleEntry {
                relative_path: "thumb.png".to_string(),
                content: b"not-really-a-png".to_vec(),
            }],
        )
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/uploads/part_mtk/thumb.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(body_string(response).await, "not-really-a-png");

    // Unknown file inside a known bundle
    let response = app
        .oneshot(
            Request::builder()
                .uri("/uploads/part_mtk/missing.bin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn process_data_json_synthesizes_manifest() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);
    state
        .store
        .create(
            "part_mtk",
            &[BundleEntry {
                relative_path: "geom.mtkweb/scenegraph.mtkweb".to_string(),
                content: b"scene".to_vec(),
            }],
        )
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/uploads/part_mtk/process_data.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["version"], "1");
    assert_eq!(json["parts"][0]["partId"], "part");
    assert_eq!(json["parts"][0]["files"][0]["type"], "mtkweb");
    assert_eq!(
        json["parts"][0]["files"][0]["path"],
        "http://localhost:5000/uploads/part_mtk/geom.mtkweb/scenegraph.mtkweb"
    );
}

#[tokio::test]
async fn manifest_without_scene_folder_is_404() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);
    state
        .store
        .create(
            "part_mtk",
            &[BundleEntry {
                relative_path: "readme.txt".to_string(),
                content: b"no scene".to_vec(),
            }],
        )
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/uploads/part_mtk/process_data.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
