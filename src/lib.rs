//! mtk-host library interface
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use crate::config::Config;
use crate::services::orchestrator::ConversionOrchestrator;
use crate::services::tools::{ProcessToolRunner, ToolRunner};
use crate::store::{BundleStore, StoreError};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration
    pub config: Arc<Config>,
    /// Bundle store rooted at the upload directory
    pub store: BundleStore,
    /// Conversion orchestrator for /analyze
    pub orchestrator: Arc<ConversionOrchestrator>,
}

impl AppState {
    /// Create state with the real subprocess tool runner
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let runner = Arc::new(ProcessToolRunner::new(Duration::from_secs(
            config.tools.tool_timeout_secs,
        )));
        Self::with_runner(config, runner)
    }

    /// Create state with an injected tool runner (tests substitute a fake)
    pub fn with_runner(config: Config, runner: Arc<dyn ToolRunner>) -> Result<Self, StoreError> {
        let store = BundleStore::new(&config.upload_root)?;
        let orchestrator = Arc::new(ConversionOrchestrator::new(
            store.clone(),
            config.tools.clone(),
            runner,
        ));
        Ok(Self {
            config: Arc::new(config),
            store,
            orchestrator,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::model_routes())
        .merge(api::analyze_routes())
        .merge(api::upload_routes())
        .with_state(state)
        // CAD uploads are large; the limit applies to multipart bodies too
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // The viewer front-end is served from a different origin
        .layer(CorsLayer::permissive())
}
