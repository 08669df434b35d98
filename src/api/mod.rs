//! HTTP API handlers for mtk-host

pub mod analyze;
pub mod health;
pub mod models;
pub mod uploads;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use models::model_routes;
pub use uploads::upload_routes;
