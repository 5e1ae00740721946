//! tollbooth-server
//!
//! HTTP surface for the Tollbooth run lifecycle.
//!
//! # モジュール構成
//! - **config**: clap による引数・環境変数
//! - **error**: RunError → HTTP 応答
//! - **routes**: axum の handler（RunService を呼ぶだけ）

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tollbooth_core::app::RunService;

/// multipart の境界やヘッダ分の余裕
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RunService>,
}

/// すべてのルートを組み立てる
pub fn router(service: Arc<RunService>) -> Router {
    let max_upload = usize::try_from(service.catalog().max_upload_bytes()).unwrap_or(usize::MAX);
    let body_limit = max_upload.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/tools", get(routes::list_tools))
        .route("/api/preview/:tool_slug", post(routes::preview))
        .route("/api/unlock", post(routes::unlock))
        .route("/api/process/:tool_slug", post(routes::process))
        .route("/api/run/:run_id", get(routes::run_status))
        .route("/download/:run_id", get(routes::download))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { service })
}
