//! # ヘルスチェックハンドラ
//!
//! ロードバランサーやコンテナオーケストレーターからの死活確認に使う。
//!
//! ```text
//! GET /health
//! ```

use axum::Json;
use validflow_shared::HealthResponse;

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}
