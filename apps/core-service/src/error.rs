//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! ドメインエラーは [`ErrorKind`] でステータスコードを決め、
//! [`DomainError::code`] をそのままレスポンスの `code` に使う。

use axum::{
   Json,
   http::StatusCode,
   response::{IntoResponse, Response},
};
use thiserror::Error;
use validflow_domain::{DomainError, ErrorKind};
use validflow_infra::InfraError;
use validflow_shared::{
   ErrorResponse,
   event_log::error::{category, kind},
};

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
   /// リソースが見つからない
   #[error("リソースが見つかりません: {0}")]
   NotFound(String),

   /// 不正なリクエスト
   #[error("不正なリクエスト: {0}")]
   BadRequest(String),

   /// 操作者を識別できない
   #[error("認証されていません: {0}")]
   Unauthorized(String),

   /// 権限不足
   #[error("権限がありません: {0}")]
   Forbidden(String),

   /// 承認プロトコルのルール違反
   #[error(transparent)]
   Domain(#[from] DomainError),

   /// データベースエラー
   #[error("データベースエラー: {0}")]
   Database(#[from] InfraError),

   /// 内部エラー
   #[error("内部エラー: {0}")]
   Internal(String),
}

impl CoreError {
   /// レスポンスの `code` と同じ機械可読コード
   pub fn code(&self) -> &'static str {
      match self {
         CoreError::NotFound(_) => "not_found",
         CoreError::BadRequest(_) => "bad_request",
         CoreError::Unauthorized(_) => "unauthorized",
         CoreError::Forbidden(_) => "not_authorized",
         CoreError::Domain(e) => e.code(),
         CoreError::Database(_) | CoreError::Internal(_) => "internal_error",
      }
   }
}

fn status_for(kind: ErrorKind) -> StatusCode {
   match kind {
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::Authorization => StatusCode::FORBIDDEN,
      ErrorKind::StateConflict => StatusCode::CONFLICT,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
   }
}

impl IntoResponse for CoreError {
   fn into_response(self) -> Response {
      let (status, body) = match &self {
         CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::not_found(msg)),
         CoreError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg)),
         CoreError::Unauthorized(msg) => {
            (StatusCode::UNAUTHORIZED, ErrorResponse::unauthorized(msg))
         }
         CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::not_authorized(msg)),
         CoreError::Domain(e) => (
            status_for(e.kind()),
            ErrorResponse::new(e.code(), e.to_string()),
         ),
         CoreError::Database(e) => {
            tracing::error!(
               error.category = category::INFRASTRUCTURE,
               error.kind = kind::DATABASE,
               "データベースエラー: {}",
               e
            );
            (
               StatusCode::INTERNAL_SERVER_ERROR,
               ErrorResponse::internal_error(),
            )
         }
         CoreError::Internal(msg) => {
            tracing::error!(
               error.category = category::INFRASTRUCTURE,
               error.kind = kind::INTERNAL,
               "内部エラー: {}",
               msg
            );
            (
               StatusCode::INTERNAL_SERVER_ERROR,
               ErrorResponse::internal_error(),
            )
         }
      };

      (status, Json(body)).into_response()
   }
}
