//! # エラーレスポンス
//!
//! 全エンドポイント共通の失敗レスポンス `{ "success": false, "error": "...", "code": "..." }`。
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はサービス側の責務
//! - `code` は機械判定用の安定した識別子、`error` は人間向けメッセージ

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
   pub success: bool,
   pub error:   String,
   pub code:    String,
}

impl ErrorResponse {
   /// 汎用コンストラクタ
   ///
   /// ドメイン固有のエラーコード（`step_mismatch` など）はこれで作る。
   pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
      Self {
         success: false,
         error:   error.into(),
         code:    code.into(),
      }
   }

   pub fn bad_request(error: impl Into<String>) -> Self {
      Self::new("bad_request", error)
   }

   pub fn validation_error(error: impl Into<String>) -> Self {
      Self::new("validation_error", error)
   }

   /// 認証情報がない
   pub fn unauthorized(error: impl Into<String>) -> Self {
      Self::new("unauthorized", error)
   }

   pub fn not_authorized(error: impl Into<String>) -> Self {
      Self::new("not_authorized", error)
   }

   pub fn not_found(error: impl Into<String>) -> Self {
      Self::new("not_found", error)
   }

   pub fn conflict(error: impl Into<String>) -> Self {
      Self::new("conflict", error)
   }

   /// 内部エラー
   ///
   /// メッセージは固定値。内部情報はログにのみ出す。
   pub fn internal_error() -> Self {
      Self::new("internal_error", "内部エラーが発生しました")
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn test_newでsuccessがfalseになる() {
      let error = ErrorResponse::new("step_mismatch", "ステップが一致しません");

      assert!(!error.success);
      assert_eq!(error.code, "step_mismatch");
      assert_eq!(error.error, "ステップが一致しません");
   }

   #[test]
   fn test_jsonシリアライズの形状() {
      let json = serde_json::to_value(ErrorResponse::not_found("見つかりません")).unwrap();

      assert_eq!(
         json,
         serde_json::json!({
             "success": false,
             "error": "見つかりません",
             "code": "not_found"
         })
      );
   }

   #[test]
   fn test_便利コンストラクタのコード() {
      assert_eq!(ErrorResponse::bad_request("").code, "bad_request");
      assert_eq!(ErrorResponse::validation_error("").code, "validation_error");
      assert_eq!(ErrorResponse::unauthorized("").code, "unauthorized");
      assert_eq!(ErrorResponse::not_authorized("").code, "not_authorized");
      assert_eq!(ErrorResponse::conflict("").code, "conflict");
      assert_eq!(ErrorResponse::internal_error().code, "internal_error");
   }
}
