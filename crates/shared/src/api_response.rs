//! # API レスポンスエンベロープ
//!
//! 成功レスポンスの統一形式 `{ "success": true, "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 成功レスポンス
///
/// すべてのエンドポイントは成功時にこの形式で返す。
/// 失敗時の形式は [`ErrorResponse`](crate::ErrorResponse) を参照。
///
/// ## 使用例
///
/// ```
/// use validflow_shared::ApiResponse;
///
/// let response = ApiResponse::new("hello");
/// assert!(response.success);
/// assert_eq!(response.data, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data:    T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
