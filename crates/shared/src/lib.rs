//! # ValidFlow 共有ユーティリティ
//!
//! ドメイン・インフラ・サービスの各クレートから使われる共通部品。
//! ビジネスロジックは置かない。

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::HealthResponse;
