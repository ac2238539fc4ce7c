//! # Core Service ライブラリ
//!
//! 承認ワークフローのユースケースとハンドラを公開する。
//! 統合テストからモックを注入してルーターを組み立てられるよう、
//! [`app::build_app`] もここから公開する。

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
