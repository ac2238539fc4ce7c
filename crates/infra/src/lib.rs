//! # ValidFlow インフラ層
//!
//! PostgreSQL との接続と、ユースケース層が使うリポジトリトレイトの実装を提供する。
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層に依存しない。
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プール、マイグレーション、トランザクション
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリトレイトと PostgreSQL 実装
//! - `mock` - インメモリ実装（`test-utils` feature）
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use validflow_infra::{db, repository::PostgresRequestRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/validflow").await?;
//!     db::run_migrations(&pool).await?;
//!     let requests = PostgresRequestRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
