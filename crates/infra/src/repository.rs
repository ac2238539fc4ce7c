//! # リポジトリ
//!
//! ユースケース層が使う永続化トレイトと、その PostgreSQL 実装。
//!
//! - 書き込みメソッドは `&mut TxContext` を必須引数に取る
//! - 申請とワークフローは楽観的ロック（`version`）で更新する
//! - トレイトは `Send + Sync` で、`Arc<dyn _>` としてハンドラ間で共有する

pub mod delegation_repository;
pub mod org_directory;
pub mod request_repository;
pub mod workflow_repository;

pub use delegation_repository::{DelegationRepository, PostgresDelegationRepository};
pub use org_directory::{OrgDirectory, PostgresOrgDirectory};
pub use request_repository::{PostgresRequestRepository, RequestRepository};
pub use workflow_repository::{PostgresValidationWorkflowRepository, ValidationWorkflowRepository};
