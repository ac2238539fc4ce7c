//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `request`: 申請の受付・参照・取り消し
//! - `decision`: 承認・却下と承認待ち一覧
//! - `resolver`: 承認者指定の解決と委任の適用
//! - `workflow`: 承認ワークフローの設定
//! - `delegation`: 承認権限の委任

pub(crate) mod helpers;

pub mod decision;
pub mod delegation;
pub mod request;
pub mod resolver;
pub mod workflow;

pub use decision::{DecisionCommand, DecisionUseCaseImpl, PendingItem};
pub use delegation::{CreateDelegationInput, DelegationUseCaseImpl};
pub use request::{RequestUseCaseImpl, SubmitRequestInput};
pub use resolver::ApproverResolver;
pub use workflow::{WorkflowInput, WorkflowUseCaseImpl};
