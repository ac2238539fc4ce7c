//! # ValidFlow ドメイン層
//!
//! 人事申請（休暇・残業・打刻修正・各種書類）の多段階承認プロトコルを
//! 表現するドメインモデルを定義する。
//!
//! ## 構成要素
//!
//! ```text
//! Decision Ledger ← Step Resolver ← Delegation Overlay
//!        ↑
//! Request Submission ← Workflow Configuration
//! ```
//!
//! - [`request`] - 申請エンベロープ、承認チェーンのスナップショット、決裁履歴
//! - [`workflow`] - 承認ワークフロー（テンプレート）とステップ
//! - [`delegation`] - 承認権限の委任と実効承認者の解決
//! - [`employee`] - 組織ディレクトリの読み取りモデル
//! - [`capability`] - 操作単位で評価するケイパビリティ
//! - [`error`] - ドメインエラーと外部向け分類
//!
//! ドメイン層は I/O を持たない。組織ディレクトリの参照や永続化は
//! インフラ層のトレイト越しにユースケース層が行う。
//!
//! ## 使用例
//!
//! ```rust
//! use validflow_domain::{DomainError, ErrorKind};
//!
//! let error = DomainError::CommentRequired;
//! assert_eq!(error.kind(), ErrorKind::Validation);
//! assert_eq!(error.code(), "comment_required");
//! ```

#[macro_use]
mod macros;

pub mod capability;
pub mod clock;
pub mod delegation;
pub mod employee;
pub mod error;
pub mod request;
pub mod value_objects;
pub mod workflow;

pub use error::{DomainError, ErrorKind};
