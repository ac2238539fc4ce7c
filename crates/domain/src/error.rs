//! # ドメイン層エラー定義
//!
//! 承認プロトコルのルール違反を表現するエラー型。
//!
//! ## エラーの種類と外部向け分類
//!
//! | エラー種別 | 分類 | HTTP ステータス |
//! |-----------|------|----------------|
//! | `Validation` / `CommentRequired` / `InvalidRange` / `OverlappingDelegation` / `NoWorkflowConfigured` | [`ErrorKind::Validation`] | 400 |
//! | `Forbidden` | [`ErrorKind::Authorization`] | 403 |
//! | `StepMismatch` / `InvalidState` / `WorkflowInUse` / `Conflict` | [`ErrorKind::StateConflict`] | 409 |
//! | `NotFound` | [`ErrorKind::NotFound`] | 404 |
//!
//! 分類は [`DomainError::kind`]、機械可読なコードは [`DomainError::code`] で取得する。
//!
//! ```rust
//! use validflow_domain::{DomainError, ErrorKind};
//!
//! fn validate_comment(comment: Option<&str>) -> Result<(), DomainError> {
//!     match comment.map(str::trim) {
//!         Some(c) if !c.is_empty() => Ok(()),
//!         _ => Err(DomainError::CommentRequired),
//!     }
//! }
//!
//! let err = validate_comment(Some("  ")).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// API 層でこのエラーを受け取り、[`ErrorKind`] に応じた HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Request", "ValidationWorkflow" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー（楽観的ロック失敗など）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// 実効承認者でない、申請者本人でない、ケイパビリティ不足など。
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 指定されたステップが現在の承認レベルと一致しない
    ///
    /// 並行決裁で先を越された場合もこのエラーになる。
    #[error("承認ステップが一致しません: {0}")]
    StepMismatch(String),

    /// 却下にはコメントが必須
    #[error("却下にはコメントが必要です")]
    CommentRequired,

    /// 現在の状態では実行できない操作
    #[error("現在の状態では実行できません: {0}")]
    InvalidState(String),

    /// 申請種別に一致する有効なワークフローがない
    #[error("有効なワークフローが設定されていません: {0}")]
    NoWorkflowConfigured(String),

    /// 同じ委任元・範囲・期間で有効な委任が既に存在する
    #[error("委任期間が重複しています: {0}")]
    OverlappingDelegation(String),

    /// 開始日が終了日より後
    #[error("期間が不正です: {0}")]
    InvalidRange(String),

    /// 処理中の申請が参照しているワークフローは削除できない
    #[error("ワークフローは使用中です: {0}")]
    WorkflowInUse(String),
}

/// 外部向けのエラー分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    StateConflict,
    NotFound,
}

impl DomainError {
    /// 外部向けの分類を返す
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::CommentRequired
            | Self::NoWorkflowConfigured(_)
            | Self::OverlappingDelegation(_)
            | Self::InvalidRange(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::Conflict(_)
            | Self::StepMismatch(_)
            | Self::InvalidState(_)
            | Self::WorkflowInUse(_) => ErrorKind::StateConflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// 機械可読なエラーコードを返す
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "not_authorized",
            Self::StepMismatch(_) => "step_mismatch",
            Self::CommentRequired => "comment_required",
            Self::InvalidState(_) => "invalid_state",
            Self::NoWorkflowConfigured(_) => "no_workflow_configured",
            Self::OverlappingDelegation(_) => "overlapping_delegation",
            Self::InvalidRange(_) => "invalid_range",
            Self::WorkflowInUse(_) => "workflow_in_use",
        }
    }
}
