//! # インフラ層エラー定義
//!
//! データベースとのやり取りで発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターン:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別
//!
//! `From` 実装や convenience constructor でエラーを作ると、その時点の
//! スパン情報（どのリポジトリメソッドから来たか）が記録される。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使う:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::Conflict { entity, id } => { /* 競合処理 */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// SQL の実行失敗、接続エラー、制約違反など
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// jsonb カラムの変換失敗
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 楽観的ロック競合（バージョン不一致）
    ///
    /// UPDATE 時に読み込み時のバージョンと DB 上のバージョンが一致しなかった。
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict {
        /// エンティティ名（例: "Request"）
        entity: String,
        id:     String,
    },

    /// 上記に分類できないエラー（保存済みデータがドメインの不変条件を満たさない場合など）
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Conflict の場合、entity と id を返す
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InfraErrorKind::Conflict { entity, id } => Some((entity, id)),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.as_conflict().is_some()
    }

    // ===== Convenience constructors =====

    /// 楽観的ロック競合エラーを生成する
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Conflict {
                entity: entity.into(),
                id:     id.into(),
            },
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Database(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Serialization(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<validflow_domain::DomainError> for InfraError {
    /// 保存済みデータからの復元に失敗した
    fn from(source: validflow_domain::DomainError) -> Self {
        Self::unexpected(format!("保存データが不正です: {source}"))
    }
}
