//! # ビジネスイベントログ
//!
//! 申請・決裁・委任・設定変更を構造化ログとして出力するためのマクロとフィールド定数。
//!
//! [`log_business_event!`] は `event.kind = "business_event"` を自動付与するので、
//! JSON ログを `jq 'select(.["event.kind"] == "business_event")'` で絞り込める。
//!
//! フィールド名はドット記法（`event.category`、`event.action`）を使う。

/// ビジネスイベントを `info` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: [`event::category`] の定数
/// - `event.action`: [`event::action`] の定数
/// - `event.result`: [`event::result`] の定数
///
/// ## 推奨フィールド
///
/// - `event.entity_type` / `event.entity_id`
/// - `event.actor_id`: 操作者 ID
/// - `event.on_behalf_of`: 代理決裁の場合の委任元
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    pub mod category {
        pub const REQUEST: &str = "request";
        pub const DECISION: &str = "decision";
        pub const DELEGATION: &str = "delegation";
        pub const CONFIGURATION: &str = "configuration";
    }

    pub mod action {
        // 申請
        pub const REQUEST_SUBMITTED: &str = "request.submitted";
        pub const REQUEST_CANCELLED: &str = "request.cancelled";

        // 決裁
        pub const STEP_APPROVED: &str = "step.approved";
        pub const STEP_REJECTED: &str = "step.rejected";

        // 委任
        pub const DELEGATION_CREATED: &str = "delegation.created";
        pub const DELEGATION_CANCELLED: &str = "delegation.cancelled";

        // ワークフロー設定
        pub const WORKFLOW_CREATED: &str = "workflow.created";
        pub const WORKFLOW_UPDATED: &str = "workflow.updated";
        pub const WORKFLOW_TOGGLED: &str = "workflow.toggled";
        pub const WORKFLOW_DELETED: &str = "workflow.deleted";
        pub const STEPS_CHANGED: &str = "workflow.steps_changed";
    }

    pub mod entity_type {
        pub const REQUEST: &str = "request";
        pub const DELEGATION: &str = "delegation";
        pub const VALIDATION_WORKFLOW: &str = "validation_workflow";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!` に `error.category` と `error.kind` を付けて使う。
pub mod error {
    pub mod category {
        /// データベース
        pub const INFRASTRUCTURE: &str = "infrastructure";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const INTERNAL: &str = "internal";
    }
}
