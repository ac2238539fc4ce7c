//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケースに委譲
//! - 操作者は [`Actor`] エクストラクタでヘッダーから取り出す
//! - ボディ・パス・クエリは [`extract`] のラッパーで受け、拒否も共通のエラー形式で返す

pub mod actor;
pub mod delegation;
pub mod extract;
pub mod health;
pub mod request;
pub mod validation;
pub mod workflow;

pub use actor::Actor;
pub use delegation::{DelegationState, cancel_delegation, create_delegation, list_delegations};
pub use health::health_check;
pub use request::{
    RequestDto,
    RequestState,
    cancel_my_request,
    get_my_request,
    list_my_requests,
    submit_administrative_request,
    submit_correction_request,
    submit_leave_request,
    submit_overtime_request,
};
pub use validation::{ValidationState, approve_request, list_pending, reject_request};
pub use workflow::{
    WorkflowState,
    add_step,
    create_workflow,
    delete_step,
    delete_workflow,
    get_workflow,
    list_steps,
    list_workflows,
    move_step,
    toggle_workflow,
    update_step,
    update_workflow,
};
