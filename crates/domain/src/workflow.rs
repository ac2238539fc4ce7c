//! # 承認ワークフロー設定
//!
//! 申請種別ごとの承認テンプレートを定義する。
//!
//! - [`definition`] - ワークフロー集約と適用ワークフローの選択
//! - [`step`] - ステップと承認者指定
//! - [`sequence`] - ステップ順序の並べ替え

pub mod definition;
pub mod sequence;
pub mod step;

pub use definition::{
    NewValidationWorkflow,
    ValidationWorkflow,
    ValidationWorkflowId,
    ValidationWorkflowRecord,
    WorkflowAttributes,
    select_workflow,
};
pub use sequence::{MoveDirection, is_dense};
pub use step::{
    ApproverKind,
    ApproverSpec,
    StepSettings,
    WorkflowStep,
    WorkflowStepId,
    WorkflowStepRecord,
};
