//! 承認チェーンのスナップショットと決裁履歴

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    employee::UserId,
    value_objects::StepOrder,
    workflow::{ApproverSpec, WorkflowStep},
};

/// 申請時点のワークフローステップの写し
///
/// ワークフロー側を後から編集しても、処理中の申請には影響しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub order:         StepOrder,
    pub approver:      ApproverSpec,
    pub approver_name: String,
    pub timeout_hours: u32,
}

impl From<&WorkflowStep> for ChainStep {
    fn from(step: &WorkflowStep) -> Self {
        Self {
            order:         step.order(),
            approver:      step.approver().clone(),
            approver_name: step.approver_name().to_string(),
            timeout_hours: step.timeout_hours(),
        }
    }
}

/// 決裁の種類
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// 決裁記録（追記のみ、変更しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub step_order:   StepOrder,
    /// 実際に操作したユーザー
    pub actor_id:     UserId,
    /// 委任により代理で決裁した場合の委任元
    pub on_behalf_of: Option<UserId>,
    pub decision:     Decision,
    pub comment:      Option<String>,
    pub decided_at:   DateTime<Utc>,
}
