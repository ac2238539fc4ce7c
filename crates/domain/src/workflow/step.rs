//! # ワークフローステップ
//!
//! ワークフローの各承認段階と、その承認者指定を定義する。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, employee::UserId, value_objects::StepOrder};

define_uuid_id! {
    /// ワークフローステップ ID
    pub struct WorkflowStepId;
}

/// 承認者の指定方法
///
/// 具体的な承認者は申請ごとに組織ディレクトリから解決する。
///
/// | 種別 | 解決結果 |
/// |------|---------|
/// | `user` | 指定されたユーザー |
/// | `role` | ロール保持者全員 |
/// | `manager` | 申請者の直属の上長 |
/// | `hr` | 人事承認者グループ |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApproverSpec {
    User { user_id: UserId },
    Role { role: String },
    Manager,
    Hr,
}

/// 承認者指定の種別（DB の `approver_type` 列）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApproverKind {
    User,
    Role,
    Manager,
    Hr,
}

impl std::str::FromStr for ApproverKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "role" => Ok(Self::Role),
            "manager" => Ok(Self::Manager),
            "hr" => Ok(Self::Hr),
            _ => Err(DomainError::Validation(format!("不正な承認者種別: {}", s))),
        }
    }
}

impl ApproverSpec {
    pub fn kind(&self) -> ApproverKind {
        match self {
            Self::User { .. } => ApproverKind::User,
            Self::Role { .. } => ApproverKind::Role,
            Self::Manager => ApproverKind::Manager,
            Self::Hr => ApproverKind::Hr,
        }
    }

    /// `approver_value` 列に格納する値
    pub fn value(&self) -> Option<String> {
        match self {
            Self::User { user_id } => Some(user_id.to_string()),
            Self::Role { role } => Some(role.clone()),
            Self::Manager | Self::Hr => None,
        }
    }

    /// 種別と値から復元する
    pub fn from_parts(kind: ApproverKind, value: Option<&str>) -> Result<Self, DomainError> {
        let spec = match kind {
            ApproverKind::User => {
                let raw = value.ok_or_else(|| {
                    DomainError::Validation("user 指定にはユーザー ID が必要です".to_string())
                })?;
                let uuid = uuid::Uuid::parse_str(raw)
                    .map_err(|_| DomainError::Validation(format!("不正なユーザー ID: {}", raw)))?;
                Self::User {
                    user_id: UserId::from_uuid(uuid),
                }
            }
            ApproverKind::Role => Self::Role {
                role: value.unwrap_or_default().to_string(),
            },
            ApproverKind::Manager => Self::Manager,
            ApproverKind::Hr => Self::Hr,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Role { role } if role.trim().is_empty() => Err(DomainError::Validation(
                "role 指定にはロール名が必要です".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// ワークフローステップ
///
/// # 不変条件
///
/// - `order` はワークフロー内で一意（1..N の連番）
/// - `timeout_hours` は 1 以上
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    id:            WorkflowStepId,
    order:         StepOrder,
    approver:      ApproverSpec,
    approver_name: String,
    timeout_hours: u32,
}

/// ステップの追加・更新パラメータ
#[derive(Debug, Clone)]
pub struct StepSettings {
    pub approver:      ApproverSpec,
    pub approver_name: String,
    pub timeout_hours: u32,
}

impl StepSettings {
    fn validate(&self) -> Result<(), DomainError> {
        self.approver.validate()?;
        if self.approver_name.trim().is_empty() {
            return Err(DomainError::Validation("承認者の表示名は必須です".to_string()));
        }
        if self.timeout_hours == 0 {
            return Err(DomainError::Validation(
                "タイムアウトは 1 時間以上である必要があります".to_string(),
            ));
        }
        Ok(())
    }
}

/// DB 復元パラメータ
pub struct WorkflowStepRecord {
    pub id:            WorkflowStepId,
    pub order:         StepOrder,
    pub approver:      ApproverSpec,
    pub approver_name: String,
    pub timeout_hours: u32,
}

impl WorkflowStep {
    pub(crate) fn new(
        id: WorkflowStepId,
        order: StepOrder,
        settings: StepSettings,
    ) -> Result<Self, DomainError> {
        settings.validate()?;
        Ok(Self {
            id,
            order,
            approver: settings.approver,
            approver_name: settings.approver_name.trim().to_string(),
            timeout_hours: settings.timeout_hours,
        })
    }

    pub fn from_db(record: WorkflowStepRecord) -> Result<Self, DomainError> {
        Self::new(
            record.id,
            record.order,
            StepSettings {
                approver:      record.approver,
                approver_name: record.approver_name,
                timeout_hours: record.timeout_hours,
            },
        )
    }

    pub fn id(&self) -> &WorkflowStepId {
        &self.id
    }

    pub fn order(&self) -> StepOrder {
        self.order
    }

    pub fn approver(&self) -> &ApproverSpec {
        &self.approver
    }

    pub fn approver_name(&self) -> &str {
        &self.approver_name
    }

    pub fn timeout_hours(&self) -> u32 {
        self.timeout_hours
    }

    pub(crate) fn with_order(self, order: StepOrder) -> Self {
        Self { order, ..self }
    }

    pub(crate) fn with_settings(self, settings: StepSettings) -> Result<Self, DomainError> {
        Self::new(self.id, self.order, settings)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_承認者指定はtypeタグ付きでシリアライズされる() {
        let json = serde_json::to_value(ApproverSpec::Role {
            role: "payroll".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "role", "role": "payroll"}));

        let spec: ApproverSpec = serde_json::from_value(serde_json::json!({"type": "hr"})).unwrap();
        assert_eq!(spec, ApproverSpec::Hr);
    }

    #[rstest]
    #[case(ApproverSpec::Manager)]
    #[case(ApproverSpec::Hr)]
    #[case(ApproverSpec::Role { role: "finance".to_string() })]
    #[case(ApproverSpec::User { user_id: UserId::new() })]
    fn test_種別と値から復元できる(#[case] spec: ApproverSpec) {
        let restored = ApproverSpec::from_parts(spec.kind(), spec.value().as_deref()).unwrap();
        assert_eq!(restored, spec);
    }

    #[test]
    fn test_ロール名が空のrole指定は不正() {
        assert!(ApproverSpec::from_parts(ApproverKind::Role, Some("  ")).is_err());
        assert!(ApproverSpec::from_parts(ApproverKind::User, Some("not-a-uuid")).is_err());
    }

    #[rstest]
    #[case(0, "上長")]
    #[case(24, "   ")]
    fn test_不正なステップ設定(#[case] timeout_hours: u32, #[case] name: &str) {
        let result = WorkflowStep::new(
            WorkflowStepId::new(),
            StepOrder::first(),
            StepSettings {
                approver: ApproverSpec::Manager,
                approver_name: name.to_string(),
                timeout_hours,
            },
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
