//! # 承認ワークフロー
//!
//! 申請種別ごとの承認ステップ列（テンプレート）を管理する。
//! ステップの追加・削除・移動はこの集約を通して行い、順序の連番を保つ。

use chrono::{DateTime, Utc};

use super::{
    MoveDirection,
    StepSettings,
    WorkflowStep,
    WorkflowStepId,
    sequence::{self, is_dense},
};
use crate::{
    DomainError,
    request::{ChainStep, RequestType},
    value_objects::{StepOrder, Version, WorkflowName},
};

define_uuid_id! {
    /// 承認ワークフロー ID
    pub struct ValidationWorkflowId;
}

/// 承認ワークフロー
///
/// # 不変条件
///
/// - `steps` の順序は 1..N の密な連番
/// - 有効なワークフローは (申請種別, セグメント) ごとに高々 1 件
///   （集約をまたぐため、ユースケース層で [`conflicts_with`](Self::conflicts_with) を使って検証する）
///
/// 無効化しても、既に申請済みの案件には影響しない（案件はチェーンのスナップショットを持つ）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWorkflow {
    id:          ValidationWorkflowId,
    name:        WorkflowName,
    description: Option<String>,
    trigger:     RequestType,
    segment:     Option<String>,
    active:      bool,
    steps:       Vec<WorkflowStep>,
    version:     Version,
    created_at:  DateTime<Utc>,
    updated_at:  DateTime<Utc>,
}

/// 新規作成パラメータ
pub struct NewValidationWorkflow {
    pub id:          ValidationWorkflowId,
    pub name:        WorkflowName,
    pub description: Option<String>,
    pub trigger:     RequestType,
    pub segment:     Option<String>,
    pub active:      bool,
    pub now:         DateTime<Utc>,
}

/// 基本情報の更新パラメータ
pub struct WorkflowAttributes {
    pub name:        WorkflowName,
    pub description: Option<String>,
    pub trigger:     RequestType,
    pub segment:     Option<String>,
}

/// DB 復元パラメータ
pub struct ValidationWorkflowRecord {
    pub id:          ValidationWorkflowId,
    pub name:        WorkflowName,
    pub description: Option<String>,
    pub trigger:     RequestType,
    pub segment:     Option<String>,
    pub active:      bool,
    pub steps:       Vec<WorkflowStep>,
    pub version:     Version,
    pub created_at:  DateTime<Utc>,
    pub updated_at:  DateTime<Utc>,
}

/// 空文字列のセグメントは「全体」として扱う
fn normalize_segment(segment: Option<String>) -> Option<String> {
    segment
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

impl ValidationWorkflow {
    pub fn new(params: NewValidationWorkflow) -> Self {
        Self {
            id:          params.id,
            name:        params.name,
            description: normalize_description(params.description),
            trigger:     params.trigger,
            segment:     normalize_segment(params.segment),
            active:      params.active,
            steps:       Vec::new(),
            version:     Version::initial(),
            created_at:  params.now,
            updated_at:  params.now,
        }
    }

    /// 既存のデータから復元する
    ///
    /// ステップは順序で並べ替えた上で、連番になっているかを検証する。
    pub fn from_db(record: ValidationWorkflowRecord) -> Result<Self, DomainError> {
        let mut steps = record.steps;
        steps.sort_by_key(|s| s.order());
        if !is_dense(&steps) {
            return Err(DomainError::Validation(format!(
                "ワークフロー {} のステップ順序が連番ではありません",
                record.id
            )));
        }

        Ok(Self {
            id: record.id,
            name: record.name,
            description: record.description,
            trigger: record.trigger,
            segment: normalize_segment(record.segment),
            active: record.active,
            steps,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &ValidationWorkflowId {
        &self.id
    }

    pub fn name(&self) -> &WorkflowName {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn trigger(&self) -> RequestType {
        self.trigger
    }

    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step(&self, id: &WorkflowStepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 同じ (申請種別, セグメント) で同時に有効になれない相手か
    pub fn conflicts_with(&self, other: &ValidationWorkflow) -> bool {
        self.id != other.id
            && self.active
            && other.active
            && self.trigger == other.trigger
            && self.segment == other.segment
    }

    /// 申請時に写し取る承認チェーン
    pub fn chain_snapshot(&self) -> Vec<ChainStep> {
        self.steps.iter().map(ChainStep::from).collect()
    }

    fn touched(self, steps: Vec<WorkflowStep>, now: DateTime<Utc>) -> Self {
        Self {
            steps,
            version: self.version.next(),
            updated_at: now,
            ..self
        }
    }

    /// 基本情報を更新する
    pub fn updated(self, attrs: WorkflowAttributes, now: DateTime<Utc>) -> Self {
        Self {
            name: attrs.name,
            description: normalize_description(attrs.description),
            trigger: attrs.trigger,
            segment: normalize_segment(attrs.segment),
            version: self.version.next(),
            updated_at: now,
            ..self
        }
    }

    /// 有効/無効を切り替える
    pub fn toggled(self, now: DateTime<Utc>) -> Self {
        Self {
            active: !self.active,
            version: self.version.next(),
            updated_at: now,
            ..self
        }
    }

    /// 末尾（N+1 番目）にステップを追加する
    pub fn with_step_added(
        self,
        id: WorkflowStepId,
        settings: StepSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let order = StepOrder::from_index(self.steps.len());
        let step = WorkflowStep::new(id, order, settings)?;
        let mut steps = self.steps.clone();
        steps.push(step);
        Ok(self.touched(steps, now))
    }

    /// ステップの承認者・タイムアウトを変更する（順序は変わらない）
    pub fn with_step_updated(
        self,
        id: &WorkflowStepId,
        settings: StepSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let steps = self
            .steps
            .iter()
            .cloned()
            .map(|s| {
                if s.id() == id {
                    s.with_settings(settings.clone())
                } else {
                    Ok(s)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if self.step(id).is_none() {
            return Err(DomainError::NotFound {
                entity_type: "WorkflowStep",
                id:          id.to_string(),
            });
        }
        Ok(self.touched(steps, now))
    }

    /// ステップを隣と入れ替える
    pub fn with_step_moved(
        self,
        id: &WorkflowStepId,
        direction: MoveDirection,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let steps = sequence::move_step(self.steps.clone(), id, direction)?;
        Ok(self.touched(steps, now))
    }

    /// ステップを削除し、後続の順序を繰り上げる
    pub fn with_step_removed(
        self,
        id: &WorkflowStepId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let steps = sequence::remove_step(self.steps.clone(), id)?;
        Ok(self.touched(steps, now))
    }
}

/// 申請に適用するワークフローを選ぶ
///
/// 有効かつ申請種別が一致するもののうち、申請者の所属部署をセグメントに持つものを優先し、
/// なければセグメント指定のないものを使う。
pub fn select_workflow<'a>(
    workflows: &'a [ValidationWorkflow],
    request_type: RequestType,
    department: Option<&str>,
) -> Option<&'a ValidationWorkflow> {
    let candidates = move || {
        workflows
            .iter()
            .filter(move |w| w.is_active() && w.trigger() == request_type)
    };

    department
        .and_then(|dept| candidates().find(|w| w.segment() == Some(dept)))
        .or_else(|| candidates().find(|w| w.segment().is_none()))
}
