//! # 承認ワークフロー設定ユースケース
//!
//! ワークフローの CRUD、有効/無効の切り替え、ステップの追加・更新・移動・削除を実装する。
//!
//! - 同じ (申請種別, セグメント) で有効なワークフローは 1 つまで
//! - ステップ順序の振り直しは 1 トランザクションで保存する
//! - 処理中の申請が参照しているワークフローは削除できない

use std::sync::Arc;

use validflow_domain::{
    DomainError,
    clock::Clock,
    request::RequestType,
    value_objects::{Version, WorkflowName},
    workflow::{
        MoveDirection,
        NewValidationWorkflow,
        StepSettings,
        ValidationWorkflow,
        ValidationWorkflowId,
        WorkflowAttributes,
        WorkflowStepId,
    },
};
use validflow_infra::{
    InfraError,
    db::TransactionManager,
    repository::{RequestRepository, ValidationWorkflowRepository},
};
use validflow_shared::{event_log::event, log_business_event};

use super::helpers::FindResultExt;
use crate::error::CoreError;

/// ワークフローの作成・更新入力
pub struct WorkflowInput {
    pub name:        String,
    pub description: Option<String>,
    pub trigger:     RequestType,
    pub segment:     Option<String>,
}

/// 承認ワークフロー設定ユースケース
pub struct WorkflowUseCaseImpl {
    workflow_repo: Arc<dyn ValidationWorkflowRepository>,
    request_repo:  Arc<dyn RequestRepository>,
    tx_manager:    Arc<dyn TransactionManager>,
    clock:         Arc<dyn Clock>,
}

fn version_conflict(e: InfraError) -> CoreError {
    if e.is_conflict() {
        CoreError::from(DomainError::Conflict(
            "ワークフローは他の操作で更新されています。最新の情報を取得してください".to_string(),
        ))
    } else {
        CoreError::from(e)
    }
}

impl WorkflowUseCaseImpl {
    pub fn new(
        workflow_repo: Arc<dyn ValidationWorkflowRepository>,
        request_repo: Arc<dyn RequestRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            workflow_repo,
            request_repo,
            tx_manager,
            clock,
        }
    }

    pub async fn list(&self) -> Result<Vec<ValidationWorkflow>, CoreError> {
        Ok(self.workflow_repo.find_all().await?)
    }

    pub async fn get(&self, id: &ValidationWorkflowId) -> Result<ValidationWorkflow, CoreError> {
        self.workflow_repo
            .find_by_id(id)
            .await
            .or_not_found("ワークフロー")
    }

    /// 新規作成（有効な状態で作成する）
    pub async fn create(&self, input: WorkflowInput) -> Result<ValidationWorkflow, CoreError> {
        let workflow = ValidationWorkflow::new(NewValidationWorkflow {
            id:          ValidationWorkflowId::new(),
            name:        WorkflowName::new(input.name)?,
            description: input.description,
            trigger:     input.trigger,
            segment:     input.segment,
            active:      true,
            now:         self.clock.now(),
        });
        self.ensure_no_active_conflict(&workflow).await?;

        let mut tx = self.tx_manager.begin().await?;
        self.workflow_repo.insert(&mut tx, &workflow).await?;
        tx.commit().await?;

        log_change(&workflow, event::action::WORKFLOW_CREATED);
        Ok(workflow)
    }

    /// 基本情報の更新
    pub async fn update(
        &self,
        id: &ValidationWorkflowId,
        input: WorkflowInput,
    ) -> Result<ValidationWorkflow, CoreError> {
        let name = WorkflowName::new(input.name)?;
        let current = self.get(id).await?;
        let expected_version = current.version();
        let updated = current.updated(
            WorkflowAttributes {
                name,
                description: input.description,
                trigger: input.trigger,
                segment: input.segment,
            },
            self.clock.now(),
        );
        self.ensure_no_active_conflict(&updated).await?;

        self.save(&updated, expected_version).await?;
        log_change(&updated, event::action::WORKFLOW_UPDATED);
        Ok(updated)
    }

    /// 有効/無効の切り替え
    ///
    /// 処理中の申請は申請時のチェーンで進むため影響を受けない。
    pub async fn toggle(&self, id: &ValidationWorkflowId) -> Result<ValidationWorkflow, CoreError> {
        let current = self.get(id).await?;
        let expected_version = current.version();
        let toggled = current.toggled(self.clock.now());
        self.ensure_no_active_conflict(&toggled).await?;

        self.save(&toggled, expected_version).await?;
        log_change(&toggled, event::action::WORKFLOW_TOGGLED);
        Ok(toggled)
    }

    /// 削除
    ///
    /// 処理中の申請の件数確認は削除のトランザクションの外で行う。確認と削除の間に
    /// 提出された申請は削除後も残り、`requests.workflow_id` は外部キーを持たないため
    /// 存在しないワークフローを指す。その申請は提出時のチェーンのスナップショットで
    /// 決裁を続けられる。
    ///
    /// # Errors
    ///
    /// - `WorkflowInUse`: 終端状態でない申請が参照している
    pub async fn delete(&self, id: &ValidationWorkflowId) -> Result<(), CoreError> {
        let workflow = self.get(id).await?;
        let open = self.request_repo.count_open_by_workflow(id).await?;
        if open > 0 {
            return Err(DomainError::WorkflowInUse(format!(
                "処理中の申請が {} 件あります",
                open
            ))
            .into());
        }

        let mut tx = self.tx_manager.begin().await?;
        self.workflow_repo.delete(&mut tx, id).await?;
        tx.commit().await?;

        log_change(&workflow, event::action::WORKFLOW_DELETED);
        Ok(())
    }

    /// 末尾にステップを追加する
    pub async fn add_step(
        &self,
        id: &ValidationWorkflowId,
        settings: StepSettings,
    ) -> Result<ValidationWorkflow, CoreError> {
        let current = self.get(id).await?;
        let expected_version = current.version();
        let changed = current.with_step_added(WorkflowStepId::new(), settings, self.clock.now())?;
        self.save_steps(&changed, expected_version).await
    }

    pub async fn update_step(
        &self,
        id: &ValidationWorkflowId,
        step_id: &WorkflowStepId,
        settings: StepSettings,
    ) -> Result<ValidationWorkflow, CoreError> {
        let current = self.get(id).await?;
        let expected_version = current.version();
        let changed = current.with_step_updated(step_id, settings, self.clock.now())?;
        self.save_steps(&changed, expected_version).await
    }

    /// 隣のステップと入れ替える（先頭の上移動・末尾の下移動は検証エラー）
    pub async fn move_step(
        &self,
        id: &ValidationWorkflowId,
        step_id: &WorkflowStepId,
        direction: MoveDirection,
    ) -> Result<ValidationWorkflow, CoreError> {
        let current = self.get(id).await?;
        let expected_version = current.version();
        let changed = current.with_step_moved(step_id, direction, self.clock.now())?;
        self.save_steps(&changed, expected_version).await
    }

    /// ステップを削除し、後続を繰り上げる
    pub async fn delete_step(
        &self,
        id: &ValidationWorkflowId,
        step_id: &WorkflowStepId,
    ) -> Result<ValidationWorkflow, CoreError> {
        let current = self.get(id).await?;
        let expected_version = current.version();
        let changed = current.with_step_removed(step_id, self.clock.now())?;
        self.save_steps(&changed, expected_version).await
    }

    async fn ensure_no_active_conflict(
        &self,
        workflow: &ValidationWorkflow,
    ) -> Result<(), CoreError> {
        if !workflow.is_active() {
            return Ok(());
        }
        let active = self
            .workflow_repo
            .find_active_by_trigger(workflow.trigger())
            .await?;
        if active.iter().any(|other| workflow.conflicts_with(other)) {
            return Err(DomainError::Conflict(format!(
                "申請種別 {} とセグメント {} の有効なワークフローが既にあります",
                workflow.trigger(),
                workflow.segment().unwrap_or("(全体)")
            ))
            .into());
        }
        Ok(())
    }

    async fn save(
        &self,
        workflow: &ValidationWorkflow,
        expected_version: Version,
    ) -> Result<(), CoreError> {
        let mut tx = self.tx_manager.begin().await?;
        self.workflow_repo
            .update_with_version_check(&mut tx, workflow, expected_version)
            .await
            .map_err(version_conflict)?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_steps(
        &self,
        workflow: &ValidationWorkflow,
        expected_version: Version,
    ) -> Result<ValidationWorkflow, CoreError> {
        self.save(workflow, expected_version).await?;
        log_change(workflow, event::action::STEPS_CHANGED);
        Ok(workflow.clone())
    }
}

fn log_change(workflow: &ValidationWorkflow, action: &str) {
    log_business_event!(
        event.category = event::category::CONFIGURATION,
        event.action = action,
        event.entity_type = event::entity_type::VALIDATION_WORKFLOW,
        event.entity_id = %workflow.id(),
        event.trigger = %workflow.trigger(),
        event.active = workflow.is_active(),
        event.steps = workflow.steps().len(),
        event.result = event::result::SUCCESS,
        "ワークフロー設定を変更しました"
    );
}
