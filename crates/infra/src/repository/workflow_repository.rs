//! # ValidationWorkflowRepository
//!
//! 承認ワークフロー（ステップを含む集約）の永続化を担当する。
//!
//! - ステップはワークフローと同じトランザクションで丸ごと置き換える
//! - 更新はバージョン一致時のみ成功する

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use sqlx::PgPool;
use uuid::Uuid;
use validflow_domain::{
    request::RequestType,
    value_objects::{StepOrder, Version, WorkflowName},
    workflow::{
        ApproverKind,
        ApproverSpec,
        ValidationWorkflow,
        ValidationWorkflowId,
        ValidationWorkflowRecord,
        WorkflowStep,
        WorkflowStepId,
        WorkflowStepRecord,
    },
};

use crate::{db::TxContext, error::InfraError};

/// 承認ワークフローリポジトリトレイト
#[async_trait]
pub trait ValidationWorkflowRepository: Send + Sync {
    async fn insert(
        &self,
        tx: &mut TxContext,
        workflow: &ValidationWorkflow,
    ) -> Result<(), InfraError>;

    /// バージョンチェック付きで更新する（ステップも置き換える）
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: DB 上のバージョンが `expected_version` と異なる
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        workflow: &ValidationWorkflow,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &ValidationWorkflowId)
    -> Result<(), InfraError>;

    async fn find_by_id(
        &self,
        id: &ValidationWorkflowId,
    ) -> Result<Option<ValidationWorkflow>, InfraError>;

    /// 全件を作成日時順で取得する
    async fn find_all(&self) -> Result<Vec<ValidationWorkflow>, InfraError>;

    /// 指定した申請種別をトリガーに持つ有効なワークフローを取得する
    async fn find_active_by_trigger(
        &self,
        request_type: RequestType,
    ) -> Result<Vec<ValidationWorkflow>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct WorkflowRow {
    id:           Uuid,
    name:         String,
    description:  Option<String>,
    trigger_type: String,
    segment:      Option<String>,
    active:       bool,
    version:      i32,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id:             Uuid,
    workflow_id:    Uuid,
    step_order:     i32,
    approver_type:  String,
    approver_value: Option<String>,
    approver_name:  String,
    timeout_hours:  i32,
}

impl TryFrom<StepRow> for WorkflowStep {
    type Error = InfraError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        let kind = row.approver_type.parse::<ApproverKind>()?;
        Ok(WorkflowStep::from_db(WorkflowStepRecord {
            id:            WorkflowStepId::from_uuid(row.id),
            order:         StepOrder::try_from(row.step_order)?,
            approver:      ApproverSpec::from_parts(kind, row.approver_value.as_deref())?,
            approver_name: row.approver_name,
            timeout_hours: u32::try_from(row.timeout_hours)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
        })?)
    }
}

fn into_workflow(row: WorkflowRow, steps: Vec<StepRow>) -> Result<ValidationWorkflow, InfraError> {
    let steps = steps
        .into_iter()
        .map(WorkflowStep::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidationWorkflow::from_db(ValidationWorkflowRecord {
        id: ValidationWorkflowId::from_uuid(row.id),
        name: WorkflowName::new(row.name)?,
        description: row.description,
        trigger: row.trigger_type.parse::<RequestType>()?,
        segment: row.segment,
        active: row.active,
        steps,
        version: Version::try_from(row.version)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })?)
}

const SELECT_WORKFLOWS: &str = r#"
    SELECT id, name, description, trigger_type, segment, active, version, created_at, updated_at
    FROM validation_workflows
"#;

/// PostgreSQL 実装の ValidationWorkflowRepository
#[derive(Debug, Clone)]
pub struct PostgresValidationWorkflowRepository {
    pool: PgPool,
}

impl PostgresValidationWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ワークフロー行にステップを付けて集約に組み立てる
    async fn assemble(&self, rows: Vec<WorkflowRow>) -> Result<Vec<ValidationWorkflow>, InfraError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let step_rows = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT id, workflow_id, step_order, approver_type, approver_value,
                   approver_name, timeout_hours
            FROM workflow_steps
            WHERE workflow_id = ANY($1)
            ORDER BY workflow_id, step_order
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut steps_by_workflow: HashMap<Uuid, Vec<StepRow>> =
            step_rows.into_iter().into_group_map_by(|s| s.workflow_id);

        rows.into_iter()
            .map(|row| {
                let steps = steps_by_workflow.remove(&row.id).unwrap_or_default();
                into_workflow(row, steps)
            })
            .collect()
    }

    async fn insert_steps(
        conn: &mut sqlx::PgConnection,
        workflow: &ValidationWorkflow,
    ) -> Result<(), InfraError> {
        for step in workflow.steps() {
            sqlx::query(
                r#"
                INSERT INTO workflow_steps (
                    id, workflow_id, step_order, approver_type, approver_value,
                    approver_name, timeout_hours
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(step.id().as_uuid())
            .bind(workflow.id().as_uuid())
            .bind(step.order().as_i32())
            .bind(<&'static str>::from(step.approver().kind()))
            .bind(step.approver().value())
            .bind(step.approver_name())
            .bind(i32::try_from(step.timeout_hours()).unwrap_or(i32::MAX))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ValidationWorkflowRepository for PostgresValidationWorkflowRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %workflow.id()))]
    async fn insert(
        &self,
        tx: &mut TxContext,
        workflow: &ValidationWorkflow,
    ) -> Result<(), InfraError> {
        let conn = tx.conn()?;
        sqlx::query(
            r#"
            INSERT INTO validation_workflows (
                id, name, description, trigger_type, segment, active, version,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(workflow.id().as_uuid())
        .bind(workflow.name().as_str())
        .bind(workflow.description())
        .bind(workflow.trigger().as_str())
        .bind(workflow.segment())
        .bind(workflow.is_active())
        .bind(workflow.version().as_i32())
        .bind(workflow.created_at())
        .bind(workflow.updated_at())
        .execute(&mut *conn)
        .await?;

        Self::insert_steps(conn, workflow).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %workflow.id()))]
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        workflow: &ValidationWorkflow,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let conn = tx.conn()?;
        let result = sqlx::query(
            r#"
            UPDATE validation_workflows SET
                name = $2,
                description = $3,
                trigger_type = $4,
                segment = $5,
                active = $6,
                version = $7,
                updated_at = $8
            WHERE id = $1 AND version = $9
            "#,
        )
        .bind(workflow.id().as_uuid())
        .bind(workflow.name().as_str())
        .bind(workflow.description())
        .bind(workflow.trigger().as_str())
        .bind(workflow.segment())
        .bind(workflow.is_active())
        .bind(workflow.version().as_i32())
        .bind(workflow.updated_at())
        .bind(expected_version.as_i32())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "ValidationWorkflow",
                workflow.id().to_string(),
            ));
        }

        sqlx::query("DELETE FROM workflow_steps WHERE workflow_id = $1")
            .bind(workflow.id().as_uuid())
            .execute(&mut *conn)
            .await?;
        Self::insert_steps(conn, workflow).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %id))]
    async fn delete(
        &self,
        tx: &mut TxContext,
        id: &ValidationWorkflowId,
    ) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM validation_workflows WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn()?)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %id))]
    async fn find_by_id(
        &self,
        id: &ValidationWorkflowId,
    ) -> Result<Option<ValidationWorkflow>, InfraError> {
        let row = sqlx::query_as::<_, WorkflowRow>(&format!("{SELECT_WORKFLOWS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<ValidationWorkflow>, InfraError> {
        let rows =
            sqlx::query_as::<_, WorkflowRow>(&format!("{SELECT_WORKFLOWS} ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await?;
        self.assemble(rows).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(request_type = %request_type))]
    async fn find_active_by_trigger(
        &self,
        request_type: RequestType,
    ) -> Result<Vec<ValidationWorkflow>, InfraError> {
        let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
            "{SELECT_WORKFLOWS} WHERE trigger_type = $1 AND active ORDER BY created_at"
        ))
        .bind(request_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.assemble(rows).await
    }
}
