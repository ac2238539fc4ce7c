//! # 承認ワークフロー設定 API ハンドラ
//!
//! すべてのエンドポイントで `workflow:manage` を要求する。
//!
//! | メソッド | パス | 操作 |
//! |----------|------|------|
//! | GET / POST | `/hr/validation/workflows` | 一覧 / 作成 |
//! | GET / PUT / DELETE | `/hr/validation/workflows/{id}` | 取得 / 更新 / 削除 |
//! | POST | `/hr/validation/workflows/{id}/toggle` | 有効/無効の切り替え |
//! | GET / POST | `/hr/validation/workflows/{id}/steps` | ステップ一覧 / 追加 |
//! | PUT / DELETE | `/hr/validation/workflows/{id}/steps/{step_id}` | ステップ更新 / 削除 |
//! | POST | `/hr/validation/workflows/{id}/steps/{step_id}/move` | ステップの移動 |

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validflow_domain::{
    capability::Capability,
    request::RequestType,
    workflow::{
        ApproverSpec,
        MoveDirection,
        StepSettings,
        ValidationWorkflow,
        ValidationWorkflowId,
        WorkflowStep,
        WorkflowStepId,
    },
};
use validflow_shared::ApiResponse;

use super::{
    Actor,
    extract::{ApiJson, ApiPath},
};
use crate::{
    error::CoreError,
    usecase::{WorkflowInput, WorkflowUseCaseImpl},
};

/// ワークフロー設定 API の共有状態
pub struct WorkflowState {
    pub usecase: WorkflowUseCaseImpl,
}

/// ワークフローの作成・更新リクエスト
#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    pub name:        String,
    pub description: Option<String>,
    pub trigger:     RequestType,
    /// 対象部署（省略時は全体）
    pub segment:     Option<String>,
}

impl From<WorkflowRequest> for WorkflowInput {
    fn from(req: WorkflowRequest) -> Self {
        Self {
            name:        req.name,
            description: req.description,
            trigger:     req.trigger,
            segment:     req.segment,
        }
    }
}

/// ステップの追加・更新リクエスト
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub approver:      ApproverSpec,
    pub approver_name: String,
    pub timeout_hours: u32,
}

impl From<StepRequest> for StepSettings {
    fn from(req: StepRequest) -> Self {
        Self {
            approver:      req.approver,
            approver_name: req.approver_name,
            timeout_hours: req.timeout_hours,
        }
    }
}

/// ステップ移動リクエスト
#[derive(Debug, Deserialize)]
pub struct MoveStepRequest {
    pub direction: MoveDirection,
}

/// ステップのパスパラメータ
#[derive(Debug, Deserialize)]
pub struct StepPathParams {
    pub id:      Uuid,
    pub step_id: Uuid,
}

/// ワークフローステップ DTO
#[derive(Debug, Serialize)]
pub struct WorkflowStepDto {
    pub id:            String,
    pub order:         u32,
    pub approver:      ApproverSpec,
    pub approver_name: String,
    pub timeout_hours: u32,
}

impl From<&WorkflowStep> for WorkflowStepDto {
    fn from(step: &WorkflowStep) -> Self {
        Self {
            id:            step.id().to_string(),
            order:         step.order().as_u32(),
            approver:      step.approver().clone(),
            approver_name: step.approver_name().to_string(),
            timeout_hours: step.timeout_hours(),
        }
    }
}

/// ワークフロー DTO
#[derive(Debug, Serialize)]
pub struct WorkflowDto {
    pub id:          String,
    pub name:        String,
    pub description: Option<String>,
    pub trigger:     String,
    pub segment:     Option<String>,
    pub active:      bool,
    pub steps:       Vec<WorkflowStepDto>,
    pub version:     i32,
    pub created_at:  String,
    pub updated_at:  String,
}

impl From<&ValidationWorkflow> for WorkflowDto {
    fn from(workflow: &ValidationWorkflow) -> Self {
        Self {
            id:          workflow.id().to_string(),
            name:        workflow.name().to_string(),
            description: workflow.description().map(str::to_string),
            trigger:     workflow.trigger().as_str().to_string(),
            segment:     workflow.segment().map(str::to_string),
            active:      workflow.is_active(),
            steps:       workflow.steps().iter().map(WorkflowStepDto::from).collect(),
            version:     workflow.version().as_i32(),
            created_at:  workflow.created_at().to_rfc3339(),
            updated_at:  workflow.updated_at().to_rfc3339(),
        }
    }
}

fn require_manage(actor: &Actor) -> Result<(), CoreError> {
    actor
        .capabilities
        .require(&Capability::workflow_manage())
        .map_err(CoreError::from)
}

fn workflow_response(
    status: StatusCode,
    workflow: &ValidationWorkflow,
) -> (StatusCode, Json<ApiResponse<WorkflowDto>>) {
    (status, Json(ApiResponse::new(WorkflowDto::from(workflow))))
}

fn steps_response(
    status: StatusCode,
    workflow: &ValidationWorkflow,
) -> (StatusCode, Json<ApiResponse<Vec<WorkflowStepDto>>>) {
    let steps = workflow
        .steps()
        .iter()
        .map(WorkflowStepDto::from)
        .collect::<Vec<_>>();
    (status, Json(ApiResponse::new(steps)))
}

/// GET /hr/validation/workflows
#[tracing::instrument(skip_all)]
pub async fn list_workflows(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflows = state.usecase.list().await?;

    let response = ApiResponse::new(workflows.iter().map(WorkflowDto::from).collect::<Vec<_>>());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /hr/validation/workflows
///
/// ## レスポンス
///
/// - `201 Created`: 作成したワークフロー（有効、ステップなし）
/// - `409 Conflict`: 同じ申請種別・セグメントで有効なワークフローが既にある
#[tracing::instrument(skip_all)]
pub async fn create_workflow(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiJson(req): ApiJson<WorkflowRequest>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state.usecase.create(req.into()).await?;

    Ok(workflow_response(StatusCode::CREATED, &workflow))
}

/// GET /hr/validation/workflows/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_workflow(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .get(&ValidationWorkflowId::from_uuid(id))
        .await?;

    Ok(workflow_response(StatusCode::OK, &workflow))
}

/// PUT /hr/validation/workflows/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_workflow(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<WorkflowRequest>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .update(&ValidationWorkflowId::from_uuid(id), req.into())
        .await?;

    Ok(workflow_response(StatusCode::OK, &workflow))
}

/// DELETE /hr/validation/workflows/{id}
///
/// ## レスポンス
///
/// - `204 No Content`: 削除成功
/// - `409 Conflict`: 処理中の申請が参照している（`workflow_in_use`）
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_workflow(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    state
        .usecase
        .delete(&ValidationWorkflowId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /hr/validation/workflows/{id}/toggle
#[tracing::instrument(skip_all, fields(%id))]
pub async fn toggle_workflow(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .toggle(&ValidationWorkflowId::from_uuid(id))
        .await?;

    Ok(workflow_response(StatusCode::OK, &workflow))
}

/// GET /hr/validation/workflows/{id}/steps
#[tracing::instrument(skip_all, fields(%id))]
pub async fn list_steps(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .get(&ValidationWorkflowId::from_uuid(id))
        .await?;

    Ok(steps_response(StatusCode::OK, &workflow))
}

/// POST /hr/validation/workflows/{id}/steps
///
/// 末尾にステップを追加し、追加後のステップ一覧を返す。
#[tracing::instrument(skip_all, fields(%id))]
pub async fn add_step(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StepRequest>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .add_step(&ValidationWorkflowId::from_uuid(id), req.into())
        .await?;

    Ok(steps_response(StatusCode::CREATED, &workflow))
}

/// PUT /hr/validation/workflows/{id}/steps/{step_id}
#[tracing::instrument(skip_all, fields(id = %params.id, step_id = %params.step_id))]
pub async fn update_step(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(params): ApiPath<StepPathParams>,
    ApiJson(req): ApiJson<StepRequest>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .update_step(
            &ValidationWorkflowId::from_uuid(params.id),
            &WorkflowStepId::from_uuid(params.step_id),
            req.into(),
        )
        .await?;

    Ok(steps_response(StatusCode::OK, &workflow))
}

/// DELETE /hr/validation/workflows/{id}/steps/{step_id}
///
/// 削除後、後続のステップは順序が 1 つずつ繰り上がる。
#[tracing::instrument(skip_all, fields(id = %params.id, step_id = %params.step_id))]
pub async fn delete_step(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(params): ApiPath<StepPathParams>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .delete_step(
            &ValidationWorkflowId::from_uuid(params.id),
            &WorkflowStepId::from_uuid(params.step_id),
        )
        .await?;

    Ok(steps_response(StatusCode::OK, &workflow))
}

/// POST /hr/validation/workflows/{id}/steps/{step_id}/move
///
/// ## レスポンス
///
/// - `200 OK`: 移動後のステップ一覧
/// - `400 Bad Request`: 先頭の上移動、末尾の下移動
#[tracing::instrument(skip_all, fields(id = %params.id, step_id = %params.step_id))]
pub async fn move_step(
    State(state): State<Arc<WorkflowState>>,
    actor: Actor,
    ApiPath(params): ApiPath<StepPathParams>,
    ApiJson(req): ApiJson<MoveStepRequest>,
) -> Result<impl IntoResponse, CoreError> {
    require_manage(&actor)?;

    let workflow = state
        .usecase
        .move_step(
            &ValidationWorkflowId::from_uuid(params.id),
            &WorkflowStepId::from_uuid(params.step_id),
            req.direction,
        )
        .await?;

    Ok(steps_response(StatusCode::OK, &workflow))
}
