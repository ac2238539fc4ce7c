//! # 申請 API ハンドラ
//!
//! 申請者本人向けのエンドポイント。
//!
//! | メソッド | パス | 操作 |
//! |----------|------|------|
//! | GET | `/hr/my/requests` | 自分の申請一覧 |
//! | GET | `/hr/my/requests/{id}` | 申請の詳細（チェーンと決裁履歴を含む） |
//! | POST | `/hr/my/leave-requests` | 休暇申請 |
//! | POST | `/hr/my/overtime-requests` | 残業申請 |
//! | POST | `/hr/my/correction-requests` | 打刻修正申請 |
//! | POST | `/hr/my/administrative-requests` | 書類申請 |
//! | POST | `/hr/my/requests/{id}/cancel` | 申請の取り消し |

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validflow_domain::{
    clock::Clock,
    request::{ChainStep, DecisionRecord, LeaveKind, Request, RequestId, RequestPayload},
    workflow::ApproverSpec,
};
use validflow_shared::ApiResponse;

use super::{
    Actor,
    extract::{ApiJson, ApiPath},
};
use crate::{
    error::CoreError,
    usecase::{RequestUseCaseImpl, SubmitRequestInput},
};

/// 申請 API の共有状態
pub struct RequestState {
    pub usecase: RequestUseCaseImpl,
    pub clock:   Arc<dyn Clock>,
}

// --- リクエスト ---

/// 休暇申請
#[derive(Debug, Deserialize)]
pub struct LeaveRequestBody {
    pub leave_kind: LeaveKind,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    pub days:       f64,
    pub reason:     Option<String>,
    pub attachment: Option<String>,
}

/// 残業申請
#[derive(Debug, Deserialize)]
pub struct OvertimeRequestBody {
    pub work_date:  NaiveDate,
    pub hours:      f64,
    pub reason:     Option<String>,
    pub attachment: Option<String>,
}

/// 打刻修正申請
#[derive(Debug, Deserialize)]
pub struct CorrectionRequestBody {
    pub request_date:        NaiveDate,
    pub requested_check_in:  Option<NaiveTime>,
    pub requested_check_out: Option<NaiveTime>,
    pub reason:              Option<String>,
}

/// 書類申請
#[derive(Debug, Deserialize)]
pub struct AdministrativeRequestBody {
    pub document_kind: String,
    pub needed_by:     Option<NaiveDate>,
    pub reason:        Option<String>,
    pub attachment:    Option<String>,
}

// --- レスポンス ---

/// 承認チェーンのステップ DTO
#[derive(Debug, Serialize)]
pub struct ChainStepDto {
    pub order:         u32,
    pub approver:      ApproverSpec,
    pub approver_name: String,
    pub timeout_hours: u32,
}

impl From<&ChainStep> for ChainStepDto {
    fn from(step: &ChainStep) -> Self {
        Self {
            order:         step.order.as_u32(),
            approver:      step.approver.clone(),
            approver_name: step.approver_name.clone(),
            timeout_hours: step.timeout_hours,
        }
    }
}

/// 決裁記録 DTO
#[derive(Debug, Serialize)]
pub struct DecisionRecordDto {
    pub step_order:   u32,
    pub decision:     String,
    pub actor_id:     String,
    pub on_behalf_of: Option<String>,
    pub comment:      Option<String>,
    pub decided_at:   String,
}

impl From<&DecisionRecord> for DecisionRecordDto {
    fn from(record: &DecisionRecord) -> Self {
        Self {
            step_order:   record.step_order.as_u32(),
            decision:     record.decision.to_string(),
            actor_id:     record.actor_id.to_string(),
            on_behalf_of: record.on_behalf_of.as_ref().map(|u| u.to_string()),
            comment:      record.comment.clone(),
            decided_at:   record.decided_at.to_rfc3339(),
        }
    }
}

/// 申請 DTO
#[derive(Debug, Serialize)]
pub struct RequestDto {
    pub id: String,
    pub request_type: String,
    pub status: String,
    pub requester_id: String,
    pub requester_name: String,
    pub department: Option<String>,
    pub workflow_id: String,
    pub payload: RequestPayload,
    pub reason: Option<String>,
    pub attachment: Option<String>,
    /// 決裁待ちのステップ順序（終端状態では `None`）
    pub current_level: Option<u32>,
    pub due_at: Option<String>,
    pub overdue: bool,
    pub chain: Vec<ChainStepDto>,
    pub history: Vec<DecisionRecordDto>,
    pub version: i32,
    pub submitted_at: String,
    pub updated_at: String,
}

impl RequestDto {
    pub fn from_request(request: &Request, now: DateTime<Utc>) -> Self {
        Self {
            id: request.id().to_string(),
            request_type: request.request_type().as_str().to_string(),
            status: request.status().to_string(),
            requester_id: request.requester_id().to_string(),
            requester_name: request.requester_name().to_string(),
            department: request.department().map(str::to_string),
            workflow_id: request.workflow_id().to_string(),
            payload: request.payload().clone(),
            reason: request.reason().map(str::to_string),
            attachment: request.attachment().map(str::to_string),
            current_level: request.current_level().map(|o| o.as_u32()),
            due_at: request.due_at().map(|t| t.to_rfc3339()),
            overdue: request.is_overdue(now),
            chain: request.chain().iter().map(ChainStepDto::from).collect(),
            history: request.history().iter().map(DecisionRecordDto::from).collect(),
            version: request.version().as_i32(),
            submitted_at: request.submitted_at().to_rfc3339(),
            updated_at: request.updated_at().to_rfc3339(),
        }
    }
}

async fn submit(
    state: &RequestState,
    actor: Actor,
    payload: RequestPayload,
    reason: Option<String>,
    attachment: Option<String>,
) -> Result<(StatusCode, Json<ApiResponse<RequestDto>>), CoreError> {
    let request = state
        .usecase
        .submit(SubmitRequestInput {
            requester_id: actor.user_id,
            payload,
            reason,
            attachment,
        })
        .await?;

    let response = ApiResponse::new(RequestDto::from_request(&request, state.clock.now()));
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /hr/my/leave-requests
///
/// 休暇申請を受け付ける。休暇種別（年次・病気など）がそのまま申請種別になる。
///
/// ## レスポンス
///
/// - `201 Created`: 受け付けた申請
/// - `400 Bad Request`: 入力不備、ワークフロー未設定（`no_workflow_configured`）
#[tracing::instrument(skip_all)]
pub async fn submit_leave_request(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
    ApiJson(req): ApiJson<LeaveRequestBody>,
) -> Result<impl IntoResponse, CoreError> {
    let payload = RequestPayload::Leave {
        leave_kind: req.leave_kind,
        start_date: req.start_date,
        end_date:   req.end_date,
        days:       req.days,
    };
    submit(&state, actor, payload, req.reason, req.attachment).await
}

/// POST /hr/my/overtime-requests
#[tracing::instrument(skip_all)]
pub async fn submit_overtime_request(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
    ApiJson(req): ApiJson<OvertimeRequestBody>,
) -> Result<impl IntoResponse, CoreError> {
    let payload = RequestPayload::Overtime {
        work_date: req.work_date,
        hours:     req.hours,
    };
    submit(&state, actor, payload, req.reason, req.attachment).await
}

/// POST /hr/my/correction-requests
#[tracing::instrument(skip_all)]
pub async fn submit_correction_request(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
    ApiJson(req): ApiJson<CorrectionRequestBody>,
) -> Result<impl IntoResponse, CoreError> {
    let payload = RequestPayload::Correction {
        request_date:        req.request_date,
        requested_check_in:  req.requested_check_in,
        requested_check_out: req.requested_check_out,
    };
    submit(&state, actor, payload, req.reason, None).await
}

/// POST /hr/my/administrative-requests
#[tracing::instrument(skip_all)]
pub async fn submit_administrative_request(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
    ApiJson(req): ApiJson<AdministrativeRequestBody>,
) -> Result<impl IntoResponse, CoreError> {
    let payload = RequestPayload::Administrative {
        document_kind: req.document_kind,
        needed_by:     req.needed_by,
    };
    submit(&state, actor, payload, req.reason, req.attachment).await
}

/// GET /hr/my/requests
///
/// 自分の申請を新しい順に返す。
#[tracing::instrument(skip_all)]
pub async fn list_my_requests(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
) -> Result<impl IntoResponse, CoreError> {
    let requests = state.usecase.list_mine(&actor.user_id).await?;
    let now = state.clock.now();

    let response = ApiResponse::new(
        requests
            .iter()
            .map(|r| RequestDto::from_request(r, now))
            .collect::<Vec<_>>(),
    );
    Ok((StatusCode::OK, Json(response)))
}

/// GET /hr/my/requests/{id}
///
/// ## レスポンス
///
/// - `200 OK`: 申請の詳細
/// - `403 Forbidden`: 申請者本人でない
/// - `404 Not Found`: 申請が見つからない
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_my_request(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let request = state
        .usecase
        .get_mine(&RequestId::from_uuid(id), &actor.user_id)
        .await?;

    let response = ApiResponse::new(RequestDto::from_request(&request, state.clock.now()));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /hr/my/requests/{id}/cancel
///
/// ## レスポンス
///
/// - `200 OK`: 取り消し後の申請
/// - `403 Forbidden`: 申請者本人でない
/// - `409 Conflict`: 既に終端状態（`invalid_state`）、他の操作と競合（`conflict`）
#[tracing::instrument(skip_all, fields(%id))]
pub async fn cancel_my_request(
    State(state): State<Arc<RequestState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let request = state
        .usecase
        .cancel(&RequestId::from_uuid(id), &actor.user_id)
        .await?;

    let response = ApiResponse::new(RequestDto::from_request(&request, state.clock.now()));
    Ok((StatusCode::OK, Json(response)))
}
