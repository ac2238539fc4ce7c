//! # 決裁 API ハンドラ
//!
//! 承認者向けのエンドポイント。
//!
//! | メソッド | パス | 操作 |
//! |----------|------|------|
//! | GET | `/hr/validation/pending?type=` | 自分が決裁できる申請の一覧 |
//! | POST | `/hr/validation/{id}/approve` | 承認 |
//! | POST | `/hr/validation/{id}/reject` | 却下（コメント必須） |

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
    clock::Clock,
    request::{Decision, RequestId, RequestType},
    value_objects::StepOrder,
};
use validflow_shared::ApiResponse;

use super::{
    Actor,
    RequestDto,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    error::CoreError,
    usecase::{DecisionCommand, DecisionUseCaseImpl, PendingItem},
};

/// 決裁 API の共有状態
pub struct ValidationState {
    pub usecase: DecisionUseCaseImpl,
    pub clock:   Arc<dyn Clock>,
}

/// 承認待ち一覧のクエリ
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(rename = "type")]
    pub request_type: Option<RequestType>,
}

/// 承認・却下リクエスト
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// 指定時は申請の種別と一致する必要がある
    pub request_type: Option<RequestType>,
    /// 操作者が見ている承認レベル（省略時は現在のレベル）
    pub step_order:   Option<u32>,
    pub comment:      Option<String>,
}

/// 承認待ち DTO
#[derive(Debug, Serialize)]
pub struct PendingItemDto {
    #[serde(flatten)]
    pub request:      RequestDto,
    /// 委任により代理で決裁する場合の委任元
    pub on_behalf_of: Option<String>,
}

impl PendingItemDto {
    fn from_item(item: &PendingItem, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            request:      RequestDto::from_request(&item.request, now),
            on_behalf_of: item.on_behalf_of.as_ref().map(|u| u.to_string()),
        }
    }
}

/// GET /hr/validation/pending
///
/// 現在ステップの実効承認者に操作者が含まれる申請を、申請の古い順に返す。
/// 委任を受けている場合は委任元の分も含む。
#[tracing::instrument(skip_all)]
pub async fn list_pending(
    State(state): State<Arc<ValidationState>>,
    actor: Actor,
    ApiQuery(query): ApiQuery<PendingQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let items = state
        .usecase
        .list_pending(&actor.user_id, query.request_type)
        .await?;
    let now = state.clock.now();

    let response = ApiResponse::new(
        items
            .iter()
            .map(|item| PendingItemDto::from_item(item, now))
            .collect::<Vec<_>>(),
    );
    Ok((StatusCode::OK, Json(response)))
}

async fn decide(
    state: &ValidationState,
    actor: Actor,
    id: Uuid,
    decision: Decision,
    req: DecisionRequest,
) -> Result<(StatusCode, Json<ApiResponse<RequestDto>>), CoreError> {
    let step_order = req.step_order.map(StepOrder::new).transpose()?;

    let request = state
        .usecase
        .decide(DecisionCommand {
            request_id: RequestId::from_uuid(id),
            request_type: req.request_type,
            step_order,
            decision,
            actor_id: actor.user_id,
            comment: req.comment,
        })
        .await?;

    let response = ApiResponse::new(RequestDto::from_request(&request, state.clock.now()));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /hr/validation/{id}/approve
///
/// ## レスポンス
///
/// - `200 OK`: 決裁後の申請
/// - `400 Bad Request`: 申請種別の不一致
/// - `403 Forbidden`: 実効承認者でない（`not_authorized`）
/// - `409 Conflict`: 承認レベルの不一致・並行決裁（`step_mismatch`）、終端状態（`invalid_state`）
#[tracing::instrument(skip_all, fields(%id))]
pub async fn approve_request(
    State(state): State<Arc<ValidationState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<DecisionRequest>,
) -> Result<impl IntoResponse, CoreError> {
    decide(&state, actor, id, Decision::Approve, req).await
}

/// POST /hr/validation/{id}/reject
///
/// 承認と同じ検証に加え、空でないコメントを必須とする（`comment_required`）。
#[tracing::instrument(skip_all, fields(%id))]
pub async fn reject_request(
    State(state): State<Arc<ValidationState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<DecisionRequest>,
) -> Result<impl IntoResponse, CoreError> {
    decide(&state, actor, id, Decision::Reject, req).await
}
