//! # 委任 API ハンドラ
//!
//! | メソッド | パス | 操作 |
//! |----------|------|------|
//! | GET | `/hr/delegations` | 自分の委任一覧（`delegation:manage` があれば全件） |
//! | POST | `/hr/delegations` | 委任の登録 |
//! | DELETE | `/hr/delegations/{id}` | 委任の取り消し |

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validflow_domain::{
    clock::Clock,
    delegation::{Delegation, DelegationId, DelegationScope},
    employee::UserId,
};
use validflow_shared::ApiResponse;

use super::{
    Actor,
    extract::{ApiJson, ApiPath},
};
use crate::{
    error::CoreError,
    usecase::{CreateDelegationInput, DelegationUseCaseImpl},
};

/// 委任 API の共有状態
pub struct DelegationState {
    pub usecase: DelegationUseCaseImpl,
    pub clock:   Arc<dyn Clock>,
}

/// 委任の登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateDelegationRequest {
    /// 省略時は操作者本人
    pub delegator:  Option<Uuid>,
    pub delegate:   Uuid,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    /// 省略時はすべての申請種別
    #[serde(default = "default_scope")]
    pub scope:      DelegationScope,
}

fn default_scope() -> DelegationScope {
    DelegationScope::All
}

/// 委任 DTO
#[derive(Debug, Serialize)]
pub struct DelegationDto {
    pub id:           String,
    pub delegator:    String,
    pub delegate:     String,
    pub start_date:   NaiveDate,
    pub end_date:     NaiveDate,
    pub scope:        DelegationScope,
    /// 取り消されておらず、終了日を過ぎていない
    pub active:       bool,
    pub cancelled_at: Option<String>,
    pub created_at:   String,
}

impl DelegationDto {
    fn from_delegation(delegation: &Delegation, today: NaiveDate) -> Self {
        Self {
            id:           delegation.id().to_string(),
            delegator:    delegation.delegator().to_string(),
            delegate:     delegation.delegate().to_string(),
            start_date:   delegation.start_date(),
            end_date:     delegation.end_date(),
            scope:        delegation.scope().clone(),
            active:       delegation.is_active() && delegation.end_date() >= today,
            cancelled_at: delegation.cancelled_at().map(|t| t.to_rfc3339()),
            created_at:   delegation.created_at().to_rfc3339(),
        }
    }
}

/// GET /hr/delegations
#[tracing::instrument(skip_all)]
pub async fn list_delegations(
    State(state): State<Arc<DelegationState>>,
    actor: Actor,
) -> Result<impl IntoResponse, CoreError> {
    let delegations = state
        .usecase
        .list(&actor.user_id, &actor.capabilities)
        .await?;
    let today = state.clock.today();

    let response = ApiResponse::new(
        delegations
            .iter()
            .map(|d| DelegationDto::from_delegation(d, today))
            .collect::<Vec<_>>(),
    );
    Ok((StatusCode::OK, Json(response)))
}

/// POST /hr/delegations
///
/// ## レスポンス
///
/// - `201 Created`: 登録した委任
/// - `400 Bad Request`: 期間の逆転（`invalid_range`）、既存の委任と重複（`overlapping_delegation`）
/// - `403 Forbidden`: 他人を委任元とする権限がない
/// - `404 Not Found`: 委任先が存在しない
#[tracing::instrument(skip_all)]
pub async fn create_delegation(
    State(state): State<Arc<DelegationState>>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateDelegationRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let input = CreateDelegationInput {
        delegator:  req.delegator.map(UserId::from_uuid),
        delegate:   UserId::from_uuid(req.delegate),
        start_date: req.start_date,
        end_date:   req.end_date,
        scope:      req.scope,
    };

    let delegation = state
        .usecase
        .create(&actor.user_id, &actor.capabilities, input)
        .await?;

    let response = ApiResponse::new(DelegationDto::from_delegation(
        &delegation,
        state.clock.today(),
    ));
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /hr/delegations/{id}
///
/// 取り消した委任を返す（履歴として残る）。
#[tracing::instrument(skip_all, fields(%id))]
pub async fn cancel_delegation(
    State(state): State<Arc<DelegationState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let delegation = state
        .usecase
        .cancel(
            &actor.user_id,
            &actor.capabilities,
            &DelegationId::from_uuid(id),
        )
        .await?;

    let response = ApiResponse::new(DelegationDto::from_delegation(
        &delegation,
        state.clock.today(),
    ));
    Ok((StatusCode::OK, Json(response)))
}
