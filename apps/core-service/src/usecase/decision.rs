//! # 決裁ユースケース
//!
//! 承認・却下の記録と、操作者宛ての承認待ち一覧を実装する。
//!
//! ## 決裁の検証順序
//!
//! 1. 申請種別の一致（指定された場合）
//! 2. 承認レベルの一致（`StepMismatch`）
//! 3. 実効承認者であること（`Forbidden`）
//! 4. 却下コメントの有無（`CommentRequired`）
//!
//! 保存はバージョンチェック付きで行い、並行して先に決裁が記録されていた場合は
//! `StepMismatch` を返す。同じステップに決裁記録が 2 件残ることはない。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validflow_domain::{
    DomainError,
    clock::Clock,
    employee::UserId,
    request::{Decision, DecisionInput, Request, RequestId, RequestType},
    value_objects::StepOrder,
};
use validflow_infra::{db::TransactionManager, repository::RequestRepository};
use validflow_shared::{event_log::event, log_business_event};

use super::{helpers::FindResultExt, resolver::ApproverResolver};
use crate::error::CoreError;

/// 決裁の入力
pub struct DecisionCommand {
    pub request_id:   RequestId,
    /// 操作者が想定している申請種別（指定時は一致を検証する）
    pub request_type: Option<RequestType>,
    /// 操作者が見ている承認レベル（省略時は現在のレベル）
    pub step_order:   Option<StepOrder>,
    pub decision:     Decision,
    pub actor_id:     UserId,
    pub comment:      Option<String>,
}

/// 承認待ち一覧の 1 件
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub request:      Request,
    /// 委任により代理で決裁する場合の委任元
    pub on_behalf_of: Option<UserId>,
    pub due_at:       Option<DateTime<Utc>>,
    pub overdue:      bool,
}

/// 決裁ユースケース
pub struct DecisionUseCaseImpl {
    request_repo: Arc<dyn RequestRepository>,
    resolver:     Arc<ApproverResolver>,
    tx_manager:   Arc<dyn TransactionManager>,
    clock:        Arc<dyn Clock>,
}

impl DecisionUseCaseImpl {
    pub fn new(
        request_repo: Arc<dyn RequestRepository>,
        resolver: Arc<ApproverResolver>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            request_repo,
            resolver,
            tx_manager,
            clock,
        }
    }

    /// 承認・却下を記録する
    pub async fn decide(&self, command: DecisionCommand) -> Result<Request, CoreError> {
        // 1. 申請を取得
        let request = self
            .request_repo
            .find_by_id(&command.request_id)
            .await
            .or_not_found("申請")?;

        if command
            .request_type
            .is_some_and(|expected| expected != request.request_type())
        {
            return Err(DomainError::Validation(format!(
                "申請種別が一致しません: 実際は {} です",
                request.request_type()
            ))
            .into());
        }

        // 2. 承認レベルの検証
        let Some(step_order) = command.step_order.or_else(|| request.current_level()) else {
            return Err(
                DomainError::InvalidState(format!("申請は既に {} です", request.status())).into(),
            );
        };
        request.ensure_current_step(step_order)?;

        // 3. 実効承認者の検証（委任を考慮）
        let now = self.clock.now();
        let approvers = self
            .resolver
            .effective_approvers(&request, now.date_naive())
            .await?;
        let on_behalf_of = approvers.authorize(&command.actor_id)?;

        // 4. 決裁を記録
        let expected_version = request.version();
        let decided = request.decided(
            DecisionInput {
                step_order,
                decision: command.decision,
                actor_id: command.actor_id.clone(),
                on_behalf_of: on_behalf_of.clone(),
                comment: command.comment,
            },
            now,
        )?;

        // 5. バージョンチェック付きで保存
        let mut tx = self.tx_manager.begin().await?;
        self.request_repo
            .update_with_version_check(&mut tx, &decided, expected_version)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    CoreError::from(DomainError::StepMismatch(format!(
                        "ステップ {} は既に他の承認者が処理しました",
                        step_order
                    )))
                } else {
                    CoreError::from(e)
                }
            })?;
        tx.commit().await?;

        let action = match command.decision {
            Decision::Approve => event::action::STEP_APPROVED,
            Decision::Reject => event::action::STEP_REJECTED,
        };
        log_business_event!(
            event.category = event::category::DECISION,
            event.action = action,
            event.entity_type = event::entity_type::REQUEST,
            event.entity_id = %decided.id(),
            event.actor_id = %command.actor_id,
            event.on_behalf_of = on_behalf_of.as_ref().map(|u| u.to_string()),
            event.step_order = step_order.as_u32(),
            event.status = %decided.status(),
            event.result = event::result::SUCCESS,
            "決裁を記録しました"
        );

        Ok(decided)
    }

    /// 操作者が決裁できる申請の一覧（古い順）
    ///
    /// 現在ステップの実効承認者に操作者が含まれる申請だけを返す。
    pub async fn list_pending(
        &self,
        actor_id: &UserId,
        request_type: Option<RequestType>,
    ) -> Result<Vec<PendingItem>, CoreError> {
        let now = self.clock.now();
        let open = self.request_repo.find_open(request_type).await?;

        let mut items = Vec::new();
        for request in open {
            let approvers = self
                .resolver
                .effective_approvers(&request, now.date_naive())
                .await?;
            let Ok(on_behalf_of) = approvers.authorize(actor_id) else {
                continue;
            };
            items.push(PendingItem {
                due_at: request.due_at(),
                overdue: request.is_overdue(now),
                on_behalf_of,
                request,
            });
        }
        Ok(items)
    }
}
