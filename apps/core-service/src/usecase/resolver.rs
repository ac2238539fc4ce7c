//! # 承認者の解決
//!
//! 承認チェーンのステップが指す承認者指定を、組織ディレクトリで名目上の承認者に展開し、
//! 委任を重ねて実効承認者を求める。
//!
//! | 指定 | 名目上の承認者 |
//! |------|---------------|
//! | `user` | 指定されたユーザー |
//! | `manager` | 申請者の直属の上長 |
//! | `role` | ロール保持者全員 |
//! | `hr` | 設定された人事ロールの保持者全員 |
//!
//! 誰にも解決できないステップは誰も決裁できず、承認待ち一覧にも現れない。

use std::sync::Arc;

use chrono::NaiveDate;
use validflow_domain::{
    delegation::{EffectiveApprovers, Resolution},
    employee::UserId,
    request::Request,
    workflow::ApproverSpec,
};
use validflow_infra::repository::{DelegationRepository, OrgDirectory};

use crate::error::CoreError;

pub struct ApproverResolver {
    org_directory:   Arc<dyn OrgDirectory>,
    delegation_repo: Arc<dyn DelegationRepository>,
    hr_role:         String,
}

impl ApproverResolver {
    pub fn new(
        org_directory: Arc<dyn OrgDirectory>,
        delegation_repo: Arc<dyn DelegationRepository>,
        hr_role: impl Into<String>,
    ) -> Self {
        Self {
            org_directory,
            delegation_repo,
            hr_role: hr_role.into(),
        }
    }

    /// 承認者指定を名目上の承認者に展開する
    pub async fn nominal_approvers(
        &self,
        approver: &ApproverSpec,
        requester_id: &UserId,
    ) -> Result<Vec<UserId>, CoreError> {
        let users = match approver {
            ApproverSpec::User { user_id } => vec![user_id.clone()],
            ApproverSpec::Role { role } => self.org_directory.users_with_role(role).await?,
            ApproverSpec::Manager => self
                .org_directory
                .find_employee(requester_id)
                .await?
                .and_then(|employee| employee.manager_id().cloned())
                .into_iter()
                .collect(),
            ApproverSpec::Hr => self.org_directory.users_with_role(&self.hr_role).await?,
        };

        if users.is_empty() {
            tracing::warn!(
                approver = %approver.kind(),
                requester_id = %requester_id,
                "承認者を解決できませんでした"
            );
        }
        Ok(users)
    }

    /// 申請の現在ステップの実効承認者を求める
    ///
    /// 終端状態の申請では空集合を返す。
    pub async fn effective_approvers(
        &self,
        request: &Request,
        date: NaiveDate,
    ) -> Result<EffectiveApprovers, CoreError> {
        let Some(step) = request.current_step() else {
            return Ok(EffectiveApprovers::default());
        };

        let nominal = self
            .nominal_approvers(&step.approver, request.requester_id())
            .await?;
        let delegations = self.delegation_repo.find_in_force(&nominal, date).await?;
        let approvers =
            EffectiveApprovers::resolve(&nominal, request.request_type(), date, &delegations);

        for resolution in approvers.resolutions().iter().filter(|r| r.is_ambiguous()) {
            if let Resolution::Delegated {
                delegator,
                delegation_id,
                candidates,
                ..
            } = resolution
            {
                tracing::warn!(
                    delegator = %delegator,
                    delegation_id = %delegation_id,
                    candidates,
                    "同じ委任元に有効な委任が複数あります。最新のものを採用します"
                );
            }
        }

        Ok(approvers)
    }
}
