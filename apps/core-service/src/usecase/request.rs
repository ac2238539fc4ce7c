//! # 申請ユースケース
//!
//! 申請の受付・参照・取り消しを実装する。
//!
//! 受付時に申請種別と申請者の所属部署から有効なワークフローを選び、
//! そのステップ列を承認チェーンとして申請に写し取る。以後ワークフローを編集しても
//! 処理中の申請には影響しない。

use std::sync::Arc;

use validflow_domain::{
    DomainError,
    clock::Clock,
    employee::UserId,
    request::{NewRequest, Request, RequestId, RequestPayload},
    workflow::select_workflow,
};
use validflow_infra::{
    db::TransactionManager,
    repository::{OrgDirectory, RequestRepository, ValidationWorkflowRepository},
};
use validflow_shared::{event_log::event, log_business_event};

use super::helpers::FindResultExt;
use crate::error::CoreError;

/// 申請の入力
pub struct SubmitRequestInput {
    pub requester_id: UserId,
    pub payload:      RequestPayload,
    pub reason:       Option<String>,
    pub attachment:   Option<String>,
}

/// 申請ユースケース
pub struct RequestUseCaseImpl {
    request_repo:  Arc<dyn RequestRepository>,
    workflow_repo: Arc<dyn ValidationWorkflowRepository>,
    org_directory: Arc<dyn OrgDirectory>,
    tx_manager:    Arc<dyn TransactionManager>,
    clock:         Arc<dyn Clock>,
}

impl RequestUseCaseImpl {
    pub fn new(
        request_repo: Arc<dyn RequestRepository>,
        workflow_repo: Arc<dyn ValidationWorkflowRepository>,
        org_directory: Arc<dyn OrgDirectory>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            request_repo,
            workflow_repo,
            org_directory,
            tx_manager,
            clock,
        }
    }

    /// 申請を受け付ける
    ///
    /// # Errors
    ///
    /// - `NoWorkflowConfigured`: 申請種別に一致する有効なワークフローがない、またはステップが空
    /// - `Validation` / `InvalidRange`: 申請内容の不備
    pub async fn submit(&self, input: SubmitRequestInput) -> Result<Request, CoreError> {
        let requester = self
            .org_directory
            .find_employee(&input.requester_id)
            .await
            .or_not_found("申請者")?;
        let request_type = input.payload.request_type();

        let workflows = self
            .workflow_repo
            .find_active_by_trigger(request_type)
            .await?;
        let workflow = select_workflow(&workflows, request_type, requester.department())
            .ok_or_else(|| {
                DomainError::NoWorkflowConfigured(format!(
                    "{} に有効なワークフローがありません",
                    request_type
                ))
            })?;

        let request = Request::submit(NewRequest {
            id:             RequestId::new(),
            requester_id:   input.requester_id,
            requester_name: requester.name().to_string(),
            department:     requester.department().map(str::to_string),
            workflow_id:    workflow.id().clone(),
            payload:        input.payload,
            reason:         input.reason,
            attachment:     input.attachment,
            chain:          workflow.chain_snapshot(),
            now:            self.clock.now(),
        })?;

        let mut tx = self.tx_manager.begin().await?;
        self.request_repo.insert(&mut tx, &request).await?;
        tx.commit().await?;

        log_business_event!(
            event.category = event::category::REQUEST,
            event.action = event::action::REQUEST_SUBMITTED,
            event.entity_type = event::entity_type::REQUEST,
            event.entity_id = %request.id(),
            event.actor_id = %request.requester_id(),
            event.request_type = %request_type,
            event.workflow_id = %workflow.id(),
            event.result = event::result::SUCCESS,
            "申請を受け付けました"
        );

        Ok(request)
    }

    /// 自分の申請一覧（新しい順）
    pub async fn list_mine(&self, requester_id: &UserId) -> Result<Vec<Request>, CoreError> {
        Ok(self.request_repo.find_by_requester(requester_id).await?)
    }

    /// 自分の申請の詳細
    pub async fn get_mine(
        &self,
        id: &RequestId,
        requester_id: &UserId,
    ) -> Result<Request, CoreError> {
        let request = self.request_repo.find_by_id(id).await.or_not_found("申請")?;
        if request.requester_id() != requester_id {
            return Err(DomainError::Forbidden("申請者本人のみ参照できます".to_string()).into());
        }
        Ok(request)
    }

    /// 申請者による取り消し
    ///
    /// # Errors
    ///
    /// - `Forbidden`: 申請者本人でない
    /// - `InvalidState`: 既に終端状態
    /// - `Conflict`: 読み込み後に決裁が記録された
    pub async fn cancel(&self, id: &RequestId, actor_id: &UserId) -> Result<Request, CoreError> {
        let request = self.request_repo.find_by_id(id).await.or_not_found("申請")?;
        let expected_version = request.version();
        let cancelled = request.cancelled(actor_id, self.clock.now())?;

        let mut tx = self.tx_manager.begin().await?;
        self.request_repo
            .update_with_version_check(&mut tx, &cancelled, expected_version)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    CoreError::from(DomainError::Conflict(
                        "申請は他の操作で更新されています".to_string(),
                    ))
                } else {
                    CoreError::from(e)
                }
            })?;
        tx.commit().await?;

        log_business_event!(
            event.category = event::category::REQUEST,
            event.action = event::action::REQUEST_CANCELLED,
            event.entity_type = event::entity_type::REQUEST,
            event.entity_id = %cancelled.id(),
            event.actor_id = %actor_id,
            event.result = event::result::SUCCESS,
            "申請を取り消しました"
        );

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use validflow_domain::{
        clock::FixedClock,
        employee::Employee,
        request::{ApprovalStatus, LeaveKind, RequestType},
        value_objects::WorkflowName,
        workflow::{
            ApproverSpec,
            NewValidationWorkflow,
            StepSettings,
            ValidationWorkflow,
            ValidationWorkflowId,
            WorkflowStepId,
        },
    };
    use validflow_infra::mock::{
        MockOrgDirectory,
        MockRequestRepository,
        MockTransactionManager,
        MockValidationWorkflowRepository,
    };

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn workflow(trigger: RequestType, segment: Option<&str>, steps: usize) -> ValidationWorkflow {
        let mut workflow = ValidationWorkflow::new(NewValidationWorkflow {
            id: ValidationWorkflowId::new(),
            name: WorkflowName::new("休暇承認").unwrap(),
            description: None,
            trigger,
            segment: segment.map(String::from),
            active: true,
            now: now(),
        });
        for _ in 0..steps {
            workflow = workflow
                .with_step_added(
                    WorkflowStepId::new(),
                    StepSettings {
                        approver:      ApproverSpec::Manager,
                        approver_name: "上長".to_string(),
                        timeout_hours: 48,
                    },
                    now(),
                )
                .unwrap();
        }
        workflow
    }

    fn sick_leave() -> RequestPayload {
        let date = NaiveDate::from_ymd_opt(2026, 4, 6).unwrap();
        RequestPayload::Leave {
            leave_kind: LeaveKind::Sick,
            start_date: date,
            end_date:   date,
            days:       1.0,
        }
    }

    struct Fixture {
        sut:          RequestUseCaseImpl,
        requests:     MockRequestRepository,
        workflows:    MockValidationWorkflowRepository,
        requester_id: UserId,
    }

    fn setup() -> Fixture {
        let requests = MockRequestRepository::new();
        let workflows = MockValidationWorkflowRepository::new();
        let directory = MockOrgDirectory::new();
        let requester_id = UserId::new();
        directory.add_employee(Employee::new(
            requester_id.clone(),
            "山田 太郎",
            Some("sales".to_string()),
            Some(UserId::new()),
        ));
        let sut = RequestUseCaseImpl::new(
            Arc::new(requests.clone()),
            Arc::new(workflows.clone()),
            Arc::new(directory),
            Arc::new(MockTransactionManager),
            Arc::new(FixedClock::new(now())),
        );
        Fixture {
            sut,
            requests,
            workflows,
            requester_id,
        }
    }

    fn input(requester_id: &UserId) -> SubmitRequestInput {
        SubmitRequestInput {
            requester_id: requester_id.clone(),
            payload:      sick_leave(),
            reason:       Some("発熱".to_string()),
            attachment:   None,
        }
    }

    #[tokio::test]
    async fn test_申請するとチェーンを写し取ってpendingになる() {
        let f = setup();
        let wf = workflow(RequestType::Sick, None, 2);
        f.workflows.add_workflow(wf.clone());

        let request = f.sut.submit(input(&f.requester_id)).await.unwrap();

        assert_eq!(request.status(), ApprovalStatus::Pending);
        assert_eq!(request.workflow_id(), wf.id());
        assert_eq!(request.chain(), wf.chain_snapshot().as_slice());
        assert_eq!(request.requester_name(), "山田 太郎");
        assert_eq!(request.department(), Some("sales"));
        assert_eq!(f.requests.find_by_requester(&f.requester_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_所属部署向けのワークフローが優先される() {
        let f = setup();
        f.workflows.add_workflow(workflow(RequestType::Sick, None, 1));
        let sales = workflow(RequestType::Sick, Some("sales"), 2);
        f.workflows.add_workflow(sales.clone());

        let request = f.sut.submit(input(&f.requester_id)).await.unwrap();

        assert_eq!(request.workflow_id(), sales.id());
        assert_eq!(request.chain().len(), 2);
    }

    #[tokio::test]
    async fn test_ワークフローがなければno_workflow_configured() {
        let f = setup();
        f.workflows.add_workflow(workflow(RequestType::Annual, None, 1));

        let err = f.sut.submit(input(&f.requester_id)).await.unwrap_err();

        assert_eq!(err.code(), "no_workflow_configured");
    }

    #[tokio::test]
    async fn test_ステップのないワークフローではno_workflow_configured() {
        let f = setup();
        f.workflows.add_workflow(workflow(RequestType::Sick, None, 0));

        let err = f.sut.submit(input(&f.requester_id)).await.unwrap_err();

        assert_eq!(err.code(), "no_workflow_configured");
    }

    #[tokio::test]
    async fn test_申請者以外は詳細を参照できない() {
        let f = setup();
        f.workflows.add_workflow(workflow(RequestType::Sick, None, 1));
        let request = f.sut.submit(input(&f.requester_id)).await.unwrap();

        let own = f.sut.get_mine(request.id(), &f.requester_id).await;
        let other = f.sut.get_mine(request.id(), &UserId::new()).await;

        assert!(own.is_ok());
        assert_eq!(other.unwrap_err().code(), "not_authorized");
    }

    #[tokio::test]
    async fn test_取り消すとcancelledになり二度目はinvalid_state() {
        let f = setup();
        f.workflows.add_workflow(workflow(RequestType::Sick, None, 1));
        let request = f.sut.submit(input(&f.requester_id)).await.unwrap();

        let cancelled = f.sut.cancel(request.id(), &f.requester_id).await.unwrap();
        let again = f.sut.cancel(request.id(), &f.requester_id).await;

        assert_eq!(cancelled.status(), ApprovalStatus::Cancelled);
        assert_eq!(again.unwrap_err().code(), "invalid_state");
        let stored = f.requests.find_by_id(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), ApprovalStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_申請者以外は取り消せない() {
        let f = setup();
        f.workflows.add_workflow(workflow(RequestType::Sick, None, 1));
        let request = f.sut.submit(input(&f.requester_id)).await.unwrap();

        let err = f.sut.cancel(request.id(), &UserId::new()).await.unwrap_err();

        assert_eq!(err.code(), "not_authorized");
    }
}
