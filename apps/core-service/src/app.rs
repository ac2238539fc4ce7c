//! # アプリケーション構築
//!
//! ユースケース・State の組み立てとルーター定義を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中し、統合テストは
//! モックを注入して同じルーターを使う。

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use validflow_domain::clock::Clock;
use validflow_infra::{
    db::TransactionManager,
    repository::{
        DelegationRepository,
        OrgDirectory,
        RequestRepository,
        ValidationWorkflowRepository,
    },
};

use crate::{
    handler::{
        DelegationState,
        RequestState,
        ValidationState,
        WorkflowState,
        add_step,
        approve_request,
        cancel_delegation,
        cancel_my_request,
        create_delegation,
        create_workflow,
        delete_step,
        delete_workflow,
        get_my_request,
        get_workflow,
        health_check,
        list_delegations,
        list_my_requests,
        list_pending,
        list_steps,
        list_workflows,
        move_step,
        reject_request,
        submit_administrative_request,
        submit_correction_request,
        submit_leave_request,
        submit_overtime_request,
        toggle_workflow,
        update_step,
        update_workflow,
    },
    usecase::{
        ApproverResolver,
        DecisionUseCaseImpl,
        DelegationUseCaseImpl,
        RequestUseCaseImpl,
        WorkflowUseCaseImpl,
    },
};

/// ルーター構築に必要な依存
#[derive(Clone)]
pub struct AppDependencies {
    pub request_repo:    Arc<dyn RequestRepository>,
    pub workflow_repo:   Arc<dyn ValidationWorkflowRepository>,
    pub delegation_repo: Arc<dyn DelegationRepository>,
    pub org_directory:   Arc<dyn OrgDirectory>,
    pub tx_manager:      Arc<dyn TransactionManager>,
    pub clock:           Arc<dyn Clock>,
    /// `hr` 承認者指定に対応するロール名
    pub hr_role:         String,
}

/// ユースケース → State → Router の順に組み立てる
pub fn build_app(deps: AppDependencies) -> Router {
    let resolver = Arc::new(ApproverResolver::new(
        deps.org_directory.clone(),
        deps.delegation_repo.clone(),
        deps.hr_role,
    ));

    let request_state = Arc::new(RequestState {
        usecase: RequestUseCaseImpl::new(
            deps.request_repo.clone(),
            deps.workflow_repo.clone(),
            deps.org_directory.clone(),
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
        clock:   deps.clock.clone(),
    });

    let validation_state = Arc::new(ValidationState {
        usecase: DecisionUseCaseImpl::new(
            deps.request_repo.clone(),
            resolver,
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
        clock:   deps.clock.clone(),
    });

    let workflow_state = Arc::new(WorkflowState {
        usecase: WorkflowUseCaseImpl::new(
            deps.workflow_repo,
            deps.request_repo,
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
    });

    let delegation_state = Arc::new(DelegationState {
        usecase: DelegationUseCaseImpl::new(
            deps.delegation_repo,
            deps.org_directory,
            deps.tx_manager,
            deps.clock.clone(),
        ),
        clock:   deps.clock,
    });

    // 申請者向け API
    let my_routes = Router::new()
        .route("/hr/my/requests", get(list_my_requests))
        .route("/hr/my/requests/{id}", get(get_my_request))
        .route("/hr/my/requests/{id}/cancel", post(cancel_my_request))
        .route("/hr/my/leave-requests", post(submit_leave_request))
        .route("/hr/my/overtime-requests", post(submit_overtime_request))
        .route("/hr/my/correction-requests", post(submit_correction_request))
        .route(
            "/hr/my/administrative-requests",
            post(submit_administrative_request),
        )
        .with_state(request_state);

    // 承認者向け API
    let validation_routes = Router::new()
        .route("/hr/validation/pending", get(list_pending))
        .route("/hr/validation/{id}/approve", post(approve_request))
        .route("/hr/validation/{id}/reject", post(reject_request))
        .with_state(validation_state);

    // ワークフロー設定 API（workflow:manage）
    let workflow_routes = Router::new()
        .route(
            "/hr/validation/workflows",
            get(list_workflows).post(create_workflow),
        )
        .route(
            "/hr/validation/workflows/{id}",
            get(get_workflow)
                .put(update_workflow)
                .delete(delete_workflow),
        )
        .route(
            "/hr/validation/workflows/{id}/toggle",
            post(toggle_workflow),
        )
        .route(
            "/hr/validation/workflows/{id}/steps",
            get(list_steps).post(add_step),
        )
        .route(
            "/hr/validation/workflows/{id}/steps/{step_id}",
            put(update_step).delete(delete_step),
        )
        .route(
            "/hr/validation/workflows/{id}/steps/{step_id}/move",
            post(move_step),
        )
        .with_state(workflow_state);

    // 委任 API
    let delegation_routes = Router::new()
        .route(
            "/hr/delegations",
            get(list_delegations).post(create_delegation),
        )
        .route("/hr/delegations/{id}", delete(cancel_delegation))
        .with_state(delegation_state);

    Router::new()
        .route("/health", get(health_check))
        .merge(my_routes)
        .merge(validation_routes)
        .merge(workflow_routes)
        .merge(delegation_routes)
}
