//! 統合テスト用のヘルパー
//!
//! インメモリのリポジトリを共有したまま、日付ごとに固定時刻のルーターを組み立てる。

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::{Value as JsonValue, json};
use tower::ServiceExt;
use validflow_core_service::app::{AppDependencies, build_app};
use validflow_domain::{
    clock::FixedClock,
    employee::{Employee, UserId},
};
use validflow_infra::mock::{
    MockDelegationRepository,
    MockOrgDirectory,
    MockRequestRepository,
    MockTransactionManager,
    MockValidationWorkflowRepository,
};

pub const HR_ROLE: &str = "hr";

/// テスト用の組織と永続化層
#[derive(Default)]
pub struct TestEnv {
    pub requests:    MockRequestRepository,
    pub workflows:   MockValidationWorkflowRepository,
    pub delegations: MockDelegationRepository,
    pub directory:   MockOrgDirectory,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定日の正午に固定したルーター
    pub fn app_on(&self, date: NaiveDate) -> Router {
        build_app(AppDependencies {
            request_repo:    Arc::new(self.requests.clone()),
            workflow_repo:   Arc::new(self.workflows.clone()),
            delegation_repo: Arc::new(self.delegations.clone()),
            org_directory:   Arc::new(self.directory.clone()),
            tx_manager:      Arc::new(MockTransactionManager),
            clock:           Arc::new(FixedClock::on(date)),
            hr_role:         HR_ROLE.to_string(),
        })
    }

    /// 社員を登録して ID を返す
    pub fn employee(
        &self,
        name: &str,
        department: Option<&str>,
        manager: Option<&UserId>,
    ) -> UserId {
        let id = UserId::new();
        self.directory.add_employee(Employee::new(
            id.clone(),
            name,
            department.map(String::from),
            manager.cloned(),
        ));
        id
    }

    pub fn grant_role(&self, user_id: &UserId, role: &str) {
        self.directory.grant_role(user_id, role);
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 操作者ヘッダー
pub struct As<'a> {
    pub user:         &'a UserId,
    pub capabilities: &'a str,
}

impl<'a> As<'a> {
    pub fn user(user: &'a UserId) -> Self {
        Self {
            user,
            capabilities: "",
        }
    }

    pub fn admin(user: &'a UserId) -> Self {
        Self {
            user,
            capabilities: "workflow:manage,delegation:manage",
        }
    }
}

/// リクエストを送り、ステータスと JSON ボディを返す（ボディが空なら `null`）
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    actor: Option<As<'_>>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header("x-user-id", actor.user.to_string())
            .header("x-user-capabilities", actor.capabilities);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// ワークフローを作成し、ステップを順に追加して ID を返す
pub async fn create_workflow(
    app: &Router,
    admin: &UserId,
    trigger: &str,
    segment: Option<&str>,
    steps: &[JsonValue],
) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/hr/validation/workflows",
        Some(As::admin(admin)),
        Some(json!({
            "name": format!("{} 承認", trigger),
            "trigger": trigger,
            "segment": segment,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    for step in steps {
        let (status, body) = send(
            app,
            Method::POST,
            &format!("/hr/validation/workflows/{id}/steps"),
            Some(As::admin(admin)),
            Some(step.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    id
}

/// 承認者指定ごとのステップ
pub fn step(approver: JsonValue, name: &str, timeout_hours: u32) -> JsonValue {
    json!({
        "approver": approver,
        "approver_name": name,
        "timeout_hours": timeout_hours,
    })
}

/// 1 日の病気休暇を申請して ID を返す
pub async fn submit_sick_leave(app: &Router, requester: &UserId, day: NaiveDate) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/hr/my/leave-requests",
        Some(As::user(requester)),
        Some(json!({
            "leave_kind": "SICK",
            "start_date": day,
            "end_date": day,
            "days": 1.0,
            "reason": "発熱のため",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

/// 決裁する
pub async fn decide(
    app: &Router,
    actor: &UserId,
    request_id: &str,
    action: &str,
    body: JsonValue,
) -> (StatusCode, JsonValue) {
    send(
        app,
        Method::POST,
        &format!("/hr/validation/{request_id}/{action}"),
        Some(As::user(actor)),
        Some(body),
    )
    .await
}
