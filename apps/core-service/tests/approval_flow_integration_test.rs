//! 申請・決裁 API 統合テスト
//!
//! 申請から最終決裁までを HTTP 経由で通し、承認チェーンの進行と
//! エラーレスポンスの形を検証する。
//!
//! ## テストケース
//!
//! - 病気休暇: 上長 → 人事の 2 段階承認
//! - 3 段階チェーンで承認・承認・却下
//! - 承認レベルの不一致と同じステップへの二重決裁
//! - 委任期間中は委任先、期間後は委任元が決裁する
//! - 打刻修正・残業・書類申請の受付と取り消し
//! - エラーレスポンスのエンベロープ（入力の形式エラーを含む）

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{As, TestEnv, create_workflow, date, decide, send, step, submit_sick_leave};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_病気休暇は上長と人事の承認でapprovedになる() {
    let env = TestEnv::new();
    let manager = env.employee("佐藤 課長", Some("sales"), None);
    let requester = env.employee("山田 太郎", Some("sales"), Some(&manager));
    let hr = env.employee("人事 花子", Some("hr"), None);
    env.grant_role(&hr, "hr");
    let admin = env.employee("管理者", None, None);
    let app = env.app_on(date(2026, 4, 6));
    create_workflow(
        &app,
        &admin,
        "SICK",
        None,
        &[
            step(json!({"type": "manager"}), "上長", 48),
            step(json!({"type": "hr"}), "人事", 72),
        ],
    )
    .await;

    let request_id = submit_sick_leave(&app, &requester, date(2026, 4, 6)).await;

    // 1 段目: 上長の承認待ち
    let (_, manager_pending) = send(
        &app,
        Method::GET,
        "/hr/validation/pending",
        Some(As::user(&manager)),
        None,
    )
    .await;
    let (_, hr_pending) = send(&app, Method::GET, "/hr/validation/pending", Some(As::user(&hr)), None).await;
    assert_eq!(manager_pending["data"].as_array().unwrap().len(), 1);
    assert_eq!(manager_pending["data"][0]["id"], request_id.as_str());
    assert_eq!(manager_pending["data"][0]["current_level"], 1);
    assert_eq!(manager_pending["data"][0]["overdue"], false);
    assert_eq!(hr_pending["data"].as_array().unwrap().len(), 0);

    let (status, body) = decide(
        &app,
        &manager,
        &request_id,
        "approve",
        json!({"request_type": "SICK", "step_order": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved_n1");
    assert_eq!(body["data"]["current_level"], 2);

    // 2 段目: 人事の承認待ち
    let (_, hr_pending) = send(&app, Method::GET, "/hr/validation/pending", Some(As::user(&hr)), None).await;
    assert_eq!(hr_pending["data"][0]["id"], request_id.as_str());

    let (status, body) = decide(
        &app,
        &hr,
        &request_id,
        "approve",
        json!({"step_order": 2, "comment": "確認しました"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved");
    assert!(body["data"]["current_level"].is_null());

    // 申請者から見た詳細
    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/hr/my/requests/{request_id}"),
        Some(As::user(&requester)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"]["status"], "approved");
    assert_eq!(detail["data"]["request_type"], "SICK");
    assert_eq!(detail["data"]["chain"].as_array().unwrap().len(), 2);
    let history = detail["data"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["actor_id"], manager.to_string());
    assert_eq!(history[1]["actor_id"], hr.to_string());
    assert_eq!(history[1]["comment"], "確認しました");
}

#[tokio::test]
async fn test_3段階チェーンで承認承認却下するとrejectedで以後の決裁は受け付けない() {
    let env = TestEnv::new();
    let requester = env.employee("山田 太郎", Some("dev"), None);
    let first = env.employee("一次承認者", None, None);
    let second = env.employee("二次承認者", None, None);
    let third = env.employee("三次承認者", None, None);
    let admin = env.employee("管理者", None, None);
    let app = env.app_on(date(2026, 4, 6));
    create_workflow(
        &app,
        &admin,
        "ANNUAL",
        None,
        &[
            step(json!({"type": "user", "user_id": first.to_string()}), "一次", 24),
            step(json!({"type": "user", "user_id": second.to_string()}), "二次", 24),
            step(json!({"type": "user", "user_id": third.to_string()}), "三次", 24),
        ],
    )
    .await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/hr/my/leave-requests",
        Some(As::user(&requester)),
        Some(json!({
            "leave_kind": "ANNUAL",
            "start_date": "2026-04-13",
            "end_date": "2026-04-14",
            "days": 2.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = decide(&app, &first, &request_id, "approve", json!({"step_order": 1})).await;
    assert_eq!(body["data"]["status"], "approved_n1");
    let (_, body) = decide(&app, &second, &request_id, "approve", json!({"step_order": 2})).await;
    assert_eq!(body["data"]["status"], "approved_n2");

    let (status, body) = decide(&app, &third, &request_id, "reject", json!({"step_order": 3})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "comment_required");

    let (status, body) = decide(
        &app,
        &third,
        &request_id,
        "reject",
        json!({"step_order": 3, "comment": "繁忙期のため"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "rejected");
    let decisions: Vec<&str> = body["data"]["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["decision"].as_str().unwrap())
        .collect();
    assert_eq!(decisions, vec!["approve", "approve", "reject"]);

    let (status, body) = decide(&app, &third, &request_id, "approve", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/hr/my/requests/{request_id}/cancel"),
        Some(As::user(&requester)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state");
}

#[tokio::test]
async fn test_承認レベルの不一致と二重決裁はstep_mismatch() {
    let env = TestEnv::new();
    let manager = env.employee("佐藤 課長", None, None);
    let requester = env.employee("山田 太郎", None, Some(&manager));
    let hr1 = env.employee("人事 一郎", None, None);
    let hr2 = env.employee("人事 二郎", None, None);
    env.grant_role(&hr1, "hr");
    env.grant_role(&hr2, "hr");
    let admin = env.employee("管理者", None, None);
    let app = env.app_on(date(2026, 4, 6));
    create_workflow(
        &app,
        &admin,
        "SICK",
        None,
        &[
            step(json!({"type": "manager"}), "上長", 48),
            step(json!({"type": "hr"}), "人事", 72),
        ],
    )
    .await;
    let request_id = submit_sick_leave(&app, &requester, date(2026, 4, 6)).await;

    // 上長の承認前に 2 段目を決裁しようとする
    let (status, body) = decide(&app, &hr1, &request_id, "approve", json!({"step_order": 2})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "step_mismatch");

    // 承認者でない人事は 1 段目を決裁できない
    let (status, body) = decide(&app, &hr1, &request_id, "approve", json!({"step_order": 1})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "not_authorized");

    decide(&app, &manager, &request_id, "approve", json!({"step_order": 1})).await;
    let (status, _) = decide(&app, &hr1, &request_id, "approve", json!({"step_order": 2})).await;
    assert_eq!(status, StatusCode::OK);

    // 同じステップを見ていたもう一人の人事
    let (status, body) = decide(&app, &hr2, &request_id, "approve", json!({"step_order": 2})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "step_mismatch");

    let (_, detail) = send(
        &app,
        Method::GET,
        &format!("/hr/my/requests/{request_id}"),
        Some(As::user(&requester)),
        None,
    )
    .await;
    assert_eq!(detail["data"]["status"], "approved");
    assert_eq!(detail["data"]["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_申請種別を取り違えた決裁はvalidation_error() {
    let env = TestEnv::new();
    let manager = env.employee("佐藤 課長", None, None);
    let requester = env.employee("山田 太郎", None, Some(&manager));
    let admin = env.employee("管理者", None, None);
    let app = env.app_on(date(2026, 4, 6));
    create_workflow(&app, &admin, "SICK", None, &[step(json!({"type": "manager"}), "上長", 48)]).await;
    let request_id = submit_sick_leave(&app, &requester, date(2026, 4, 6)).await;

    let (status, body) = decide(
        &app,
        &manager,
        &request_id,
        "approve",
        json!({"request_type": "ANNUAL"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_委任期間中は委任先が期間後は委任元が決裁する() {
    let env = TestEnv::new();
    let manager = env.employee("佐藤 課長", Some("sales"), None);
    let delegate = env.employee("鈴木 主任", Some("sales"), None);
    let requester = env.employee("山田 太郎", Some("sales"), Some(&manager));
    let admin = env.employee("管理者", None, None);

    let day1 = env.app_on(date(2026, 4, 1));
    create_workflow(&day1, &admin, "SICK", None, &[step(json!({"type": "manager"}), "上長", 48)]).await;
    let (status, body) = send(
        &day1,
        Method::POST,
        "/hr/delegations",
        Some(As::user(&manager)),
        Some(json!({
            "delegate": delegate.to_string(),
            "start_date": "2026-04-01",
            "end_date": "2026-04-10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["active"], true);
    let during_id = submit_sick_leave(&day1, &requester, date(2026, 4, 2)).await;
    let after_id = submit_sick_leave(&day1, &requester, date(2026, 4, 3)).await;

    // 4/5: 委任期間中
    let day5 = env.app_on(date(2026, 4, 5));
    let (_, delegate_pending) = send(&day5, Method::GET, "/hr/validation/pending", Some(As::user(&delegate)), None).await;
    let (_, manager_pending) = send(&day5, Method::GET, "/hr/validation/pending", Some(As::user(&manager)), None).await;
    assert_eq!(delegate_pending["data"].as_array().unwrap().len(), 2);
    assert_eq!(delegate_pending["data"][0]["on_behalf_of"], manager.to_string());
    assert_eq!(manager_pending["data"].as_array().unwrap().len(), 0);

    let (status, body) = decide(&day5, &manager, &during_id, "approve", json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "not_authorized");

    let (status, body) = decide(&day5, &delegate, &during_id, "approve", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["history"][0]["actor_id"], delegate.to_string());
    assert_eq!(body["data"]["history"][0]["on_behalf_of"], manager.to_string());

    // 4/15: 委任期間後
    let day15 = env.app_on(date(2026, 4, 15));
    let (status, body) = decide(&day15, &delegate, &after_id, "approve", json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "not_authorized");

    let (status, body) = decide(&day15, &manager, &after_id, "approve", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["history"][0]["on_behalf_of"].is_null());

    let (_, delegations) = send(&day15, Method::GET, "/hr/delegations", Some(As::user(&manager)), None).await;
    assert_eq!(delegations["data"][0]["active"], false);
}

#[tokio::test]
async fn test_種別ごとの申請を受け付け申請者は取り消せる() {
    let env = TestEnv::new();
    let manager = env.employee("佐藤 課長", None, None);
    let requester = env.employee("山田 太郎", None, Some(&manager));
    let admin = env.employee("管理者", None, None);
    let app = env.app_on(date(2026, 4, 6));
    for trigger in ["heures_sup", "correction", "administrative"] {
        create_workflow(&app, &admin, trigger, None, &[step(json!({"type": "manager"}), "上長", 24)]).await;
    }

    let (status, overtime) = send(
        &app,
        Method::POST,
        "/hr/my/overtime-requests",
        Some(As::user(&requester)),
        Some(json!({"work_date": "2026-04-06", "hours": 2.5, "reason": "リリース対応"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{overtime}");
    assert_eq!(overtime["data"]["request_type"], "heures_sup");
    assert_eq!(overtime["data"]["payload"]["kind"], "overtime");

    let (status, correction) = send(
        &app,
        Method::POST,
        "/hr/my/correction-requests",
        Some(As::user(&requester)),
        Some(json!({
            "request_date": "2026-04-03",
            "requested_check_in": "09:00:00",
            "requested_check_out": "18:00:00",
            "reason": "打刻漏れ",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{correction}");
    assert_eq!(correction["data"]["request_type"], "correction");

    let (status, administrative) = send(
        &app,
        Method::POST,
        "/hr/my/administrative-requests",
        Some(As::user(&requester)),
        Some(json!({"document_kind": "在籍証明書"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{administrative}");
    let administrative_id = administrative["data"]["id"].as_str().unwrap().to_string();

    let (status, cancelled) = send(
        &app,
        Method::POST,
        &format!("/hr/my/requests/{administrative_id}/cancel"),
        Some(As::user(&requester)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status"], "cancelled");

    let (_, mine) = send(&app, Method::GET, "/hr/my/requests", Some(As::user(&requester)), None).await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 3);

    let (_, pending) = send(&app, Method::GET, "/hr/validation/pending?type=heures_sup", Some(As::user(&manager)), None).await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 1);
    assert_eq!(pending["data"][0]["id"], overtime["data"]["id"]);
}

#[tokio::test]
async fn test_ワークフロー未設定の申請はno_workflow_configured() {
    let env = TestEnv::new();
    let requester = env.employee("山田 太郎", None, None);
    let app = env.app_on(date(2026, 4, 6));

    let (status, body) = send(
        &app,
        Method::POST,
        "/hr/my/overtime-requests",
        Some(As::user(&requester)),
        Some(json!({"work_date": "2026-04-06", "hours": 1.0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "no_workflow_configured");
}

#[tokio::test]
async fn test_エラーレスポンスは共通のエンベロープで返る() {
    let env = TestEnv::new();
    let requester = env.employee("山田 太郎", None, None);
    let app = env.app_on(date(2026, 4, 6));

    let (status, unauthenticated) = send(&app, Method::GET, "/hr/my/requests", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unauthenticated["success"], false);
    assert_eq!(unauthenticated["code"], "unauthorized");
    assert!(unauthenticated["error"].is_string());

    let (status, not_found) = send(
        &app,
        Method::GET,
        &format!("/hr/my/requests/{}", uuid::Uuid::now_v7()),
        Some(As::user(&requester)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        not_found,
        json!({"success": false, "code": "not_found", "error": "申請が見つかりません"})
    );
}

#[tokio::test]
async fn test_入力の形式エラーも共通のエンベロープで返る() {
    let env = TestEnv::new();
    let requester = env.employee("山田 太郎", None, None);
    let app = env.app_on(date(2026, 4, 6));
    let request_id = uuid::Uuid::now_v7();

    let cases = [
        (
            Method::POST,
            format!("/hr/validation/{request_id}/reject"),
            Some(json!({"comment": 42})),
        ),
        (Method::POST, "/hr/my/leave-requests".to_string(), Some(json!("休暇"))),
        (Method::GET, "/hr/my/requests/not-a-uuid".to_string(), None),
        (Method::GET, "/hr/validation/pending?type=UNKNOWN".to_string(), None),
    ];

    for (method, uri, body) in cases {
        let (status, response) = send(&app, method, &uri, Some(As::user(&requester)), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response["success"], false, "{uri}");
        assert_eq!(response["code"], "bad_request", "{uri}");
        assert!(response["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn test_ヘルスチェックは認証なしで応答する() {
    let env = TestEnv::new();
    let app = env.app_on(date(2026, 4, 6));

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
