//! # 申請（決裁台帳）
//!
//! 休暇・残業・打刻修正・書類の各申請を共通エンベロープで扱い、
//! 承認ステータスと決裁履歴の正本を保持する。
//!
//! ## 状態遷移
//!
//! ```text
//! pending ─approve(1)→ approved_n1 ─approve(2)→ … ─approve(N)→ approved
//!    │                      │
//!    ├─reject(k)────────────┴──────────────────────────────→ rejected
//!    └─cancel (申請者のみ) ─────────────────────────────────→ cancelled
//! ```
//!
//! - 現在の承認レベル = 承認済みステップ数 + 1（終端状態では `None`）
//! - 終端状態（approved / rejected / cancelled）は以降の決裁・取り消しを受け付けない
//! - 決裁ごとに [`DecisionRecord`] を 1 件追記する

mod chain;
mod payload;
mod request_type;
mod status;

use chrono::{DateTime, Duration, Utc};
pub use chain::{ChainStep, Decision, DecisionRecord};
pub use payload::RequestPayload;
pub use request_type::{LeaveKind, RequestType};
pub use status::ApprovalStatus;

use crate::{
    DomainError,
    employee::UserId,
    value_objects::{StepOrder, Version},
    workflow::ValidationWorkflowId,
};

define_uuid_id! {
    /// 申請 ID
    pub struct RequestId;
}

/// 申請エンティティ
///
/// ## 楽観的ロック
///
/// 決裁・取り消しのたびに `version` を進める。永続化時に読み込み時の
/// バージョンと比較し、先に別の決裁が記録されていれば更新は失敗する。
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id:             RequestId,
    requester_id:   UserId,
    requester_name: String,
    department:     Option<String>,
    workflow_id:    ValidationWorkflowId,
    payload:        RequestPayload,
    reason:         Option<String>,
    attachment:     Option<String>,
    chain:          Vec<ChainStep>,
    status:         ApprovalStatus,
    history:        Vec<DecisionRecord>,
    version:        Version,
    submitted_at:   DateTime<Utc>,
    updated_at:     DateTime<Utc>,
}

/// 申請パラメータ
pub struct NewRequest {
    pub id:             RequestId,
    pub requester_id:   UserId,
    pub requester_name: String,
    pub department:     Option<String>,
    pub workflow_id:    ValidationWorkflowId,
    pub payload:        RequestPayload,
    pub reason:         Option<String>,
    pub attachment:     Option<String>,
    pub chain:          Vec<ChainStep>,
    pub now:            DateTime<Utc>,
}

/// DB 復元パラメータ
pub struct RequestRecord {
    pub id:             RequestId,
    pub requester_id:   UserId,
    pub requester_name: String,
    pub department:     Option<String>,
    pub workflow_id:    ValidationWorkflowId,
    pub payload:        RequestPayload,
    pub reason:         Option<String>,
    pub attachment:     Option<String>,
    pub chain:          Vec<ChainStep>,
    pub status:         ApprovalStatus,
    pub history:        Vec<DecisionRecord>,
    pub version:        Version,
    pub submitted_at:   DateTime<Utc>,
    pub updated_at:     DateTime<Utc>,
}

/// 決裁パラメータ
#[derive(Debug, Clone)]
pub struct DecisionInput {
    /// 操作者が見ている承認レベル
    pub step_order:   StepOrder,
    pub decision:     Decision,
    pub actor_id:     UserId,
    pub on_behalf_of: Option<UserId>,
    pub comment:      Option<String>,
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn chain_is_dense(chain: &[ChainStep]) -> bool {
    chain
        .iter()
        .enumerate()
        .all(|(index, step)| step.order == StepOrder::from_index(index))
}

impl Request {
    /// 申請を受け付ける
    ///
    /// # Errors
    ///
    /// - `NoWorkflowConfigured`: 承認チェーンが空
    /// - `Validation` / `InvalidRange`: ペイロードの入力不備
    pub fn submit(params: NewRequest) -> Result<Self, DomainError> {
        let request_type = params.payload.request_type();
        if params.chain.is_empty() {
            return Err(DomainError::NoWorkflowConfigured(format!(
                "{} のワークフローにステップがありません",
                request_type
            )));
        }
        if !chain_is_dense(&params.chain) {
            return Err(DomainError::Validation(
                "承認チェーンの順序が連番ではありません".to_string(),
            ));
        }
        params.payload.validate()?;

        Ok(Self {
            id:             params.id,
            requester_id:   params.requester_id,
            requester_name: params.requester_name,
            department:     params.department,
            workflow_id:    params.workflow_id,
            payload:        params.payload,
            reason:         normalize_text(params.reason),
            attachment:     normalize_text(params.attachment),
            chain:          params.chain,
            status:         ApprovalStatus::Pending,
            history:        Vec::new(),
            version:        Version::initial(),
            submitted_at:   params.now,
            updated_at:     params.now,
        })
    }

    /// 既存のデータから復元する
    ///
    /// `approved_n{k}` は k がチェーン長未満のときだけ有効。
    pub fn from_db(record: RequestRecord) -> Result<Self, DomainError> {
        if record.chain.is_empty() || !chain_is_dense(&record.chain) {
            return Err(DomainError::Validation(format!(
                "申請 {} の承認チェーンが不正です",
                record.id
            )));
        }
        if matches!(record.status, ApprovalStatus::ApprovedThrough(k) if k.index() + 1 >= record.chain.len())
        {
            return Err(DomainError::Validation(format!(
                "申請 {} のステータス {} がチェーン長 {} と矛盾しています",
                record.id,
                record.status,
                record.chain.len()
            )));
        }

        Ok(Self {
            id:             record.id,
            requester_id:   record.requester_id,
            requester_name: record.requester_name,
            department:     record.department,
            workflow_id:    record.workflow_id,
            payload:        record.payload,
            reason:         record.reason,
            attachment:     record.attachment,
            chain:          record.chain,
            status:         record.status,
            history:        record.history,
            version:        record.version,
            submitted_at:   record.submitted_at,
            updated_at:     record.updated_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn requester_id(&self) -> &UserId {
        &self.requester_id
    }

    pub fn requester_name(&self) -> &str {
        &self.requester_name
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn workflow_id(&self) -> &ValidationWorkflowId {
        &self.workflow_id
    }

    pub fn request_type(&self) -> RequestType {
        self.payload.request_type()
    }

    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn attachment(&self) -> Option<&str> {
        self.attachment.as_deref()
    }

    pub fn chain(&self) -> &[ChainStep] {
        &self.chain
    }

    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    pub fn history(&self) -> &[DecisionRecord] {
        &self.history
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 現在の承認レベル（終端状態では `None`）
    pub fn current_level(&self) -> Option<StepOrder> {
        match self.status {
            ApprovalStatus::Pending => Some(StepOrder::first()),
            ApprovalStatus::ApprovedThrough(k) => Some(k.next()),
            ApprovalStatus::Approved | ApprovalStatus::Rejected | ApprovalStatus::Cancelled => {
                None
            }
        }
    }

    /// 現在のステップ
    pub fn current_step(&self) -> Option<&ChainStep> {
        self.current_level()
            .and_then(|level| self.chain.get(level.index()))
    }

    /// 現在のレベルに到達した時刻（直前の決裁時刻、なければ申請時刻）
    pub fn level_started_at(&self) -> DateTime<Utc> {
        self.history
            .last()
            .map_or(self.submitted_at, |record| record.decided_at)
    }

    /// 現在ステップの期限（目安）
    ///
    /// 期限を過ぎても自動承認・自動却下・エスカレーションは行わない。
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.current_step().map(|step| {
            self.level_started_at() + Duration::hours(i64::from(step.timeout_hours))
        })
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_at().is_some_and(|due| now > due)
    }

    /// 決裁対象のレベルを検証し、現在のステップを返す
    ///
    /// # Errors
    ///
    /// - `InvalidState`: 終端状態
    /// - `StepMismatch`: 指定レベルが現在のレベルと異なる、または既に決裁済み
    ///   （終端状態でも、指定レベルの決裁が履歴にあれば先を越されたものとして扱う）
    pub fn ensure_current_step(&self, step_order: StepOrder) -> Result<&ChainStep, DomainError> {
        let Some(current) = self.current_level() else {
            if self.history.iter().any(|r| r.step_order == step_order) {
                return Err(DomainError::StepMismatch(format!(
                    "ステップ {} は既に決裁されています",
                    step_order
                )));
            }
            return Err(DomainError::InvalidState(format!(
                "申請は既に {} です",
                self.status
            )));
        };
        if step_order != current {
            return Err(DomainError::StepMismatch(format!(
                "指定されたステップ {} は現在のステップ {} と一致しません",
                step_order, current
            )));
        }
        self.chain.get(current.index()).ok_or_else(|| {
            DomainError::InvalidState(format!("ステップ {} が承認チェーンにありません", current))
        })
    }

    /// 決裁を記録した新しい申請を返す
    ///
    /// 承認者であるかどうかの検証は呼び出し側（委任を考慮した実効承認者の解決）で行う。
    ///
    /// # Errors
    ///
    /// - `InvalidState` / `StepMismatch`: [`ensure_current_step`](Self::ensure_current_step) を参照
    /// - `CommentRequired`: コメントなしの却下
    pub fn decided(self, input: DecisionInput, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let order = self.ensure_current_step(input.step_order)?.order;
        let comment = normalize_text(input.comment);

        let status = match input.decision {
            Decision::Reject if comment.is_none() => return Err(DomainError::CommentRequired),
            Decision::Reject => ApprovalStatus::Rejected,
            Decision::Approve if order.index() + 1 == self.chain.len() => ApprovalStatus::Approved,
            Decision::Approve => ApprovalStatus::ApprovedThrough(order),
        };

        let mut history = self.history.clone();
        history.push(DecisionRecord {
            step_order: order,
            actor_id: input.actor_id,
            on_behalf_of: input.on_behalf_of,
            decision: input.decision,
            comment,
            decided_at: now,
        });

        Ok(Self {
            status,
            history,
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }

    /// 申請者による取り消し
    ///
    /// # Errors
    ///
    /// - `Forbidden`: 申請者本人でない
    /// - `InvalidState`: 終端状態
    pub fn cancelled(self, actor_id: &UserId, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if actor_id != &self.requester_id {
            return Err(DomainError::Forbidden(
                "申請者本人のみ取り消しできます".to_string(),
            ));
        }
        if self.status.is_terminal() {
            return Err(DomainError::InvalidState(format!(
                "{} の申請は取り消せません",
                self.status
            )));
        }
        Ok(Self {
            status: ApprovalStatus::Cancelled,
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::workflow::ApproverSpec;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn chain(approvers: Vec<ApproverSpec>) -> Vec<ChainStep> {
        approvers
            .into_iter()
            .enumerate()
            .map(|(i, approver)| ChainStep {
                order: StepOrder::from_index(i),
                approver,
                approver_name: format!("承認者{}", i + 1),
                timeout_hours: 24,
            })
            .collect()
    }

    fn leave_payload(kind: LeaveKind) -> RequestPayload {
        RequestPayload::Leave {
            leave_kind: kind,
            start_date: NaiveDate::from_ymd_opt(2026, 4, 6).unwrap(),
            end_date:   NaiveDate::from_ymd_opt(2026, 4, 7).unwrap(),
            days:       2.0,
        }
    }

    fn submit(kind: LeaveKind, chain: Vec<ChainStep>, now: DateTime<Utc>) -> Request {
        Request::submit(NewRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            requester_name: "Amina Benali".to_string(),
            department: Some("SALES".to_string()),
            workflow_id: ValidationWorkflowId::new(),
            payload: leave_payload(kind),
            reason: Some("家族旅行".to_string()),
            attachment: None,
            chain,
            now,
        })
        .unwrap()
    }

    #[fixture]
    fn three_step_request(now: DateTime<Utc>) -> Request {
        submit(
            LeaveKind::Annual,
            chain(vec![
                ApproverSpec::Manager,
                ApproverSpec::Role {
                    role: "finance".to_string(),
                },
                ApproverSpec::Hr,
            ]),
            now,
        )
    }

    fn input(step: u32, decision: Decision, comment: Option<&str>) -> DecisionInput {
        DecisionInput {
            step_order: StepOrder::new(step).unwrap(),
            decision,
            actor_id: UserId::new(),
            on_behalf_of: None,
            comment: comment.map(String::from),
        }
    }

    #[rstest]
    fn test_申請直後はpendingでレベル1(three_step_request: Request) {
        assert_eq!(three_step_request.status(), ApprovalStatus::Pending);
        assert_eq!(three_step_request.current_level(), Some(StepOrder::first()));
        assert!(three_step_request.history().is_empty());
    }

    #[rstest]
    fn test_承認チェーンが空なら申請できない(now: DateTime<Utc>) {
        let result = Request::submit(NewRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            requester_name: "Amina".to_string(),
            department: None,
            workflow_id: ValidationWorkflowId::new(),
            payload: leave_payload(LeaveKind::Sick),
            reason: None,
            attachment: None,
            chain: Vec::new(),
            now,
        });
        assert!(matches!(result, Err(DomainError::NoWorkflowConfigured(_))));
    }

    #[rstest]
    fn test_承認承認却下で3件の履歴が残り却下になる(
        three_step_request: Request,
        now: DateTime<Utc>,
    ) {
        let sut = three_step_request
            .decided(input(1, Decision::Approve, None), now)
            .unwrap();
        assert_eq!(sut.status().to_string(), "approved_n1");

        let sut = sut.decided(input(2, Decision::Approve, None), now).unwrap();
        assert_eq!(sut.status().to_string(), "approved_n2");

        let sut = sut
            .decided(input(3, Decision::Reject, Some("書類不備")), now)
            .unwrap();

        assert_eq!(sut.status(), ApprovalStatus::Rejected);
        assert_eq!(sut.history().len(), 3);
        assert_eq!(
            sut.history()
                .iter()
                .map(|r| (r.step_order.as_u32(), r.decision))
                .collect::<Vec<_>>(),
            vec![
                (1, Decision::Approve),
                (2, Decision::Approve),
                (3, Decision::Reject)
            ]
        );
        assert_eq!(sut.version().as_u32(), 4);
    }

    #[rstest]
    fn test_最終ステップの承認でapprovedになる(now: DateTime<Utc>) {
        let request = submit(
            LeaveKind::Sick,
            chain(vec![ApproverSpec::Manager, ApproverSpec::Hr]),
            now,
        );

        let sut = request
            .decided(input(1, Decision::Approve, None), now)
            .unwrap()
            .decided(input(2, Decision::Approve, Some("OK")), now)
            .unwrap();

        assert_eq!(sut.status(), ApprovalStatus::Approved);
        assert_eq!(sut.current_level(), None);
        assert_eq!(sut.history()[1].comment.as_deref(), Some("OK"));
    }

    #[rstest]
    fn test_現在と異なるステップの決裁はstep_mismatch(
        three_step_request: Request,
        now: DateTime<Utc>,
    ) {
        let result = three_step_request.decided(input(2, Decision::Approve, None), now);
        assert!(matches!(result, Err(DomainError::StepMismatch(_))));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("   "))]
    fn test_コメントなしの却下はcomment_required(
        three_step_request: Request,
        now: DateTime<Utc>,
        #[case] comment: Option<&str>,
    ) {
        let result = three_step_request.decided(input(1, Decision::Reject, comment), now);
        assert!(matches!(result, Err(DomainError::CommentRequired)));
    }

    #[rstest]
    fn test_終端状態では決裁も取り消しもできない(
        three_step_request: Request,
        now: DateTime<Utc>,
    ) {
        let requester = three_step_request.requester_id().clone();
        let rejected = three_step_request
            .decided(input(1, Decision::Reject, Some("不可")), now)
            .unwrap();

        let decide = rejected
            .clone()
            .decided(input(2, Decision::Approve, None), now);
        let cancel = rejected.cancelled(&requester, now);

        assert!(matches!(decide, Err(DomainError::InvalidState(_))));
        assert!(matches!(cancel, Err(DomainError::InvalidState(_))));
    }

    #[rstest]
    fn test_決裁済みのステップへの再決裁は終端状態でもstep_mismatch(
        three_step_request: Request,
        now: DateTime<Utc>,
    ) {
        let rejected = three_step_request
            .decided(input(1, Decision::Reject, Some("不可")), now)
            .unwrap();

        let result = rejected
            .clone()
            .decided(input(1, Decision::Approve, None), now);

        assert!(matches!(result, Err(DomainError::StepMismatch(_))));
        assert_eq!(rejected.history().len(), 1);
    }

    #[rstest]
    fn test_申請者は途中段階でも取り消せる(three_step_request: Request, now: DateTime<Utc>) {
        let requester = three_step_request.requester_id().clone();
        let sut = three_step_request
            .decided(input(1, Decision::Approve, None), now)
            .unwrap()
            .cancelled(&requester, now)
            .unwrap();

        assert_eq!(sut.status(), ApprovalStatus::Cancelled);
        assert_eq!(sut.history().len(), 1);
    }

    #[rstest]
    fn test_申請者以外は取り消せない(three_step_request: Request, now: DateTime<Utc>) {
        let result = three_step_request.cancelled(&UserId::new(), now);
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[rstest]
    fn test_レベルは単調に増加し承認済み数プラス1(
        three_step_request: Request,
        now: DateTime<Utc>,
    ) {
        let mut sut = three_step_request;
        for step in 1..=3 {
            assert_eq!(sut.current_level().map(|l| l.as_u32()), Some(step));
            assert_eq!(sut.status().approved_steps() + 1, step);
            sut = sut.decided(input(step, Decision::Approve, None), now).unwrap();
        }
        assert_eq!(sut.current_level(), None);
    }

    #[rstest]
    fn test_期限は直前の決裁時刻からタイムアウト時間後(
        three_step_request: Request,
        now: DateTime<Utc>,
    ) {
        assert_eq!(three_step_request.due_at(), Some(now + Duration::hours(24)));

        let later = now + Duration::hours(30);
        let sut = three_step_request
            .decided(input(1, Decision::Approve, None), later)
            .unwrap();

        assert_eq!(sut.due_at(), Some(later + Duration::hours(24)));
        assert!(!sut.is_overdue(later + Duration::hours(1)));
        assert!(sut.is_overdue(later + Duration::hours(25)));
    }

    #[rstest]
    fn test_チェーン長と矛盾するステータスは復元できない(three_step_request: Request) {
        let record = RequestRecord {
            id: three_step_request.id().clone(),
            requester_id: three_step_request.requester_id().clone(),
            requester_name: three_step_request.requester_name().to_string(),
            department: None,
            workflow_id: three_step_request.workflow_id().clone(),
            payload: three_step_request.payload().clone(),
            reason: None,
            attachment: None,
            chain: three_step_request.chain().to_vec(),
            status: ApprovalStatus::ApprovedThrough(StepOrder::new(3).unwrap()),
            history: Vec::new(),
            version: three_step_request.version(),
            submitted_at: three_step_request.submitted_at(),
            updated_at: three_step_request.updated_at(),
        };

        assert!(Request::from_db(record).is_err());
    }
}
