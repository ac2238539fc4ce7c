//! # 委任ユースケース
//!
//! 承認権限の委任の登録・一覧・取り消しを実装する。
//!
//! 自分の委任は誰でも登録・取り消しできる。他人を委任元とする操作と全件の参照には
//! `delegation:manage` が必要。

use std::sync::Arc;

use chrono::NaiveDate;
use validflow_domain::{
    capability::{Capability, CapabilitySet},
    clock::Clock,
    delegation::{Delegation, DelegationId, DelegationScope, NewDelegation, ensure_no_overlap},
    employee::UserId,
};
use validflow_infra::{
    db::TransactionManager,
    repository::{DelegationRepository, OrgDirectory},
};
use validflow_shared::{event_log::event, log_business_event};

use super::helpers::{FindResultExt, require_capability};
use crate::error::CoreError;

/// 委任の登録入力
pub struct CreateDelegationInput {
    /// 省略時は操作者本人
    pub delegator:  Option<UserId>,
    pub delegate:   UserId,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    pub scope:      DelegationScope,
}

/// 委任ユースケース
pub struct DelegationUseCaseImpl {
    delegation_repo: Arc<dyn DelegationRepository>,
    org_directory:   Arc<dyn OrgDirectory>,
    tx_manager:      Arc<dyn TransactionManager>,
    clock:           Arc<dyn Clock>,
}

impl DelegationUseCaseImpl {
    pub fn new(
        delegation_repo: Arc<dyn DelegationRepository>,
        org_directory: Arc<dyn OrgDirectory>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            delegation_repo,
            org_directory,
            tx_manager,
            clock,
        }
    }

    /// 委任を登録する
    ///
    /// # Errors
    ///
    /// - `Forbidden`: 他人を委任元とする権限がない
    /// - `InvalidRange`: 開始日が終了日より後
    /// - `OverlappingDelegation`: 同じ委任元の有効な委任と範囲・期間が重なる
    pub async fn create(
        &self,
        actor_id: &UserId,
        capabilities: &CapabilitySet,
        input: CreateDelegationInput,
    ) -> Result<Delegation, CoreError> {
        // 1. 委任元の決定と権限チェック
        let delegator = input.delegator.unwrap_or_else(|| actor_id.clone());
        if &delegator != actor_id {
            require_capability(capabilities, &Capability::delegation_manage())?;
        }

        // 2. 委任先の存在確認
        self.org_directory
            .find_employee(&input.delegate)
            .await
            .or_not_found("委任先")?;

        // 3. 委任を作成
        let delegation = Delegation::new(NewDelegation {
            id: DelegationId::new(),
            delegator,
            delegate: input.delegate,
            start_date: input.start_date,
            end_date: input.end_date,
            scope: input.scope,
            now: self.clock.now(),
        })?;

        // 4. 委任元をロックしたうえで重複を確認して保存
        let mut tx = self.tx_manager.begin().await?;
        let existing = self
            .delegation_repo
            .find_by_delegator_for_update(&mut tx, delegation.delegator())
            .await?;
        ensure_no_overlap(&delegation, &existing)?;
        self.delegation_repo.insert(&mut tx, &delegation).await?;
        tx.commit().await?;

        log_business_event!(
            event.category = event::category::DELEGATION,
            event.action = event::action::DELEGATION_CREATED,
            event.entity_type = event::entity_type::DELEGATION,
            event.entity_id = %delegation.id(),
            event.actor_id = %actor_id,
            event.delegator = %delegation.delegator(),
            event.delegate = %delegation.delegate(),
            event.result = event::result::SUCCESS,
            "委任を登録しました"
        );

        Ok(delegation)
    }

    /// 委任一覧
    ///
    /// `delegation:manage` を持つ場合は全件、それ以外は自分が委任元のもののみ。
    pub async fn list(
        &self,
        actor_id: &UserId,
        capabilities: &CapabilitySet,
    ) -> Result<Vec<Delegation>, CoreError> {
        let delegations = if capabilities.allows(&Capability::delegation_manage()) {
            self.delegation_repo.find_all().await?
        } else {
            self.delegation_repo.find_by_delegator(actor_id).await?
        };
        Ok(delegations)
    }

    /// 委任を取り消す
    ///
    /// 取り消した時点から効力を失う。既に決裁された分には影響しない。
    pub async fn cancel(
        &self,
        actor_id: &UserId,
        capabilities: &CapabilitySet,
        id: &DelegationId,
    ) -> Result<Delegation, CoreError> {
        let delegation = self
            .delegation_repo
            .find_by_id(id)
            .await
            .or_not_found("委任")?;
        if delegation.delegator() != actor_id {
            require_capability(capabilities, &Capability::delegation_manage())?;
        }

        let cancelled = delegation.cancelled(self.clock.now())?;

        let mut tx = self.tx_manager.begin().await?;
        self.delegation_repo.update(&mut tx, &cancelled).await?;
        tx.commit().await?;

        log_business_event!(
            event.category = event::category::DELEGATION,
            event.action = event::action::DELEGATION_CANCELLED,
            event.entity_type = event::entity_type::DELEGATION,
            event.entity_id = %cancelled.id(),
            event.actor_id = %actor_id,
            event.result = event::result::SUCCESS,
            "委任を取り消しました"
        );

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use validflow_domain::{clock::FixedClock, employee::Employee, request::RequestType};
    use async_trait::async_trait;
    use validflow_infra::{
        db::TxContext,
        error::InfraError,
        mock::{MockDelegationRepository, MockOrgDirectory, MockTransactionManager},
    };

    use super::*;

    /// 委任元の委任を読んだ直後に他のタスクへ実行を譲るリポジトリ
    ///
    /// 重複チェックと保存の間に別の登録が割り込む状況を作る。
    struct YieldingDelegationRepository(MockDelegationRepository);

    #[async_trait]
    impl DelegationRepository for YieldingDelegationRepository {
        async fn insert(&self, tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError> {
            self.0.insert(tx, delegation).await
        }

        async fn update(&self, tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError> {
            self.0.update(tx, delegation).await
        }

        async fn find_by_id(&self, id: &DelegationId) -> Result<Option<Delegation>, InfraError> {
            self.0.find_by_id(id).await
        }

        async fn find_by_delegator(&self, delegator: &UserId) -> Result<Vec<Delegation>, InfraError> {
            let found = self.0.find_by_delegator(delegator).await;
            tokio::task::yield_now().await;
            found
        }

        async fn find_by_delegator_for_update(
            &self,
            tx: &mut TxContext,
            delegator: &UserId,
        ) -> Result<Vec<Delegation>, InfraError> {
            let found = self.0.find_by_delegator_for_update(tx, delegator).await;
            tokio::task::yield_now().await;
            found
        }

        async fn find_all(&self) -> Result<Vec<Delegation>, InfraError> {
            self.0.find_all().await
        }

        async fn find_in_force(
            &self,
            delegators: &[UserId],
            date: NaiveDate,
        ) -> Result<Vec<Delegation>, InfraError> {
            self.0.find_in_force(delegators, date).await
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct Fixture {
        sut:      DelegationUseCaseImpl,
        manager:  UserId,
        delegate: UserId,
    }

    fn setup() -> Fixture {
        let directory = MockOrgDirectory::new();
        let manager = UserId::new();
        let delegate = UserId::new();
        directory.add_employee(Employee::new(manager.clone(), "佐藤 課長", None, None));
        directory.add_employee(Employee::new(delegate.clone(), "鈴木 主任", None, None));
        let sut = DelegationUseCaseImpl::new(
            Arc::new(MockDelegationRepository::new()),
            Arc::new(directory),
            Arc::new(MockTransactionManager),
            Arc::new(FixedClock::new(now())),
        );
        Fixture {
            sut,
            manager,
            delegate,
        }
    }

    fn input(delegate: &UserId, start: u32, end: u32, scope: DelegationScope) -> CreateDelegationInput {
        CreateDelegationInput {
            delegator: None,
            delegate: delegate.clone(),
            start_date: date(start),
            end_date: date(end),
            scope,
        }
    }

    fn no_caps() -> CapabilitySet {
        CapabilitySet::default()
    }

    #[tokio::test]
    async fn test_自分の委任を登録できる() {
        let f = setup();

        let delegation = f
            .sut
            .create(&f.manager, &no_caps(), input(&f.delegate, 1, 10, DelegationScope::All))
            .await
            .unwrap();

        assert_eq!(delegation.delegator(), &f.manager);
        assert_eq!(delegation.delegate(), &f.delegate);
        assert!(delegation.is_active());
        assert_eq!(f.sut.list(&f.manager, &no_caps()).await.unwrap().len(), 1);
    }

    #[rstest]
    #[case::期間が重なる(5, 15, DelegationScope::All, Some("overlapping_delegation"))]
    #[case::期間が重ならない(11, 20, DelegationScope::All, None)]
    #[case::範囲が重ならない(
        5,
        15,
        DelegationScope::Types(vec![RequestType::Overtime]),
        None
    )]
    #[tokio::test]
    async fn test_同じ委任元の委任は範囲と期間が重なると登録できない(
        #[case] start: u32,
        #[case] end: u32,
        #[case] scope: DelegationScope,
        #[case] expected: Option<&str>,
    ) {
        let f = setup();
        f.sut
            .create(
                &f.manager,
                &no_caps(),
                input(
                    &f.delegate,
                    1,
                    10,
                    DelegationScope::Types(vec![RequestType::Annual, RequestType::Sick]),
                ),
            )
            .await
            .unwrap();

        let result = f
            .sut
            .create(&f.manager, &no_caps(), input(&f.delegate, start, end, scope))
            .await;

        assert_eq!(result.err().map(|e| e.code()), expected);
    }

    #[tokio::test]
    async fn test_開始日が終了日より後ならinvalid_range() {
        let f = setup();

        let err = f
            .sut
            .create(&f.manager, &no_caps(), input(&f.delegate, 10, 1, DelegationScope::All))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "invalid_range");
    }

    #[tokio::test]
    async fn test_存在しない委任先は登録できない() {
        let f = setup();

        let err = f
            .sut
            .create(&f.manager, &no_caps(), input(&UserId::new(), 1, 10, DelegationScope::All))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_他人を委任元とするには管理権限が必要() {
        let f = setup();
        let admin = UserId::new();
        let mut on_behalf = input(&f.delegate, 1, 10, DelegationScope::All);
        on_behalf.delegator = Some(f.manager.clone());

        let denied = f.sut.create(&admin, &no_caps(), on_behalf).await;

        let mut on_behalf = input(&f.delegate, 1, 10, DelegationScope::All);
        on_behalf.delegator = Some(f.manager.clone());
        let allowed = f
            .sut
            .create(&admin, &CapabilitySet::parse("delegation:manage"), on_behalf)
            .await
            .unwrap();

        assert_eq!(denied.unwrap_err().code(), "not_authorized");
        assert_eq!(allowed.delegator(), &f.manager);
    }

    #[tokio::test]
    async fn test_取り消した委任は重複チェックの対象外になる() {
        let f = setup();
        let first = f
            .sut
            .create(&f.manager, &no_caps(), input(&f.delegate, 1, 10, DelegationScope::All))
            .await
            .unwrap();

        let cancelled = f
            .sut
            .cancel(&f.manager, &no_caps(), first.id())
            .await
            .unwrap();
        let again = f
            .sut
            .cancel(&f.manager, &no_caps(), first.id())
            .await;
        let replacement = f
            .sut
            .create(&f.manager, &no_caps(), input(&f.delegate, 1, 10, DelegationScope::All))
            .await;

        assert!(!cancelled.is_active());
        assert_eq!(again.unwrap_err().code(), "invalid_state");
        assert!(replacement.is_ok());
    }

    #[tokio::test]
    async fn test_委任元でも管理者でもなければ取り消せない() {
        let f = setup();
        let delegation = f
            .sut
            .create(&f.manager, &no_caps(), input(&f.delegate, 1, 10, DelegationScope::All))
            .await
            .unwrap();

        let err = f
            .sut
            .cancel(&f.delegate, &no_caps(), delegation.id())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "not_authorized");
    }

    #[tokio::test]
    async fn test_一覧は管理権限があれば全件それ以外は自分の委任のみ() {
        let f = setup();
        let other = UserId::new();
        f.sut
            .create(&f.manager, &no_caps(), input(&f.delegate, 1, 10, DelegationScope::All))
            .await
            .unwrap();
        f.sut
            .create(&other, &no_caps(), input(&f.delegate, 1, 10, DelegationScope::All))
            .await
            .unwrap();

        let own = f.sut.list(&f.manager, &no_caps()).await.unwrap();
        let all = f
            .sut
            .list(&other, &CapabilitySet::parse("delegation:manage"))
            .await
            .unwrap();

        assert_eq!(own.len(), 1);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_同じ委任元への同時登録は一件だけ成功する() {
        let directory = MockOrgDirectory::new();
        let manager = UserId::new();
        let first = UserId::new();
        let second = UserId::new();
        directory.add_employee(Employee::new(manager.clone(), "佐藤 課長", None, None));
        directory.add_employee(Employee::new(first.clone(), "鈴木 主任", None, None));
        directory.add_employee(Employee::new(second.clone(), "高橋 主任", None, None));
        let repo = MockDelegationRepository::new();
        let sut = DelegationUseCaseImpl::new(
            Arc::new(YieldingDelegationRepository(repo.clone())),
            Arc::new(directory),
            Arc::new(MockTransactionManager),
            Arc::new(FixedClock::new(now())),
        );

        let caps = no_caps();
        let (a, b) = tokio::join!(
            sut.create(&manager, &caps, input(&first, 1, 10, DelegationScope::All)),
            sut.create(&manager, &caps, input(&second, 5, 15, DelegationScope::All)),
        );

        let codes: Vec<_> = [a, b]
            .into_iter()
            .filter_map(|r| r.err().map(|e| e.code()))
            .collect();
        assert_eq!(codes, vec!["overlapping_delegation"]);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
