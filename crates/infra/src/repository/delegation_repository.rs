//! # DelegationRepository
//!
//! 承認権限の委任の永続化を担当する。取り消しは論理削除（`cancelled_at`）で表す。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validflow_domain::{
    delegation::{Delegation, DelegationId, DelegationRecord},
    employee::UserId,
};

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait DelegationRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError>;

    /// 取り消し状態を反映する
    async fn update(&self, tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &DelegationId) -> Result<Option<Delegation>, InfraError>;

    /// 委任元の委任を取得する（取り消し済みを含む）
    async fn find_by_delegator(&self, delegator: &UserId) -> Result<Vec<Delegation>, InfraError>;

    /// 委任元をトランザクション終了までロックし、その委任を取得する
    ///
    /// 同じ委任元への登録はロックにより直列化される。重複チェックと挿入は
    /// 同じトランザクション内で行うこと。
    async fn find_by_delegator_for_update(
        &self,
        tx: &mut TxContext,
        delegator: &UserId,
    ) -> Result<Vec<Delegation>, InfraError>;

    async fn find_all(&self) -> Result<Vec<Delegation>, InfraError>;

    /// 指定日に効力を持つ委任のうち、委任元が `delegators` に含まれるもの
    async fn find_in_force(
        &self,
        delegators: &[UserId],
        date: NaiveDate,
    ) -> Result<Vec<Delegation>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct DelegationRow {
    id:           Uuid,
    delegator_id: Uuid,
    delegate_id:  Uuid,
    start_date:   NaiveDate,
    end_date:     NaiveDate,
    scope:        serde_json::Value,
    cancelled_at: Option<DateTime<Utc>>,
    created_at:   DateTime<Utc>,
}

impl TryFrom<DelegationRow> for Delegation {
    type Error = InfraError;

    fn try_from(row: DelegationRow) -> Result<Self, Self::Error> {
        Ok(Delegation::from_db(DelegationRecord {
            id:           DelegationId::from_uuid(row.id),
            delegator:    UserId::from_uuid(row.delegator_id),
            delegate:     UserId::from_uuid(row.delegate_id),
            start_date:   row.start_date,
            end_date:     row.end_date,
            scope:        serde_json::from_value(row.scope)?,
            cancelled_at: row.cancelled_at,
            created_at:   row.created_at,
        }))
    }
}

const SELECT_DELEGATIONS: &str = r#"
    SELECT id, delegator_id, delegate_id, start_date, end_date, scope, cancelled_at, created_at
    FROM delegations
"#;

#[derive(Debug, Clone)]
pub struct PostgresDelegationRepository {
    pool: PgPool,
}

impl PostgresDelegationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DelegationRepository for PostgresDelegationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(delegation_id = %delegation.id()))]
    async fn insert(&self, tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO delegations (
                id, delegator_id, delegate_id, start_date, end_date, scope,
                cancelled_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(delegation.id().as_uuid())
        .bind(delegation.delegator().as_uuid())
        .bind(delegation.delegate().as_uuid())
        .bind(delegation.start_date())
        .bind(delegation.end_date())
        .bind(serde_json::to_value(delegation.scope())?)
        .bind(delegation.cancelled_at())
        .bind(delegation.created_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(delegation_id = %delegation.id()))]
    async fn update(&self, tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError> {
        sqlx::query("UPDATE delegations SET cancelled_at = $2 WHERE id = $1")
            .bind(delegation.id().as_uuid())
            .bind(delegation.cancelled_at())
            .execute(tx.conn()?)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(delegation_id = %id))]
    async fn find_by_id(&self, id: &DelegationId) -> Result<Option<Delegation>, InfraError> {
        let row =
            sqlx::query_as::<_, DelegationRow>(&format!("{SELECT_DELEGATIONS} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Delegation::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(delegator = %delegator))]
    async fn find_by_delegator(&self, delegator: &UserId) -> Result<Vec<Delegation>, InfraError> {
        let rows = sqlx::query_as::<_, DelegationRow>(&format!(
            "{SELECT_DELEGATIONS} WHERE delegator_id = $1 ORDER BY start_date"
        ))
        .bind(delegator.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Delegation::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(delegator = %delegator))]
    async fn find_by_delegator_for_update(
        &self,
        tx: &mut TxContext,
        delegator: &UserId,
    ) -> Result<Vec<Delegation>, InfraError> {
        // 委任元の行は存在しないことがあるため、行ロックではなく advisory lock を使う
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(delegator.to_string())
            .execute(tx.conn()?)
            .await?;

        let rows = sqlx::query_as::<_, DelegationRow>(&format!(
            "{SELECT_DELEGATIONS} WHERE delegator_id = $1 ORDER BY start_date"
        ))
        .bind(delegator.as_uuid())
        .fetch_all(tx.conn()?)
        .await?;

        rows.into_iter().map(Delegation::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<Delegation>, InfraError> {
        let rows = sqlx::query_as::<_, DelegationRow>(&format!(
            "{SELECT_DELEGATIONS} ORDER BY start_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Delegation::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(date = %date))]
    async fn find_in_force(
        &self,
        delegators: &[UserId],
        date: NaiveDate,
    ) -> Result<Vec<Delegation>, InfraError> {
        if delegators.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = delegators.iter().map(|u| *u.as_uuid()).collect();
        let rows = sqlx::query_as::<_, DelegationRow>(&format!(
            "{SELECT_DELEGATIONS} WHERE delegator_id = ANY($1) \
             AND cancelled_at IS NULL AND start_date <= $2 AND end_date >= $2"
        ))
        .bind(uuids)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Delegation::try_from).collect()
    }
}
