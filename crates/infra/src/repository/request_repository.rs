//! # RequestRepository
//!
//! 申請（承認チェーンのスナップショットと決裁履歴を含む）の永続化を担当する。
//!
//! チェーン・履歴・申請内容は jsonb 列に保存する。決裁の記録はバージョンチェック付きの
//! UPDATE で行い、同じ版に対する二つ目の決裁は競合エラーになる。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validflow_domain::{
    employee::UserId,
    request::{Request, RequestId, RequestRecord, RequestType},
    value_objects::Version,
    workflow::ValidationWorkflowId,
};

use crate::{db::TxContext, error::InfraError};

/// 申請リポジトリトレイト
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, request: &Request) -> Result<(), InfraError>;

    /// バージョンチェック付きでステータスと履歴を更新する
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: 読み込み後に別の決裁が記録された
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        request: &Request,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, InfraError>;

    /// 申請者の申請を新しい順に取得する
    async fn find_by_requester(&self, requester_id: &UserId) -> Result<Vec<Request>, InfraError>;

    /// 終端状態でない申請を古い順に取得する
    async fn find_open(
        &self,
        request_type: Option<RequestType>,
    ) -> Result<Vec<Request>, InfraError>;

    /// ワークフローに紐づく未完了の申請数
    async fn count_open_by_workflow(
        &self,
        workflow_id: &ValidationWorkflowId,
    ) -> Result<u64, InfraError>;
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id:             Uuid,
    requester_id:   Uuid,
    requester_name: String,
    department:     Option<String>,
    workflow_id:    Uuid,
    payload:        serde_json::Value,
    reason:         Option<String>,
    attachment:     Option<String>,
    chain:          serde_json::Value,
    status:         String,
    history:        serde_json::Value,
    version:        i32,
    submitted_at:   DateTime<Utc>,
    updated_at:     DateTime<Utc>,
}

impl TryFrom<RequestRow> for Request {
    type Error = InfraError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(Request::from_db(RequestRecord {
            id:             RequestId::from_uuid(row.id),
            requester_id:   UserId::from_uuid(row.requester_id),
            requester_name: row.requester_name,
            department:     row.department,
            workflow_id:    ValidationWorkflowId::from_uuid(row.workflow_id),
            payload:        serde_json::from_value(row.payload)?,
            reason:         row.reason,
            attachment:     row.attachment,
            chain:          serde_json::from_value(row.chain)?,
            status:         row.status.parse()?,
            history:        serde_json::from_value(row.history)?,
            version:        Version::try_from(row.version)?,
            submitted_at:   row.submitted_at,
            updated_at:     row.updated_at,
        })?)
    }
}

const SELECT_REQUESTS: &str = r#"
    SELECT id, requester_id, requester_name, department, workflow_id, payload, reason,
           attachment, chain, status, history, version, submitted_at, updated_at
    FROM requests
"#;

const OPEN_CONDITION: &str = "status NOT IN ('approved', 'rejected', 'cancelled')";

/// PostgreSQL 実装の RequestRepository
#[derive(Debug, Clone)]
pub struct PostgresRequestRepository {
    pool: PgPool,
}

impl PostgresRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestRepository for PostgresRequestRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(request_id = %request.id()))]
    async fn insert(&self, tx: &mut TxContext, request: &Request) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, requester_id, requester_name, department, workflow_id, request_type,
                payload, reason, attachment, chain, status, history, version,
                submitted_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.requester_id().as_uuid())
        .bind(request.requester_name())
        .bind(request.department())
        .bind(request.workflow_id().as_uuid())
        .bind(request.request_type().as_str())
        .bind(serde_json::to_value(request.payload())?)
        .bind(request.reason())
        .bind(request.attachment())
        .bind(serde_json::to_value(request.chain())?)
        .bind(request.status().to_string())
        .bind(serde_json::to_value(request.history())?)
        .bind(request.version().as_i32())
        .bind(request.submitted_at())
        .bind(request.updated_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(request_id = %request.id()))]
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        request: &Request,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE requests SET
                status = $2,
                history = $3,
                version = $4,
                updated_at = $5
            WHERE id = $1 AND version = $6
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.status().to_string())
        .bind(serde_json::to_value(request.history())?)
        .bind(request.version().as_i32())
        .bind(request.updated_at())
        .bind(expected_version.as_i32())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Request", request.id().to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(request_id = %id))]
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, InfraError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!("{SELECT_REQUESTS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Request::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(requester_id = %requester_id))]
    async fn find_by_requester(&self, requester_id: &UserId) -> Result<Vec<Request>, InfraError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "{SELECT_REQUESTS} WHERE requester_id = $1 ORDER BY submitted_at DESC"
        ))
        .bind(requester_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Request::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_open(
        &self,
        request_type: Option<RequestType>,
    ) -> Result<Vec<Request>, InfraError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "{SELECT_REQUESTS} WHERE {OPEN_CONDITION} \
             AND ($1::text IS NULL OR request_type = $1) ORDER BY submitted_at"
        ))
        .bind(request_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Request::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %workflow_id))]
    async fn count_open_by_workflow(
        &self,
        workflow_id: &ValidationWorkflowId,
    ) -> Result<u64, InfraError> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM requests WHERE workflow_id = $1 AND {OPEN_CONDITION}"
        ))
        .bind(workflow_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        u64::try_from(count).map_err(|e| InfraError::unexpected(e.to_string()))
    }
}
