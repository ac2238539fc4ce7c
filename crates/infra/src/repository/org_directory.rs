//! # OrgDirectory
//!
//! 承認者解決のための組織ディレクトリ（読み取り専用）。
//! 従業員・上長・ロールは人事システムから同期された `employees` / `employee_roles` を参照する。

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use validflow_domain::employee::{Employee, UserId};

use crate::error::InfraError;

#[async_trait]
pub trait OrgDirectory: Send + Sync {
    async fn find_employee(&self, id: &UserId) -> Result<Option<Employee>, InfraError>;

    /// ロール保持者の一覧（ID 順）
    async fn users_with_role(&self, role: &str) -> Result<Vec<UserId>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id:         Uuid,
    name:       String,
    department: Option<String>,
    manager_id: Option<Uuid>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee::new(
            UserId::from_uuid(row.id),
            row.name,
            row.department,
            row.manager_id.map(UserId::from_uuid),
        )
    }
}

#[derive(Debug, Clone)]
pub struct PostgresOrgDirectory {
    pool: PgPool,
}

impl PostgresOrgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrgDirectory for PostgresOrgDirectory {
    #[tracing::instrument(skip_all, level = "debug", fields(user_id = %id))]
    async fn find_employee(&self, id: &UserId) -> Result<Option<Employee>, InfraError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, department, manager_id FROM employees WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(role = %role))]
    async fn users_with_role(&self, role: &str) -> Result<Vec<UserId>, InfraError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT employee_id FROM employee_roles WHERE role = $1 ORDER BY employee_id",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| UserId::from_uuid(id)).collect())
    }
}
