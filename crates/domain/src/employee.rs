//! # 従業員（組織ディレクトリ）
//!
//! 承認者解決に必要な組織情報の読み取りモデル。
//! 従業員マスタの管理自体は外部システムの責務で、ここでは参照のみ行う。

use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// ユーザー（従業員）ID
    pub struct UserId;
}

/// 従業員の読み取りモデル
///
/// 申請時に申請者の表示名と所属部署をスナップショットするために使う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    id:         UserId,
    name:       String,
    department: Option<String>,
    manager_id: Option<UserId>,
}

impl Employee {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        department: Option<String>,
        manager_id: Option<UserId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            department,
            manager_id,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 所属部署コード（ワークフローのセグメントと照合する）
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// 直属の上長
    pub fn manager_id(&self) -> Option<&UserId> {
        self.manager_id.as_ref()
    }
}
