//! # 操作者の抽出
//!
//! 上流ゲートウェイが付与するヘッダーから操作者とケイパビリティを取り出す。
//!
//! | ヘッダー | 内容 |
//! |----------|------|
//! | `x-user-id` | 操作者のユーザー ID（UUID、必須） |
//! | `x-user-capabilities` | カンマ区切りのケイパビリティ（省略時は空） |

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;
use validflow_domain::{capability::CapabilitySet, employee::UserId};

use crate::error::CoreError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const CAPABILITIES_HEADER: &str = "x-user-capabilities";

/// リクエストの操作者
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id:      UserId,
    pub capabilities: CapabilitySet,
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| CoreError::Unauthorized(format!("{} ヘッダーがありません", USER_ID_HEADER)))?;
        let user_id = Uuid::parse_str(raw.trim())
            .map(UserId::from_uuid)
            .map_err(|_| CoreError::Unauthorized(format!("{} が不正です", USER_ID_HEADER)))?;

        let capabilities = parts
            .headers
            .get(CAPABILITIES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(CapabilitySet::parse)
            .unwrap_or_default();

        Ok(Self {
            user_id,
            capabilities,
        })
    }
}
