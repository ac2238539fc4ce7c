//! 申請種別

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

/// 申請種別タグ
///
/// ワークフローのトリガー、委任の範囲、申請エンベロープで共通に使う。
/// 休暇は種類ごとに別のタグを持つ（人事マスタ上の区分をそのまま使う）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
pub enum RequestType {
    /// 年次有給休暇
    #[serde(rename = "ANNUAL")]
    #[strum(serialize = "ANNUAL")]
    Annual,
    /// 病気休暇
    #[serde(rename = "SICK")]
    #[strum(serialize = "SICK")]
    Sick,
    /// 特別休暇
    #[serde(rename = "EXCEPTIONAL")]
    #[strum(serialize = "EXCEPTIONAL")]
    Exceptional,
    /// 無給休暇
    #[serde(rename = "UNPAID")]
    #[strum(serialize = "UNPAID")]
    Unpaid,
    /// その他の休暇
    #[serde(rename = "OTHER")]
    #[strum(serialize = "OTHER")]
    Other,
    /// 残業
    #[serde(rename = "heures_sup")]
    #[strum(serialize = "heures_sup")]
    Overtime,
    /// 打刻修正
    #[serde(rename = "correction")]
    #[strum(serialize = "correction")]
    Correction,
    /// 各種書類
    #[serde(rename = "administrative")]
    #[strum(serialize = "administrative")]
    Administrative,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// 休暇系の種別か
    pub fn is_leave(&self) -> bool {
        matches!(
            self,
            Self::Annual | Self::Sick | Self::Exceptional | Self::Unpaid | Self::Other
        )
    }
}

impl std::str::FromStr for RequestType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANNUAL" => Ok(Self::Annual),
            "SICK" => Ok(Self::Sick),
            "EXCEPTIONAL" => Ok(Self::Exceptional),
            "UNPAID" => Ok(Self::Unpaid),
            "OTHER" => Ok(Self::Other),
            "heures_sup" => Ok(Self::Overtime),
            "correction" => Ok(Self::Correction),
            "administrative" => Ok(Self::Administrative),
            _ => Err(DomainError::Validation(format!("不正な申請種別: {}", s))),
        }
    }
}

/// 休暇の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveKind {
    Annual,
    Sick,
    Exceptional,
    Unpaid,
    Other,
}

impl LeaveKind {
    pub fn request_type(&self) -> RequestType {
        match self {
            Self::Annual => RequestType::Annual,
            Self::Sick => RequestType::Sick,
            Self::Exceptional => RequestType::Exceptional,
            Self::Unpaid => RequestType::Unpaid,
            Self::Other => RequestType::Other,
        }
    }
}
