//! 申請の承認ステータス

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{DomainError, value_objects::StepOrder};

/// 承認ステータス
///
/// 途中段階の承認は `ApprovedThrough(k)` で保持し、文字列 `approved_n{k}` は
/// 永続化と JSON の境界でのみ生成・解析する。
///
/// ```rust
/// use validflow_domain::{request::ApprovalStatus, value_objects::StepOrder};
///
/// let status = ApprovalStatus::ApprovedThrough(StepOrder::first().next());
/// assert_eq!(status.to_string(), "approved_n2");
/// assert_eq!("approved_n2".parse::<ApprovalStatus>().unwrap(), status);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalStatus {
    /// 申請済み、最初のステップ待ち
    Pending,
    /// k 番目のステップまで承認済み
    ApprovedThrough(StepOrder),
    /// 最終承認済み
    Approved,
    /// 却下
    Rejected,
    /// 申請者による取り消し
    Cancelled,
}

impl ApprovalStatus {
    /// 終端状態か（以降の決裁・取り消しを受け付けない）
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    /// 承認済みのステップ数
    pub fn approved_steps(&self) -> u32 {
        match self {
            Self::ApprovedThrough(k) => k.as_u32(),
            _ => 0,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::ApprovedThrough(k) => write!(f, "approved_n{}", k),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => s
                .strip_prefix("approved_n")
                .and_then(|k| k.parse::<u32>().ok())
                .and_then(|k| StepOrder::new(k).ok())
                .map(Self::ApprovedThrough)
                .ok_or_else(|| DomainError::Validation(format!("不正な承認ステータス: {}", s))),
        }
    }
}

impl Serialize for ApprovalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApprovalStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
