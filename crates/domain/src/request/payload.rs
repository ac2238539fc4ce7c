//! 申請種別ごとのペイロード

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{LeaveKind, RequestType};
use crate::DomainError;

/// 申請本文（種別ごとに異なる項目を持つ直和型）
///
/// 共通項目（申請者、理由、承認チェーンなど）は [`Request`](super::Request) 側が持つ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPayload {
    /// 休暇申請
    Leave {
        leave_kind: LeaveKind,
        start_date: NaiveDate,
        end_date:   NaiveDate,
        /// 取得日数（半日単位を許容）
        days:       f64,
    },
    /// 残業申請
    Overtime {
        work_date: NaiveDate,
        hours:     f64,
    },
    /// 打刻修正申請
    Correction {
        request_date:        NaiveDate,
        requested_check_in:  Option<NaiveTime>,
        requested_check_out: Option<NaiveTime>,
    },
    /// 書類申請（在籍証明書など）
    Administrative {
        document_kind: String,
        needed_by:     Option<NaiveDate>,
    },
}

impl RequestPayload {
    /// 申請種別タグ
    pub fn request_type(&self) -> RequestType {
        match self {
            Self::Leave { leave_kind, .. } => leave_kind.request_type(),
            Self::Overtime { .. } => RequestType::Overtime,
            Self::Correction { .. } => RequestType::Correction,
            Self::Administrative { .. } => RequestType::Administrative,
        }
    }

    /// 種別ごとの入力チェック
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Leave {
                start_date,
                end_date,
                days,
                ..
            } => {
                if start_date > end_date {
                    return Err(DomainError::InvalidRange(format!(
                        "開始日 {} が終了日 {} より後です",
                        start_date, end_date
                    )));
                }
                let span = (*end_date - *start_date).num_days() + 1;
                if !days.is_finite() || *days <= 0.0 || *days > span as f64 {
                    return Err(DomainError::Validation(format!(
                        "取得日数は 0 より大きく {} 以下である必要があります",
                        span
                    )));
                }
                Ok(())
            }
            Self::Overtime { hours, .. } => {
                if !hours.is_finite() || *hours <= 0.0 || *hours > 24.0 {
                    return Err(DomainError::Validation(
                        "残業時間は 0 より大きく 24 以下である必要があります".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Correction {
                requested_check_in,
                requested_check_out,
                ..
            } => match (requested_check_in, requested_check_out) {
                (None, None) => Err(DomainError::Validation(
                    "修正後の出勤または退勤時刻が必要です".to_string(),
                )),
                (Some(check_in), Some(check_out)) if check_in >= check_out => {
                    Err(DomainError::InvalidRange(format!(
                        "出勤時刻 {} が退勤時刻 {} 以降です",
                        check_in, check_out
                    )))
                }
                _ => Ok(()),
            },
            Self::Administrative { document_kind, .. } => {
                if document_kind.trim().is_empty() {
                    return Err(DomainError::Validation("書類の種類は必須です".to_string()));
                }
                Ok(())
            }
        }
    }
}
