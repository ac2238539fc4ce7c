//! # 承認権限の委任
//!
//! 不在期間中に承認権限を別のユーザーへ一時的に移す。
//!
//! ## 解決ルール
//!
//! 名目上の承認者 X、申請種別 T、日付 d について、
//! 委任元が X・有効・d が期間内（両端含む）・範囲が T を含む委任があれば、
//! その委任先が実効承認者になる。委任中は X 本人は対象ステップを決裁できない。
//! 条件に合う委任が複数ある場合（本来は作成時に弾かれる）は、最も新しく作成されたものを採用する。
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use chrono::{NaiveDate, Utc};
//! use validflow_domain::{
//!     delegation::{Delegation, DelegationId, DelegationScope, NewDelegation},
//!     employee::UserId,
//!     request::RequestType,
//! };
//!
//! let manager = UserId::new();
//! let deputy = UserId::new();
//! let delegation = Delegation::new(NewDelegation {
//!     id:         DelegationId::new(),
//!     delegator:  manager.clone(),
//!     delegate:   deputy.clone(),
//!     start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
//!     end_date:   NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
//!     scope:      DelegationScope::All,
//!     now:        Utc::now(),
//! })?;
//!
//! assert!(delegation.applies_to(&manager, RequestType::Sick, NaiveDate::from_ymd_opt(2026, 4, 5).unwrap()));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, employee::UserId, request::RequestType};

define_uuid_id! {
    /// 委任 ID
    pub struct DelegationId;
}

/// 委任の範囲
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "request_types", rename_all = "snake_case")]
pub enum DelegationScope {
    /// すべての申請種別
    All,
    /// 指定した申請種別のみ
    Types(Vec<RequestType>),
}

impl DelegationScope {
    pub fn covers(&self, request_type: RequestType) -> bool {
        match self {
            Self::All => true,
            Self::Types(types) => types.contains(&request_type),
        }
    }

    /// 二つの範囲に共通する申請種別があるか
    pub fn intersects(&self, other: &DelegationScope) -> bool {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => true,
            (Self::Types(a), Self::Types(b)) => a.iter().any(|t| b.contains(t)),
        }
    }
}

/// 委任エンティティ
///
/// # 不変条件
///
/// - `start_date <= end_date`
/// - 委任元と委任先は別人
/// - 同じ委任元の有効な委任同士で、範囲と期間の両方が重なることはない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    id:           DelegationId,
    delegator:    UserId,
    delegate:     UserId,
    start_date:   NaiveDate,
    end_date:     NaiveDate,
    scope:        DelegationScope,
    cancelled_at: Option<DateTime<Utc>>,
    created_at:   DateTime<Utc>,
}

/// 新規作成パラメータ
pub struct NewDelegation {
    pub id:         DelegationId,
    pub delegator:  UserId,
    pub delegate:   UserId,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    pub scope:      DelegationScope,
    pub now:        DateTime<Utc>,
}

/// DB 復元パラメータ
pub struct DelegationRecord {
    pub id:           DelegationId,
    pub delegator:    UserId,
    pub delegate:     UserId,
    pub start_date:   NaiveDate,
    pub end_date:     NaiveDate,
    pub scope:        DelegationScope,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at:   DateTime<Utc>,
}

impl Delegation {
    /// 委任を作成する
    ///
    /// 既存の委任との重複チェックは [`ensure_no_overlap`] で行う。
    ///
    /// # Errors
    ///
    /// - `InvalidRange`: 開始日が終了日より後
    /// - `Validation`: 自分自身への委任、範囲の申請種別が空
    pub fn new(params: NewDelegation) -> Result<Self, DomainError> {
        if params.start_date > params.end_date {
            return Err(DomainError::InvalidRange(format!(
                "開始日 {} が終了日 {} より後です",
                params.start_date, params.end_date
            )));
        }
        if params.delegator == params.delegate {
            return Err(DomainError::Validation(
                "自分自身には委任できません".to_string(),
            ));
        }
        if matches!(&params.scope, DelegationScope::Types(types) if types.is_empty()) {
            return Err(DomainError::Validation(
                "委任する申請種別を 1 つ以上指定してください".to_string(),
            ));
        }

        Ok(Self {
            id:           params.id,
            delegator:    params.delegator,
            delegate:     params.delegate,
            start_date:   params.start_date,
            end_date:     params.end_date,
            scope:        params.scope,
            cancelled_at: None,
            created_at:   params.now,
        })
    }

    pub fn from_db(record: DelegationRecord) -> Self {
        Self {
            id:           record.id,
            delegator:    record.delegator,
            delegate:     record.delegate,
            start_date:   record.start_date,
            end_date:     record.end_date,
            scope:        record.scope,
            cancelled_at: record.cancelled_at,
            created_at:   record.created_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &DelegationId {
        &self.id
    }

    pub fn delegator(&self) -> &UserId {
        &self.delegator
    }

    pub fn delegate(&self) -> &UserId {
        &self.delegate
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn scope(&self) -> &DelegationScope {
        &self.scope
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ビジネスロジックメソッド

    /// 取り消されていないか
    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }

    /// 指定日時点で効力を持つか（終了日を過ぎたものは効力なし）
    pub fn is_in_force_on(&self, date: NaiveDate) -> bool {
        self.is_active() && self.start_date <= date && date <= self.end_date
    }

    /// 名目上の承認者・申請種別・日付に対して適用されるか
    pub fn applies_to(&self, nominal: &UserId, request_type: RequestType, date: NaiveDate) -> bool {
        &self.delegator == nominal && self.is_in_force_on(date) && self.scope.covers(request_type)
    }

    /// 同じ委任元で範囲と期間の両方が重なるか
    pub fn overlaps(&self, other: &Delegation) -> bool {
        self.id != other.id
            && self.is_active()
            && other.is_active()
            && self.delegator == other.delegator
            && self.start_date <= other.end_date
            && other.start_date <= self.end_date
            && self.scope.intersects(&other.scope)
    }

    /// 取り消す
    pub fn cancelled(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.is_active() {
            return Err(DomainError::InvalidState(
                "委任は既に取り消されています".to_string(),
            ));
        }
        Ok(Self {
            cancelled_at: Some(now),
            ..self
        })
    }
}

/// 既存の委任と重複しないことを確認する
pub fn ensure_no_overlap(candidate: &Delegation, existing: &[Delegation]) -> Result<(), DomainError> {
    match existing.iter().find(|d| candidate.overlaps(d)) {
        Some(conflict) => Err(DomainError::OverlappingDelegation(format!(
            "委任 {}（{}〜{}）と重複しています",
            conflict.id(),
            conflict.start_date(),
            conflict.end_date()
        ))),
        None => Ok(()),
    }
}

/// 名目上の承認者に対する委任の解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 委任なし（本人が実効承認者）
    Nominal(UserId),
    /// 委任先が実効承認者
    Delegated {
        delegate:      UserId,
        delegator:     UserId,
        delegation_id: DelegationId,
        /// 条件に合った委任の件数（2 以上ならデータ不整合）
        candidates:    usize,
    },
}

impl Resolution {
    /// 実効承認者
    pub fn effective(&self) -> &UserId {
        match self {
            Self::Nominal(user) => user,
            Self::Delegated { delegate, .. } => delegate,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Delegated { candidates, .. } if *candidates > 1)
    }
}

/// 名目上の承認者を実効承認者に読み替える
pub fn resolve_effective(
    nominal: &UserId,
    request_type: RequestType,
    date: NaiveDate,
    delegations: &[Delegation],
) -> Resolution {
    let matching: Vec<&Delegation> = delegations
        .iter()
        .filter(|d| d.applies_to(nominal, request_type, date))
        .collect();

    match matching.iter().max_by_key(|d| d.created_at()) {
        Some(latest) => Resolution::Delegated {
            delegate:      latest.delegate().clone(),
            delegator:     nominal.clone(),
            delegation_id: latest.id().clone(),
            candidates:    matching.len(),
        },
        None => Resolution::Nominal(nominal.clone()),
    }
}

/// 1 ステップ分の実効承認者の集合
///
/// 名目上の承認者それぞれに委任を適用した結果を保持する。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveApprovers(Vec<Resolution>);

impl EffectiveApprovers {
    pub fn resolve(
        nominal: &[UserId],
        request_type: RequestType,
        date: NaiveDate,
        delegations: &[Delegation],
    ) -> Self {
        Self(
            nominal
                .iter()
                .map(|user| resolve_effective(user, request_type, date, delegations))
                .collect(),
        )
    }

    pub fn resolutions(&self) -> &[Resolution] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 操作者を認可し、代理決裁であれば委任元を返す
    ///
    /// 本人としても委任先としても承認できる場合は本人としての決裁を優先する。
    ///
    /// # Errors
    ///
    /// - `Forbidden`: 実効承認者でない（委任中の名目上の承認者本人を含む）
    pub fn authorize(&self, actor: &UserId) -> Result<Option<UserId>, DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::Forbidden(
                "このステップには承認可能なユーザーがいません".to_string(),
            ));
        }
        if self
            .0
            .iter()
            .any(|r| matches!(r, Resolution::Nominal(user) if user == actor))
        {
            return Ok(None);
        }
        self.0
            .iter()
            .find_map(|r| match r {
                Resolution::Delegated {
                    delegate,
                    delegator,
                    ..
                } if delegate == actor => Some(delegator.clone()),
                _ => None,
            })
            .map(Some)
            .ok_or_else(|| {
                DomainError::Forbidden("このステップの承認者ではありません".to_string())
            })
    }
}
