//! # Clock（時刻プロバイダ）
//!
//! ユースケース層での `Utc::now()` 直接呼び出しを置き換え、
//! テストで固定時刻を注入可能にするための抽象化。
//! 委任の有効判定は日付単位で行うため、[`Clock::today`] も提供する。

use chrono::{DateTime, NaiveDate, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
   fn now(&self) -> DateTime<Utc>;

   /// 現在日付（UTC）
   fn today(&self) -> NaiveDate {
      self.now().date_naive()
   }
}

/// 実際のシステム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
   fn now(&self) -> DateTime<Utc> {
      Utc::now()
   }
}

/// 固定時刻を返すテスト用実装
pub struct FixedClock {
   now: DateTime<Utc>,
}

impl FixedClock {
   pub fn new(now: DateTime<Utc>) -> Self {
      Self { now }
   }

   /// 指定日の正午（UTC）に固定する
   pub fn on(date: NaiveDate) -> Self {
      Self {
         now: date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc(),
      }
   }
}

impl Clock for FixedClock {
   fn now(&self) -> DateTime<Utc> {
      self.now
   }
}
