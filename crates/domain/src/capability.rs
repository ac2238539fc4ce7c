//! # ケイパビリティ（操作権限）
//!
//! 呼び出し元が保持する操作権限の集合。上流ゲートウェイから渡された値を
//! 操作ごとに一度だけ評価する。画面上の表示制御はあくまでヒントで、
//! 最終判断はサービス側で行う。
//!
//! ## 形式
//!
//! `resource:action`（例: `workflow:manage`）。`resource:*` と `*` はワイルドカード。
//!
//! ```rust
//! use validflow_domain::capability::{Capability, CapabilitySet};
//!
//! let caps = CapabilitySet::parse("workflow:*, report:read");
//! assert!(caps.allows(&Capability::workflow_manage()));
//! assert!(!caps.allows(&Capability::delegation_manage()));
//! ```

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// ケイパビリティ（値オブジェクト）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct Capability(String);

impl Capability {
   pub fn new(value: impl Into<String>) -> Self {
      Self(value.into())
   }

   /// ワークフロー設定の管理
   pub fn workflow_manage() -> Self {
      Self::new("workflow:manage")
   }

   /// 他者に代わっての委任管理、全委任の閲覧
   pub fn delegation_manage() -> Self {
      Self::new("delegation:manage")
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }

   /// このケイパビリティが要求を満たすか判定する
   ///
   /// | 保持 | 要求 | 結果 |
   /// |------|------|------|
   /// | `*` | 任意 | true |
   /// | `workflow:*` | `workflow:manage` | true |
   /// | `workflow:manage` | `workflow:manage` | true |
   /// | `workflow:*` | `delegation:manage` | false |
   pub fn satisfies(&self, required: &Capability) -> bool {
      let held = self.as_str();
      let req = required.as_str();

      if held == "*" {
         return true;
      }

      if let Some(resource) = held.strip_suffix(":*") {
         return req.starts_with(&format!("{resource}:"));
      }

      held == req
   }
}

/// 呼び出し元が保持するケイパビリティの集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(Vec<Capability>);

impl CapabilitySet {
   pub fn new(capabilities: Vec<Capability>) -> Self {
      Self(capabilities)
   }

   /// カンマ区切りの文字列から作成する（空要素は無視）
   pub fn parse(raw: &str) -> Self {
      Self(
         raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Capability::new)
            .collect(),
      )
   }

   pub fn allows(&self, required: &Capability) -> bool {
      self.0.iter().any(|held| held.satisfies(required))
   }

   /// 要求を満たさない場合は `DomainError::Forbidden` を返す
   pub fn require(&self, required: &Capability) -> Result<(), DomainError> {
      if self.allows(required) {
         Ok(())
      } else {
         Err(DomainError::Forbidden(format!(
            "{} 権限が必要です",
            required
         )))
      }
   }
}
