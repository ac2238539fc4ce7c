//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `u32` | 楽観的ロック用のバージョン番号 |
//! | [`StepOrder`] | `u32` | 承認チェーン内のステップ順序（1 始まり） |
//! | [`WorkflowName`] | `String` | ワークフロー名 |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// Version（バージョン番号）
// =========================================================================

/// バージョン番号（値オブジェクト）
///
/// 1 から始まり、更新のたびにインクリメントされる。
///
/// ```rust
/// use validflow_domain::value_objects::Version;
///
/// let v1 = Version::initial();
/// assert_eq!(v1.next().as_u32(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u32);

impl Version {
    /// 初期バージョン（1）を作成する
    pub fn initial() -> Self {
        Self(1)
    }

    /// 次のバージョンを返す
    ///
    /// u32 の上限に達した場合は上限値のまま（実運用では到達しない）。
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// 内部の u32 値を取得する
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// i32 に変換する（DB 互換用）
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value.unsigned_abs()))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =========================================================================
// StepOrder（ステップ順序）
// =========================================================================

/// ステップ順序（値オブジェクト）
///
/// ワークフロー内・承認チェーン内で 1..N の密な連番を構成する。
///
/// # 不変条件
///
/// - 1 以上
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use validflow_domain::value_objects::StepOrder;
///
/// let second = StepOrder::first().next();
/// assert_eq!(second.as_u32(), 2);
/// assert!(StepOrder::new(0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct StepOrder(u32);

impl StepOrder {
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::Validation(
                "ステップ順序は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 先頭ステップ（1）
    pub fn first() -> Self {
        Self(1)
    }

    /// 1 件目からの位置（0 始まり）から作成する
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX - 1).saturating_add(1))
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// 0 始まりの位置
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// i32 に変換する（DB 互換用）
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl TryFrom<u32> for StepOrder {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for StepOrder {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(DomainError::Validation(format!(
                "不正なステップ順序: {}",
                value
            )));
        }
        Ok(Self(value.unsigned_abs()))
    }
}

impl From<StepOrder> for u32 {
    fn from(value: StepOrder) -> Self {
        value.0
    }
}

impl std::fmt::Display for StepOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// WorkflowName（ワークフロー名）
// =========================================================================

define_validated_string! {
    /// ワークフロー名（値オブジェクト）
    pub struct WorkflowName {
        label: "ワークフロー名",
        max_length: 100,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_バージョンは1から始まりインクリメントされる() {
        let v = Version::initial();
        assert_eq!(v.as_u32(), 1);
        assert_eq!(v.next().next().as_i32(), 3);
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    fn test_0以下のバージョンは復元できない(#[case] value: i32) {
        assert!(Version::try_from(value).is_err());
    }

    #[test]
    fn test_ステップ順序0は作成できない() {
        assert!(StepOrder::new(0).is_err());
        assert!(StepOrder::try_from(0_i32).is_err());
    }

    #[test]
    fn test_位置からステップ順序を作る() {
        assert_eq!(StepOrder::from_index(2).as_u32(), 3);
        assert_eq!(StepOrder::from_index(2).index(), 2);
    }

    #[test]
    fn test_ステップ順序は数値としてシリアライズされる() {
        let json = serde_json::to_value(StepOrder::first().next()).unwrap();
        assert_eq!(json, serde_json::json!(2));

        let result: Result<StepOrder, _> = serde_json::from_value(serde_json::json!(0));
        assert!(result.is_err());
    }

    #[rstest]
    #[case("", false)]
    #[case("   ", false)]
    #[case("休暇承認フロー", true)]
    fn test_ワークフロー名のバリデーション(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(WorkflowName::new(input).is_ok(), ok);
    }

    #[test]
    fn test_ワークフロー名は100文字まで() {
        assert!(WorkflowName::new("あ".repeat(100)).is_ok());
        assert!(WorkflowName::new("あ".repeat(101)).is_err());
    }
}
