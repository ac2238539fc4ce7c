//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換や権限チェックなど、
//! 複数のユースケースで繰り返されるパターンを共通化する。

use validflow_domain::capability::{Capability, CapabilitySet};
use validflow_infra::InfraError;

use crate::error::CoreError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, CoreError>` に変換する
///
/// ```ignore
/// let request = self.request_repo.find_by_id(&id).await.or_not_found("申請")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `CoreError::NotFound`、`InfraError` の場合は `CoreError::Internal` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError> {
        self.map_err(|e| CoreError::Internal(format!("{}の取得に失敗: {}", entity_name, e)))?
            .ok_or_else(|| CoreError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}

/// ケイパビリティを要求する
pub(crate) fn require_capability(
    capabilities: &CapabilitySet,
    required: &Capability,
) -> Result<(), CoreError> {
    capabilities.require(required).map_err(CoreError::from)
}
