/// UUID v7 ベースの ID 型を定義する宣言型マクロ
///
/// Newtype 構造体と `new()` / `from_uuid()` / `as_uuid()` / `Default` を生成する。
///
/// ```rust
/// use validflow_domain::request::RequestId;
///
/// let id = RequestId::new();
/// let restored = RequestId::from_uuid(*id.as_uuid());
/// assert_eq!(id, restored);
/// ```
macro_rules! define_uuid_id {
   (
      $(#[$meta:meta])*
      $vis:vis struct $Name:ident;
   ) => {
      $(#[$meta])*
      #[derive(
         Debug, Clone, PartialEq, Eq, Hash,
         serde::Serialize, serde::Deserialize,
         derive_more::Display,
      )]
      #[display("{_0}")]
      #[serde(transparent)]
      $vis struct $Name(uuid::Uuid);

      impl $Name {
         /// 新しい ID を生成する（UUID v7）
         pub fn new() -> Self {
            Self(uuid::Uuid::now_v7())
         }

         /// 既存の UUID から ID を作成する
         pub fn from_uuid(uuid: uuid::Uuid) -> Self {
            Self(uuid)
         }

         /// 内部の UUID 参照を取得する
         pub fn as_uuid(&self) -> &uuid::Uuid {
            &self.0
         }
      }

      impl Default for $Name {
         fn default() -> Self {
            Self::new()
         }
      }
   };
}

/// 前後の空白を除去し、空チェックと最大長チェックを行う String Newtype を定義する
///
/// - `$label`: エラーメッセージに使うラベル（例: `"ワークフロー名"`）
/// - `$max_length`: 最大文字数（`chars().count()` でカウント）
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use validflow_domain::value_objects::WorkflowName;
///
/// let name = WorkflowName::new("  病気休暇フロー ")?;
/// assert_eq!(name.as_str(), "病気休暇フロー");
/// assert!(WorkflowName::new("   ").is_err());
/// # Ok(())
/// # }
/// ```
macro_rules! define_validated_string {
   (
      $(#[$meta:meta])*
      $vis:vis struct $Name:ident {
         label: $label:expr,
         max_length: $max_length:expr $(,)?
      }
   ) => {
      $(#[$meta])*
      #[derive(
         Debug, Clone, PartialEq, Eq,
         serde::Serialize, serde::Deserialize,
      )]
      #[serde(try_from = "String", into = "String")]
      $vis struct $Name(String);

      impl $Name {
         pub fn new(value: impl Into<String>) -> Result<Self, $crate::DomainError> {
            let value = value.into().trim().to_string();

            if value.is_empty() {
               return Err($crate::DomainError::Validation(format!(
                  "{}は必須です",
                  $label
               )));
            }

            if value.chars().count() > $max_length {
               return Err($crate::DomainError::Validation(format!(
                  "{}は {} 文字以内である必要があります",
                  $label, $max_length
               )));
            }

            Ok(Self(value))
         }

         /// 文字列参照を取得する
         pub fn as_str(&self) -> &str {
            &self.0
         }

         /// 所有権を持つ文字列に変換する
         pub fn into_string(self) -> String {
            self.0
         }
      }

      impl TryFrom<String> for $Name {
         type Error = $crate::DomainError;

         fn try_from(value: String) -> Result<Self, Self::Error> {
            Self::new(value)
         }
      }

      impl From<$Name> for String {
         fn from(value: $Name) -> Self {
            value.0
         }
      }

      impl std::fmt::Display for $Name {
         fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
         }
      }
   };
}
