//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。

use std::env;

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} が設定されていません（.env を確認してください）")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Core Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host:           String,
    /// ポート番号
    pub port:           u16,
    /// データベース接続 URL
    pub database_url:   String,
    /// `hr` 承認者として解決するロール名
    pub hr_role:        String,
    /// 起動時にマイグレーションを適用するか
    pub run_migrations: bool,
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port_raw = lookup("CORE_PORT").ok_or(ConfigError::Missing("CORE_PORT"))?;
        let port = port_raw.parse().map_err(|_| ConfigError::Invalid {
            name:  "CORE_PORT",
            value: port_raw.clone(),
        })?;

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                name:  "RUN_MIGRATIONS",
                value: raw,
            })?,
        };

        Ok(Self {
            host: lookup("CORE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            hr_role: lookup("HR_APPROVER_ROLE")
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "hr".to_string()),
            run_migrations,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_必須項目だけで既定値が埋まる() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("CORE_PORT", "13001"),
            ("DATABASE_URL", "postgres://localhost/validflow"),
        ]))
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 13001);
        assert_eq!(config.hr_role, "hr");
        assert!(config.run_migrations);
    }

    #[test]
    fn test_ポート未設定はエラーになる() {
        let result = CoreConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/validflow",
        )]));

        assert!(matches!(result, Err(ConfigError::Missing("CORE_PORT"))));
    }

    #[test]
    fn test_不正なポートはエラーになる() {
        let result = CoreConfig::from_lookup(lookup_from(&[
            ("CORE_PORT", "http"),
            ("DATABASE_URL", "postgres://localhost/validflow"),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "CORE_PORT",
                ..
            })
        ));
    }

    #[test]
    fn test_人事ロールとマイグレーション設定を上書きできる() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("CORE_PORT", "13001"),
            ("DATABASE_URL", "postgres://localhost/validflow"),
            ("HR_APPROVER_ROLE", "rh"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.hr_role, "rh");
        assert!(!config.run_migrations);
    }
}
