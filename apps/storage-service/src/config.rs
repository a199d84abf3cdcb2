//! # Storage Service 設定
//!
//! 環境変数から Storage Service サーバーの設定を読み込む。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `STORAGE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `STORAGE_PORT` | **Yes** | 公開 API のポート番号 |
//! | `STORAGE_INTERNAL_PORT` | No | サービス間 API のポート番号（未設定なら公開ポートに同居） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `MANAGEMENT_SERVICE_URL` | **Yes** | 管理サービスのベース URL |
//! | `CALL_TIMEOUT_MS` | No | 呼び出しごとの期限（デフォルト: `30000`） |

use std::{env, time::Duration};

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Storage Service サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// バインドアドレス
    pub host: String,
    /// 公開 API のポート番号
    pub port: u16,
    /// サービス間 API のポート番号
    pub internal_port: Option<u16>,
    /// データベース接続 URL
    pub database_url: String,
    /// 管理サービスのベース URL
    pub management_service_url: String,
    /// 呼び出しごとの期限
    pub call_timeout: Duration,
}

impl StorageConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            host: lookup("STORAGE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse("STORAGE_PORT", required("STORAGE_PORT")?)?,
            internal_port: lookup("STORAGE_INTERNAL_PORT")
                .map(|value| parse("STORAGE_INTERNAL_PORT", value))
                .transpose()?,
            database_url: required("DATABASE_URL")?,
            management_service_url: required("MANAGEMENT_SERVICE_URL")?,
            call_timeout: Duration::from_millis(
                lookup("CALL_TIMEOUT_MS")
                    .map(|value| parse("CALL_TIMEOUT_MS", value))
                    .transpose()?
                    .unwrap_or(DEFAULT_CALL_TIMEOUT_MS),
            ),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn lookup_from(
        vars: &[(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("STORAGE_PORT", "5200"),
        ("DATABASE_URL", "postgres://localhost/fluxconfig"),
        ("MANAGEMENT_SERVICE_URL", "http://localhost:5100"),
    ];

    #[test]
    fn test_必須項目のみでデフォルト値が補われる() {
        let config = StorageConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(
            config,
            StorageConfig {
                host: "0.0.0.0".to_string(),
                port: 5200,
                internal_port: None,
                database_url: "postgres://localhost/fluxconfig".to_string(),
                management_service_url: "http://localhost:5100".to_string(),
                call_timeout: Duration::from_secs(30),
            }
        );
    }

    #[test]
    fn test_任意項目を上書きできる() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("STORAGE_HOST", "127.0.0.1"),
            ("STORAGE_INTERNAL_PORT", "5201"),
            ("CALL_TIMEOUT_MS", "1500"),
        ]);

        let config = StorageConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.internal_port, Some(5201));
        assert_eq!(config.call_timeout, Duration::from_millis(1500));
    }

    #[rstest]
    #[case("STORAGE_PORT")]
    #[case("DATABASE_URL")]
    #[case("MANAGEMENT_SERVICE_URL")]
    fn test_必須項目が欠けているとmissing(#[case] name: &'static str) {
        let vars: Vec<_> = REQUIRED.into_iter().filter(|(k, _)| *k != name).collect();

        let error = StorageConfig::from_lookup(lookup_from(&vars)).unwrap_err();

        assert_eq!(error, ConfigError::Missing(name));
    }

    #[rstest]
    #[case("STORAGE_PORT", "not-a-port")]
    #[case("STORAGE_INTERNAL_PORT", "70000")]
    #[case("CALL_TIMEOUT_MS", "-1")]
    fn test_数値として解釈できない値はinvalid(#[case] name: &'static str, #[case] value: &'static str) {
        let mut vars: Vec<_> = REQUIRED.into_iter().filter(|(k, _)| *k != name).collect();
        vars.push((name, value));

        let error = StorageConfig::from_lookup(lookup_from(&vars)).unwrap_err();

        assert_eq!(
            error,
            ConfigError::Invalid {
                name,
                value: value.to_string()
            }
        );
    }
}
