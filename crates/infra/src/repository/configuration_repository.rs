//! # ConfigurationRepository
//!
//! `(設定キー, 設定タグ)` による設定ドキュメントの読み出しを担当する。
//!
//! ## エラーの正規化
//!
//! | ストア側の状況 | 返すエラー |
//! |---------------|-----------|
//! | 該当行なし | `NotFound`（エンティティ = 設定タグ） |
//! | 上記以外の障害 | `Internal`（障害を原因として保持） |
//!
//! クエリの実行は呼び出しのキャンセルシグナルと競合させ、
//! キャンセルされた場合はクエリを破棄して内部エラーを返す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fluxconfig_domain::{
    DomainError,
    configuration::ConfigurationDocument,
    value_objects::{ConfigurationKey, ConfigurationTag},
};
use fluxconfig_shared::CancellationSignal;
use sqlx::PgPool;

use crate::error::InfraError;

/// 設定リポジトリトレイト
#[async_trait]
pub trait ConfigurationRepository: Send + Sync {
    /// 設定ドキュメントを読み出す
    async fn load_configuration(
        &self,
        key: &ConfigurationKey,
        tag: &ConfigurationTag,
        cancellation: &CancellationSignal,
    ) -> Result<ConfigurationDocument, DomainError>;
}

#[derive(Debug, sqlx::FromRow)]
struct ConfigurationRow {
    key:        String,
    tag:        String,
    data:       serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConfigurationRow> for ConfigurationDocument {
    type Error = InfraError;

    fn try_from(row: ConfigurationRow) -> Result<Self, Self::Error> {
        let key = ConfigurationKey::new(row.key)
            .map_err(|e| InfraError::unexpected(format!("保存済みの設定キーが不正: {e}")))?;
        let tag = ConfigurationTag::new(row.tag)
            .map_err(|e| InfraError::unexpected(format!("保存済みの設定タグが不正: {e}")))?;

        Ok(ConfigurationDocument::new(key, tag, row.data, row.updated_at))
    }
}

/// PostgreSQL 実装の ConfigurationRepository
#[derive(Debug, Clone)]
pub struct PostgresConfigurationRepository {
    pool: PgPool,
}

impl PostgresConfigurationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        key: &ConfigurationKey,
        tag: &ConfigurationTag,
    ) -> Result<ConfigurationDocument, InfraError> {
        let row: ConfigurationRow = sqlx::query_as(
            r#"
            SELECT key, tag, data, updated_at
            FROM configurations
            WHERE key = $1 AND tag = $2
            "#,
        )
        .bind(key.as_str())
        .bind(tag.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl ConfigurationRepository for PostgresConfigurationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%tag))]
    async fn load_configuration(
        &self,
        key: &ConfigurationKey,
        tag: &ConfigurationTag,
        cancellation: &CancellationSignal,
    ) -> Result<ConfigurationDocument, DomainError> {
        let result = tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                return Err(DomainError::internal("Configuration lookup was cancelled."));
            }
            result = self.fetch(key, tag) => result,
        };

        result.map_err(|e| {
            if e.is_row_not_found() {
                DomainError::not_found("Configuration data not found.", tag.as_str())
            } else {
                DomainError::internal("Failed to load configuration data.").caused_by(&e)
            }
        })
    }
}
