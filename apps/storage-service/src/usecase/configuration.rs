//! # 設定ユースケース
//!
//! 設定キーと設定タグを検証し、リポジトリから設定ドキュメントを読み出す。
//! 更新系は未実装で、常に `Unimplemented` を返す。

use std::sync::Arc;

use fluxconfig_domain::{
    DomainError,
    ValidationFailure,
    configuration::ConfigurationDocument,
    value_objects::{ConfigurationKey, ConfigurationTag},
};
use fluxconfig_infra::repository::ConfigurationRepository;

use crate::pipeline::CallContext;

const INVALID_REQUEST: &str = "Invalid request.";

pub struct ConfigurationUseCaseImpl {
    repository: Arc<dyn ConfigurationRepository>,
}

impl ConfigurationUseCaseImpl {
    pub fn new(repository: Arc<dyn ConfigurationRepository>) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip_all, fields(tag = configuration_tag))]
    pub async fn load_configuration(
        &self,
        ctx: &CallContext,
        configuration_tag: &str,
    ) -> Result<ConfigurationDocument, DomainError> {
        // 認証ハンドラを通過していれば必ず存在する
        let key = ctx
            .configuration_key()
            .ok_or_else(|| DomainError::internal("Configuration key was not injected."))?;
        let key = ConfigurationKey::new(key).map_err(|e| {
            DomainError::internal("Injected configuration key is malformed.").caused_by(&e)
        })?;
        let tag = ConfigurationTag::new(configuration_tag)?;

        self.repository
            .load_configuration(&key, &tag, ctx.cancellation())
            .await
    }

    #[tracing::instrument(skip_all, fields(tag = configuration_tag))]
    pub async fn load_internal_configuration(
        &self,
        ctx: &CallContext,
        configuration_key: &str,
        configuration_tag: &str,
    ) -> Result<ConfigurationDocument, DomainError> {
        // キーとタグの違反をまとめて報告する
        let (key, tag) = match (
            ConfigurationKey::validate(configuration_key),
            ConfigurationTag::validate(configuration_tag),
        ) {
            (Ok(key), Ok(tag)) => (key, tag),
            (key, tag) => {
                let violations = [key.err(), tag.err()].into_iter().flatten().collect();
                return Err(DomainError::validation(
                    INVALID_REQUEST,
                    ValidationFailure::from_violations(violations),
                ));
            }
        };

        self.repository
            .load_configuration(&key, &tag, ctx.cancellation())
            .await
    }

    pub async fn update_configuration(&self, _ctx: &CallContext) -> Result<(), DomainError> {
        Err(DomainError::unimplemented())
    }
}
