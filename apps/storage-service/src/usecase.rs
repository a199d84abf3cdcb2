//! # ユースケース層
//!
//! - **トレイトベースの設計**: ハンドラのテストでスタブに差し替えられる
//! - **依存性注入**: リポジトリを外部から注入
//! - **薄いハンドラ**: デコードとレスポンス組み立て以外はユースケースに集約

pub mod configuration;

use async_trait::async_trait;
pub use configuration::ConfigurationUseCaseImpl;
use fluxconfig_domain::{DomainError, configuration::ConfigurationDocument};

use crate::pipeline::CallContext;

/// 設定ユースケーストレイト
#[async_trait]
pub trait ConfigurationUseCase: Send + Sync {
    /// 認証済みクライアントの設定を読み出す
    ///
    /// 設定キーは認証ハンドラが注入した `X-CFG-KEY` から取得する。
    async fn load_configuration(
        &self,
        ctx: &CallContext,
        configuration_tag: &str,
    ) -> Result<ConfigurationDocument, DomainError>;

    /// サービス間呼び出しで設定を読み出す
    ///
    /// 設定キーはリクエストで明示的に渡される。
    async fn load_internal_configuration(
        &self,
        ctx: &CallContext,
        configuration_key: &str,
        configuration_tag: &str,
    ) -> Result<ConfigurationDocument, DomainError>;

    /// 設定を更新する（未実装）
    async fn update_configuration(&self, ctx: &CallContext) -> Result<(), DomainError>;
}

#[async_trait]
impl ConfigurationUseCase for ConfigurationUseCaseImpl {
    async fn load_configuration(
        &self,
        ctx: &CallContext,
        configuration_tag: &str,
    ) -> Result<ConfigurationDocument, DomainError> {
        self.load_configuration(ctx, configuration_tag).await
    }

    async fn load_internal_configuration(
        &self,
        ctx: &CallContext,
        configuration_key: &str,
        configuration_tag: &str,
    ) -> Result<ConfigurationDocument, DomainError> {
        self.load_internal_configuration(ctx, configuration_key, configuration_tag)
            .await
    }

    async fn update_configuration(&self, ctx: &CallContext) -> Result<(), DomainError> {
        self.update_configuration(ctx).await
    }
}
