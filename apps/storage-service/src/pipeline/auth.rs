//! # 認証ハンドラ
//!
//! `X-API-KEY` メタデータの API キーを管理サービスで設定キーに交換し、
//! `X-CFG-KEY` としてメタデータに注入してから後続へ渡す。
//!
//! - API キーがない: 管理サービスを呼ばずに `Unauthenticated` で打ち切る
//! - 交換に失敗: 管理サービスクライアントのエラーをそのまま返す
//! - 交換中にキャンセル: 後続を実行せずに打ち切る
//!
//! クライアントが送ってきた `X-CFG-KEY` は注入前にすべて取り除く。

use std::sync::Arc;

use async_trait::async_trait;
use fluxconfig_domain::{DomainError, value_objects::ApiKey};

use super::{
    API_KEY_HEADER,
    CONFIGURATION_KEY_HEADER,
    CallContext,
    CallError,
    CallHandler,
    CallResult,
    Next,
};
use crate::client::ManagementServiceClient;

const EMPTY_AUTHENTICATION_METADATA: &str = "Empty authentication metadata.";

pub struct ApiKeyAuthHandler {
    client: Arc<dyn ManagementServiceClient>,
}

impl ApiKeyAuthHandler {
    pub fn new(client: Arc<dyn ManagementServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<R: Send + 'static> CallHandler<R> for ApiKeyAuthHandler {
    async fn handle(&self, mut ctx: CallContext, next: Next<'_, R>) -> CallResult<R> {
        let api_key = ctx
            .metadata()
            .get(API_KEY_HEADER)
            .and_then(|raw| ApiKey::new(raw).ok())
            .ok_or_else(|| DomainError::unauthenticated(EMPTY_AUTHENTICATION_METADATA))?;

        let cancellation = ctx.cancellation().clone();
        let configuration_key = tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                tracing::info!(rpc.method = %ctx.method(), "認証中に呼び出しがキャンセルされました");
                return Err(CallError::Cancelled);
            }
            result = self.client.authenticate_client(&api_key, &cancellation) => result?,
        };

        let stripped = ctx.metadata_mut().remove(CONFIGURATION_KEY_HEADER);
        if stripped > 0 {
            tracing::warn!(
                rpc.method = %ctx.method(),
                stripped,
                "クライアントが送信した x-cfg-key を破棄しました"
            );
        }
        ctx.metadata_mut()
            .insert(CONFIGURATION_KEY_HEADER, configuration_key.into_string());

        next.run(ctx).await
    }
}
