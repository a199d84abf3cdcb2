//! # 公開 API ハンドラ
//!
//! `fluxconfig.storage.v1.Storage` サービスのメソッドを提供する。
//! 設定キーは認証ハンドラが `X-CFG-KEY` として注入する。

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap};
use fluxconfig_domain::DomainError;

use super::{
    LoadConfigurationRequest,
    LoadConfigurationResponse,
    RpcState,
    UpdateConfigurationRequest,
    UpdateConfigurationResponse,
};
use crate::rpc::{self, RpcResponse};

pub const LOAD_CONFIGURATION: &str = "/fluxconfig.storage.v1.Storage/LoadConfiguration";
pub const UPDATE_CONFIGURATION: &str = "/fluxconfig.storage.v1.Storage/UpdateConfiguration";

#[tracing::instrument(skip_all)]
pub async fn load_configuration(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    body: Bytes,
) -> RpcResponse<LoadConfigurationResponse> {
    let usecase = state.usecase.clone();

    rpc::dispatch(
        &state.load_pipeline,
        LOAD_CONFIGURATION,
        &headers,
        state.call_timeout,
        move |ctx| async move {
            let request: LoadConfigurationRequest = rpc::decode(&body)?;
            let document = usecase
                .load_configuration(&ctx, &request.configuration_tag)
                .await?;
            Ok::<_, DomainError>(LoadConfigurationResponse::from(document))
        },
    )
    .await
}

#[tracing::instrument(skip_all)]
pub async fn update_configuration(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    body: Bytes,
) -> RpcResponse<UpdateConfigurationResponse> {
    let usecase = state.usecase.clone();

    rpc::dispatch(
        &state.update_pipeline,
        UPDATE_CONFIGURATION,
        &headers,
        state.call_timeout,
        move |ctx| async move {
            let _request: UpdateConfigurationRequest = rpc::decode(&body)?;
            usecase.update_configuration(&ctx).await?;
            Ok::<_, DomainError>(UpdateConfigurationResponse {})
        },
    )
    .await
}
