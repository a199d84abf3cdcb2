//! # サービス間 API ハンドラ
//!
//! `fluxconfig.storage.v1.InternalStorage` サービスのメソッドを提供する。
//! 認証は行わず、設定キーはリクエストで受け取る。
//! 内部ネットワークからのみ到達可能な listener で公開する。

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap};
use fluxconfig_domain::DomainError;

use super::{
    InternalLoadConfigurationRequest,
    LoadConfigurationResponse,
    RpcState,
    UpdateConfigurationRequest,
    UpdateConfigurationResponse,
};
use crate::rpc::{self, RpcResponse};

pub const INTERNAL_LOAD_CONFIGURATION: &str =
    "/fluxconfig.storage.v1.InternalStorage/LoadConfiguration";
pub const INTERNAL_UPDATE_CONFIGURATION: &str =
    "/fluxconfig.storage.v1.InternalStorage/UpdateConfiguration";

#[tracing::instrument(skip_all)]
pub async fn internal_load_configuration(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    body: Bytes,
) -> RpcResponse<LoadConfigurationResponse> {
    let usecase = state.usecase.clone();

    rpc::dispatch(
        &state.load_pipeline,
        INTERNAL_LOAD_CONFIGURATION,
        &headers,
        state.call_timeout,
        move |ctx| async move {
            let request: InternalLoadConfigurationRequest = rpc::decode(&body)?;
            let document = usecase
                .load_internal_configuration(
                    &ctx,
                    &request.configuration_key,
                    &request.configuration_tag,
                )
                .await?;
            Ok::<_, DomainError>(LoadConfigurationResponse::from(document))
        },
    )
    .await
}

#[tracing::instrument(skip_all)]
pub async fn internal_update_configuration(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    body: Bytes,
) -> RpcResponse<UpdateConfigurationResponse> {
    let usecase = state.usecase.clone();

    rpc::dispatch(
        &state.update_pipeline,
        INTERNAL_UPDATE_CONFIGURATION,
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
