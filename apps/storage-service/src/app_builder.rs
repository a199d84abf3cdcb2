//! # アプリケーション構築
//!
//! パイプラインと State の組み立て、ルーター定義を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。
//!
//! ## ルート
//!
//! ```text
//! POST /fluxconfig.storage.v1.Storage/{Method}                    公開 API
//! POST /internal/fluxconfig.storage.v1.InternalStorage/{Method}   サービス間 API
//! GET  /health, /health/ready                                     ヘルスチェック
//! ```

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use fluxconfig_shared::{
    canonical_log::CanonicalLogLineLayer,
    observability::{MakeRequestUuidV7, make_request_span},
};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    client::ManagementServiceClient,
    handler::{
        ReadinessState,
        RpcState,
        health_check,
        internal::{INTERNAL_LOAD_CONFIGURATION, INTERNAL_UPDATE_CONFIGURATION},
        internal_load_configuration,
        internal_update_configuration,
        load_configuration,
        readiness_check,
        storage::{LOAD_CONFIGURATION, UPDATE_CONFIGURATION},
        update_configuration,
    },
    pipeline::{self, ApiKeyAuthHandler, LoggingHandler},
    usecase::ConfigurationUseCase,
};

/// サービス間 API のパス接頭辞
pub const INTERNAL_PATH_PREFIX: &str = "/internal";

/// ルーター構築に必要な依存
#[derive(Clone)]
pub struct AppDeps {
    pub usecase:           Arc<dyn ConfigurationUseCase>,
    pub management_client: Arc<dyn ManagementServiceClient>,
    pub call_timeout:      Duration,
}

/// 公開 API のルーター（認証あり）
pub fn public_router(deps: &AppDeps) -> Router {
    let logging = Arc::new(LoggingHandler);
    let auth = Arc::new(ApiKeyAuthHandler::new(deps.management_client.clone()));

    let state = Arc::new(RpcState {
        usecase:         deps.usecase.clone(),
        load_pipeline:   pipeline::public(auth.clone(), logging.clone()),
        update_pipeline: pipeline::public(auth, logging),
        call_timeout:    deps.call_timeout,
    });

    Router::new()
        .route(LOAD_CONFIGURATION, post(load_configuration))
        .route(UPDATE_CONFIGURATION, post(update_configuration))
        .with_state(state)
}

/// サービス間 API のルーター（認証なし）
pub fn internal_router(deps: &AppDeps) -> Router {
    let logging = Arc::new(LoggingHandler);

    let state = Arc::new(RpcState {
        usecase:         deps.usecase.clone(),
        load_pipeline:   pipeline::internal(logging.clone()),
        update_pipeline: pipeline::internal(logging),
        call_timeout:    deps.call_timeout,
    });

    Router::new()
        .route(
            &format!("{INTERNAL_PATH_PREFIX}{INTERNAL_LOAD_CONFIGURATION}"),
            post(internal_load_configuration),
        )
        .route(
            &format!("{INTERNAL_PATH_PREFIX}{INTERNAL_UPDATE_CONFIGURATION}"),
            post(internal_update_configuration),
        )
        .with_state(state)
}

/// ヘルスチェックのルーター
pub fn health_router(readiness_state: Arc<ReadinessState>) -> Router {
    Router::new().route("/health", get(health_check)).merge(
        Router::new()
            .route("/health/ready", get(readiness_check))
            .with_state(readiness_state),
    )
}

/// Request ID とアクセスログのレイヤーを適用する
pub fn with_observability(router: Router) -> Router {
    // レイヤー順序が重要: 下に書いたものが外側
    // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
    // 2. TraceLayer: request_id と rpc.method を含むスパンを作る
    // 3. CanonicalLogLineLayer: 完了時に 1 行サマリログを出力（スパン内）
    // 4. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CanonicalLogLineLayer)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
