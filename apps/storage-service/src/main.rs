//! # Storage Service サーバー
//!
//! 設定ドキュメントの読み出しを提供する RPC サーバー。
//!
//! ## アクセス制御
//!
//! 公開 API は `X-API-KEY` による認証を必須とする。
//! サービス間 API は認証を行わないため、`STORAGE_INTERNAL_PORT` を設定して
//! 内部ネットワークからのみ到達可能な listener に分離することを推奨する。
//!
//! ```text
//! ┌──────────────┐  STORAGE_PORT           ┌────────────────┐     ┌──────────────┐
//! │   Clients    │────────────────────────▶│Storage Service │────▶│   Database   │
//! └──────────────┘                         └────────────────┘     └──────────────┘
//!                        STORAGE_INTERNAL_PORT   ↑        │
//!                          （内部ネットワーク）    │        ▼ API キー交換
//!                        ┌──────────────┐        │   ┌────────────────────┐
//!                        │内部サービス   │────────┘   │ Management Service │
//!                        └──────────────┘            └────────────────────┘
//! ```
//!
//! 環境変数は [`config`](fluxconfig_storage_service::config) を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! STORAGE_PORT=5200 DATABASE_URL=postgres://... MANAGEMENT_SERVICE_URL=http://... \
//!   cargo run -p fluxconfig-storage-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use fluxconfig_infra::{db, repository::PostgresConfigurationRepository};
use fluxconfig_shared::observability::{TracingConfig, init_tracing};
use fluxconfig_storage_service::{
    app_builder::{self, AppDeps},
    client::ManagementServiceClientImpl,
    config::StorageConfig,
    handler::ReadinessState,
    usecase::ConfigurationUseCaseImpl,
};
use tokio::net::TcpListener;

/// Storage Service サーバーのエントリーポイント
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. 設定の読み込み
/// 4. DB 接続とマイグレーション
/// 5. ルーターの構築とサーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("storage-service"));
    let _tracing_guard = tracing::info_span!("app", service = "storage-service").entered();

    let config = StorageConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Storage Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションに失敗しました")?;
    tracing::info!("データベースに接続しました");

    let repository = Arc::new(PostgresConfigurationRepository::new(pool.clone()));
    let deps = AppDeps {
        usecase:           Arc::new(ConfigurationUseCaseImpl::new(repository)),
        management_client: Arc::new(ManagementServiceClientImpl::new(
            &config.management_service_url,
        )),
        call_timeout:      config.call_timeout,
    };
    let health = app_builder::health_router(Arc::new(ReadinessState { pool }));

    match config.internal_port {
        Some(internal_port) => {
            let public = app_builder::public_router(&deps).merge(health.clone());
            let internal = app_builder::internal_router(&deps).merge(health);

            tokio::try_join!(
                serve(&config.host, config.port, public, "公開 API"),
                serve(&config.host, internal_port, internal, "サービス間 API"),
            )?;
        }
        None => {
            let app = app_builder::public_router(&deps)
                .merge(app_builder::internal_router(&deps))
                .merge(health);

            serve(&config.host, config.port, app, "公開 API + サービス間 API").await?;
        }
    }

    Ok(())
}

async fn serve(host: &str, port: u16, router: Router, surface: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("アドレスのパースに失敗しました: {host}:{port}"))?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("{} を待ち受けます: {}", surface, addr);

    axum::serve(listener, app_builder::with_observability(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "シャットダウンシグナルの待ち受けに失敗しました");
        std::future::pending::<()>().await;
    }
    tracing::info!("シャットダウンします");
}
