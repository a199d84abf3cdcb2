//! # 管理サービスクライアント
//!
//! API キーを設定キーに交換する認証処理を管理サービスに委譲する。
//!
//! ## エンドポイント
//!
//! - `POST /internal/auth/client` - `{"api_key"}` → `{"configuration_key"}`
//!
//! ## エラーの正規化
//!
//! | 管理サービスの応答 | 返すエラー |
//! |-------------------|-----------|
//! | 401 / 403 / 404 | `Unauthenticated("Invalid API key.")` |
//! | 接続失敗 / タイムアウト / 503 / その他 / 不正なボディ | `Internal`（原因付き） |

use async_trait::async_trait;
use fluxconfig_domain::{
    DomainError,
    value_objects::{ApiKey, ConfigurationKey},
};
use fluxconfig_shared::CancellationSignal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INVALID_API_KEY: &str = "Invalid API key.";

/// 管理サービスクライアントエラー
#[derive(Debug, Clone, Error)]
pub enum ManagementServiceError {
    /// API キーが無効（401 / 403 / 404）
    #[error("API キーが無効です")]
    InvalidApiKey,

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// 管理サービスが利用不可（接続失敗、タイムアウト、503）
    #[error("管理サービスが一時的に利用できません")]
    ServiceUnavailable,

    /// 応答ボディが契約に従っていない
    #[error("不正な応答: {0}")]
    InvalidResponse(String),

    /// 予期しないステータス
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ManagementServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ManagementServiceError::ServiceUnavailable
        } else if err.is_decode() {
            ManagementServiceError::InvalidResponse(err.to_string())
        } else {
            ManagementServiceError::Network(err.to_string())
        }
    }
}

impl From<ManagementServiceError> for DomainError {
    fn from(err: ManagementServiceError) -> Self {
        match err {
            ManagementServiceError::InvalidApiKey => DomainError::unauthenticated(INVALID_API_KEY),
            other => DomainError::internal("Client authentication failed.").caused_by(&other),
        }
    }
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Serialize)]
struct AuthClientRequest<'a> {
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthClientResponse {
    configuration_key: String,
}

/// 管理サービスクライアントトレイト
///
/// テスト時にスタブを使用できるようトレイトで定義。
#[async_trait]
pub trait ManagementServiceClient: Send + Sync {
    /// API キーを設定キーに交換する
    ///
    /// キャンセルシグナルが発火した場合、呼び出し側は結果を待たずに破棄してよい。
    async fn authenticate_client(
        &self,
        api_key: &ApiKey,
        cancellation: &CancellationSignal,
    ) -> Result<ConfigurationKey, DomainError>;
}

/// 管理サービスクライアント実装
pub struct ManagementServiceClientImpl {
    base_url: String,
    client:   reqwest::Client,
}

impl ManagementServiceClientImpl {
    /// # 引数
    ///
    /// - `base_url`: 管理サービスのベース URL（例: `http://localhost:5100`）
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client:   reqwest::Client::new(),
        }
    }

    async fn exchange(&self, api_key: &ApiKey) -> Result<String, ManagementServiceError> {
        let url = format!("{}/internal/auth/client", self.base_url);
        let request = AuthClientRequest {
            api_key: api_key.as_str(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.json::<AuthClientResponse>().await?;
                Ok(body.configuration_key)
            }
            reqwest::StatusCode::UNAUTHORIZED
            | reqwest::StatusCode::FORBIDDEN
            | reqwest::StatusCode::NOT_FOUND => Err(ManagementServiceError::InvalidApiKey),
            reqwest::StatusCode::SERVICE_UNAVAILABLE => {
                Err(ManagementServiceError::ServiceUnavailable)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ManagementServiceError::Unexpected(format!(
                    "予期しないステータス {}: {}",
                    status, body
                )))
            }
        }
    }
}

#[async_trait]
impl ManagementServiceClient for ManagementServiceClientImpl {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn authenticate_client(
        &self,
        api_key: &ApiKey,
        cancellation: &CancellationSignal,
    ) -> Result<ConfigurationKey, DomainError> {
        let raw = tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                return Err(DomainError::internal("Client authentication was cancelled."));
            }
            result = self.exchange(api_key) => result?,
        };

        ConfigurationKey::new(raw).map_err(|e| {
            DomainError::internal("Client authentication failed.").caused_by(
                &ManagementServiceError::InvalidResponse(format!("configuration_key: {e}")),
            )
        })
    }
}
