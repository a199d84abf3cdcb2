//! # RPC ハンドラ
//!
//! 各ハンドラはボディのデコードとレスポンスの組み立てだけを担い、
//! 処理はパイプライン経由でユースケースに委譲する。
//!
//! ## メソッド
//!
//! - `Storage` - 公開 API（認証あり）
//! - `InternalStorage` - サービス間 API（認証なし、NotFound を明示）

pub mod health;
pub mod internal;
pub mod storage;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use fluxconfig_domain::configuration::ConfigurationDocument;
pub use health::{ReadinessState, health_check, readiness_check};
pub use internal::{internal_load_configuration, internal_update_configuration};
use serde::{Deserialize, Serialize};
pub use storage::{load_configuration, update_configuration};

use crate::{pipeline::Pipeline, usecase::ConfigurationUseCase};

/// RPC ハンドラの共有状態
///
/// 公開 API とサービス間 API は同じ型を使い、保持するパイプラインだけが異なる。
pub struct RpcState {
    pub usecase:         Arc<dyn ConfigurationUseCase>,
    pub load_pipeline:   Pipeline<LoadConfigurationResponse>,
    pub update_pipeline: Pipeline<UpdateConfigurationResponse>,
    /// 呼び出しごとの期限
    pub call_timeout:    Duration,
}

// --- リクエスト/レスポンス型 ---

/// 設定読み出しリクエスト（公開 API）
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfigurationRequest {
    pub configuration_tag: String,
}

/// 設定読み出しリクエスト（サービス間 API）
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalLoadConfigurationRequest {
    pub configuration_key: String,
    pub configuration_tag: String,
}

/// 設定読み出しレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfigurationResponse {
    pub configuration_tag:  String,
    pub configuration_data: serde_json::Value,
    pub updated_at:         DateTime<Utc>,
}

impl From<ConfigurationDocument> for LoadConfigurationResponse {
    fn from(document: ConfigurationDocument) -> Self {
        Self {
            configuration_tag: document.tag().as_str().to_string(),
            updated_at:        document.updated_at(),
            configuration_data: document.into_data(),
        }
    }
}

/// 設定更新リクエスト
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfigurationRequest {
    pub configuration_key:  String,
    pub configuration_tag:  String,
    pub configuration_data: serde_json::Value,
}

/// 設定更新レスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfigurationResponse {}
