//! # テスト用モックリポジトリ
//!
//! ユースケースやパイプラインのテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! fluxconfig-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use fluxconfig_domain::{
    DomainError,
    configuration::ConfigurationDocument,
    value_objects::{ConfigurationKey, ConfigurationTag},
};
use fluxconfig_shared::CancellationSignal;

use crate::repository::ConfigurationRepository;

// ===== MockConfigurationRepository =====

#[derive(Clone, Default)]
pub struct MockConfigurationRepository {
    documents: Arc<Mutex<Vec<ConfigurationDocument>>>,
    failure:   Arc<Mutex<Option<String>>>,
    delay:     Option<Duration>,
    lookups:   Arc<AtomicUsize>,
}

impl MockConfigurationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, document: ConfigurationDocument) {
        self.documents.lock().unwrap().push(document);
    }

    /// 以降の読み出しをストア障害として失敗させる
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// 読み出しの前に指定時間待機させる（キャンセルの検証用）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `load_configuration` が呼ばれた回数
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigurationRepository for MockConfigurationRepository {
    async fn load_configuration(
        &self,
        key: &ConfigurationKey,
        tag: &ConfigurationTag,
        cancellation: &CancellationSignal,
    ) -> Result<ConfigurationDocument, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    return Err(DomainError::internal("Configuration lookup was cancelled."));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(DomainError::internal("Failed to load configuration data.")
                .with_cause(fluxconfig_domain::ErrorCause::new(message)));
        }

        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.key() == key && d.tag() == tag)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Configuration data not found.", tag.as_str()))
    }
}
