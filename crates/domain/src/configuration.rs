//! # 設定ドキュメント
//!
//! `(設定キー, 設定タグ)` で一意に特定される読み取り専用の設定データ。
//! ペイロードは任意の JSON で、ストレージサービスはその中身を解釈しない。

use chrono::{DateTime, Utc};

use crate::value_objects::{ConfigurationKey, ConfigurationTag};

/// 設定ドキュメント
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDocument {
    key:        ConfigurationKey,
    tag:        ConfigurationTag,
    data:       serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl ConfigurationDocument {
    pub fn new(
        key: ConfigurationKey,
        tag: ConfigurationTag,
        data: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            tag,
            data,
            updated_at,
        }
    }

    pub fn key(&self) -> &ConfigurationKey {
        &self.key
    }

    pub fn tag(&self) -> &ConfigurationTag {
        &self.tag
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// ペイロードの所有権を取り出す
    pub fn into_data(self) -> serde_json::Value {
        self.data
    }
}
