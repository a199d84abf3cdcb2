//! # 呼び出しコンテキスト
//!
//! 1 回の RPC 呼び出しの間だけ存在し、パイプライン上を所有権ごと受け渡される。

use fluxconfig_shared::CancellationSignal;

/// クライアントが API キーを渡すメタデータキー
pub const API_KEY_HEADER: &str = "x-api-key";

/// 認証後にパイプラインが注入する設定キーのメタデータキー
pub const CONFIGURATION_KEY_HEADER: &str = "x-cfg-key";

/// 呼び出しメタデータ
///
/// gRPC メタデータと同様にキーは ASCII 小文字に正規化する。
/// 同一キーの重複を許し、挿入順を保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// エントリを末尾に追加する
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .push((key.as_ref().to_ascii_lowercase(), value.into()));
    }

    /// キーに対応する最後の値を返す
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// キーに対応するエントリをすべて削除し、削除した件数を返す
    pub fn remove(&mut self, key: &str) -> usize {
        let key = key.to_ascii_lowercase();
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

/// 呼び出しコンテキスト
#[derive(Debug, Clone)]
pub struct CallContext {
    method:       String,
    metadata:     Metadata,
    cancellation: CancellationSignal,
}

impl CallContext {
    pub fn new(
        method: impl Into<String>,
        metadata: Metadata,
        cancellation: CancellationSignal,
    ) -> Self {
        Self {
            method: method.into(),
            metadata,
            cancellation,
        }
    }

    /// 完全なメソッド名（`/fluxconfig.storage.v1.Storage/LoadConfiguration`）
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    /// 認証ハンドラが注入した設定キー
    pub fn configuration_key(&self) -> Option<&str> {
        self.metadata.get(CONFIGURATION_KEY_HEADER)
    }
}
