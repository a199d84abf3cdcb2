//! # 値オブジェクト
//!
//! 設定の読み出しに関わる識別子を Newtype として定義する。
//!
//! | 型 | 用途 | 最大長 | PII |
//! |---|------|--------|-----|
//! | [`ApiKey`] | クライアントが `X-API-KEY` で提示する資格情報 | 256 | ○ |
//! | [`ConfigurationKey`] | 認証後に払い出される内部の設定キー | 256 | ○ |
//! | [`ConfigurationTag`] | 設定ドキュメントの名前付きタグ | 128 | - |

define_validated_string! {
    /// クライアントの API キー
    pub struct ApiKey {
        field: "x-api-key",
        label: "API key",
        max_length: 256,
        pii: true,
    }
}

define_validated_string! {
    /// 設定キー
    ///
    /// 管理サービスが API キーと引き換えに払い出す。
    /// 設定タグと組み合わせて設定ドキュメントを一意に特定する。
    pub struct ConfigurationKey {
        field: "configuration_key",
        label: "configuration key",
        max_length: 256,
        pii: true,
    }
}

define_validated_string! {
    /// 設定タグ（例: `"production"`, `"staging"`）
    pub struct ConfigurationTag {
        field: "configuration_tag",
        label: "configuration tag",
        max_length: 128,
    }
}
