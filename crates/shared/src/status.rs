//! # ステータスレスポンス（google.rpc.Status 互換）
//!
//! RPC 呼び出しが失敗したときにワイヤへ返すステータス表現を提供する。
//!
//! ## 設計
//!
//! - `StatusResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - ステータスコードは gRPC の正規コード（[`Code`]）をそのまま用いる
//! - 構造化詳細は `@type` タグ付きの [`StatusDetail`] として保持し、
//!   `BadRequest`（フィールド違反）と `ErrorInfo`（理由 + メタデータ）の 2 種類に限定する
//! - HTTP トランスポートへの変換（HTTP ステータス、`grpc-status` ヘッダー）は
//!   各サービスの責務（shared に axum 依存を入れない）
//!
//! ## JSON 形状
//!
//! ```json
//! {
//!   "code": 3,
//!   "message": "Bad request.\n...",
//!   "details": [
//!     {
//!       "@type": "type.googleapis.com/google.rpc.BadRequest",
//!       "fieldViolations": [{ "field": "configuration_tag", "description": "..." }]
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::IntoStaticStr;

/// gRPC 正規ステータスコード
///
/// `Display` は gRPC の正規名（`INVALID_ARGUMENT` など）を出力する。
/// JSON では数値としてシリアライズされる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// ワイヤ上の数値表現
    pub fn as_i32(self) -> i32 {
        match self {
            Code::Ok => 0,
            Code::Cancelled => 1,
            Code::Unknown => 2,
            Code::InvalidArgument => 3,
            Code::DeadlineExceeded => 4,
            Code::NotFound => 5,
            Code::AlreadyExists => 6,
            Code::PermissionDenied => 7,
            Code::ResourceExhausted => 8,
            Code::FailedPrecondition => 9,
            Code::Aborted => 10,
            Code::OutOfRange => 11,
            Code::Unimplemented => 12,
            Code::Internal => 13,
            Code::Unavailable => 14,
            Code::DataLoss => 15,
            Code::Unauthenticated => 16,
        }
    }

    /// 数値からコードを復元する
    ///
    /// 範囲外の値は gRPC の規約どおり [`Code::Unknown`] として扱う。
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Code::Ok,
            1 => Code::Cancelled,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => Code::Unknown,
        }
    }

    /// HTTP トランスポートで使用するステータスコード
    ///
    /// grpc-gateway の対応表に従う。`Cancelled` は nginx 慣例の 499 を用いる。
    pub fn http_status(self) -> u16 {
        match self {
            Code::Ok => 200,
            Code::Cancelled => 499,
            Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => 400,
            Code::Unauthenticated => 401,
            Code::PermissionDenied => 403,
            Code::NotFound => 404,
            Code::AlreadyExists | Code::Aborted => 409,
            Code::ResourceExhausted => 429,
            Code::Unimplemented => 501,
            Code::Unavailable => 503,
            Code::DeadlineExceeded => 504,
            Code::Unknown | Code::Internal | Code::DataLoss => 500,
        }
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Code::from_i32)
    }
}

/// 不正なフィールド 1 件分の情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field:       String,
    pub description: String,
}

/// 入力検証の失敗を表す詳細（google.rpc.BadRequest）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadRequest {
    pub field_violations: Vec<FieldViolation>,
}

/// エラーの理由と付随情報（google.rpc.ErrorInfo）
///
/// `metadata` は `BTreeMap` で保持し、シリアライズ結果をキー順で安定させる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub reason:   String,
    pub metadata: BTreeMap<String, String>,
}

impl ErrorInfo {
    /// 理由のみを持つ `ErrorInfo` を作成する
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason:   reason.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// メタデータを 1 件追加する
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// ステータスに添付される構造化詳細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum StatusDetail {
    #[serde(rename = "type.googleapis.com/google.rpc.BadRequest")]
    BadRequest(BadRequest),
    #[serde(rename = "type.googleapis.com/google.rpc.ErrorInfo")]
    ErrorInfo(ErrorInfo),
}

/// RPC 呼び出しの失敗を表すステータスレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub code:    Code,
    pub message: String,
    #[serde(default)]
    pub details: Vec<StatusDetail>,
}

impl StatusResponse {
    /// 詳細なしのステータスを作成する
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// 構造化詳細を追加する
    pub fn with_detail(mut self, detail: StatusDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// 呼び出しのキャンセル
    pub fn cancelled() -> Self {
        Self::new(Code::Cancelled, "Call was cancelled.")
    }

    /// 呼び出し期限の超過
    pub fn deadline_exceeded() -> Self {
        Self::new(Code::DeadlineExceeded, "Call deadline exceeded.")
    }

    /// 最初の `ErrorInfo` 詳細を返す
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.details.iter().find_map(|detail| match detail {
            StatusDetail::ErrorInfo(info) => Some(info),
            StatusDetail::BadRequest(_) => None,
        })
    }

    /// 最初の `BadRequest` 詳細を返す
    pub fn bad_request(&self) -> Option<&BadRequest> {
        self.details.iter().find_map(|detail| match detail {
            StatusDetail::BadRequest(bad_request) => Some(bad_request),
            StatusDetail::ErrorInfo(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_codeの数値表現がgrpc正規コードと一致する() {
        assert_eq!(Code::Ok.as_i32(), 0);
        assert_eq!(Code::InvalidArgument.as_i32(), 3);
        assert_eq!(Code::NotFound.as_i32(), 5);
        assert_eq!(Code::AlreadyExists.as_i32(), 6);
        assert_eq!(Code::Unimplemented.as_i32(), 12);
        assert_eq!(Code::Internal.as_i32(), 13);
        assert_eq!(Code::Unauthenticated.as_i32(), 16);
    }

    #[test]
    fn test_from_i32は範囲外の値をunknownにする() {
        assert_eq!(Code::from_i32(16), Code::Unauthenticated);
        assert_eq!(Code::from_i32(2), Code::Unknown);
        assert_eq!(Code::from_i32(99), Code::Unknown);
        assert_eq!(Code::from_i32(-1), Code::Unknown);
    }

    #[test]
    fn test_codeのdisplayが正規名を出力する() {
        assert_eq!(Code::InvalidArgument.to_string(), "INVALID_ARGUMENT");
        assert_eq!(Code::Unauthenticated.to_string(), "UNAUTHENTICATED");
    }

    #[test]
    fn test_http_statusがgateway対応表に従う() {
        assert_eq!(Code::InvalidArgument.http_status(), 400);
        assert_eq!(Code::Unauthenticated.http_status(), 401);
        assert_eq!(Code::NotFound.http_status(), 404);
        assert_eq!(Code::AlreadyExists.http_status(), 409);
        assert_eq!(Code::Cancelled.http_status(), 499);
        assert_eq!(Code::Internal.http_status(), 500);
        assert_eq!(Code::Unimplemented.http_status(), 501);
        assert_eq!(Code::DeadlineExceeded.http_status(), 504);
    }

    #[test]
    fn test_bad_requestのjson形状() {
        let status = StatusResponse::new(Code::InvalidArgument, "Bad request.").with_detail(
            StatusDetail::BadRequest(BadRequest {
                field_violations: vec![FieldViolation {
                    field:       "configuration_tag".to_string(),
                    description: "must not be empty".to_string(),
                }],
            }),
        );

        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "code": 3,
                "message": "Bad request.",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.BadRequest",
                    "fieldViolations": [{
                        "field": "configuration_tag",
                        "description": "must not be empty"
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_error_infoのメタデータはキー順でシリアライズされる() {
        let info = ErrorInfo::new("NOT_FOUND")
            .with_metadata("method", "/svc/Method")
            .with_metadata("entity", "missing");
        let status =
            StatusResponse::new(Code::NotFound, "not found").with_detail(StatusDetail::ErrorInfo(info));

        let json = serde_json::to_string(&status).unwrap();

        assert_eq!(
            json,
            r#"{"code":5,"message":"not found","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"NOT_FOUND","metadata":{"entity":"missing","method":"/svc/Method"}}]}"#
        );
    }

    #[test]
    fn test_jsonデシリアライズで詳細を復元できる() {
        let json = r#"{
            "code": 13,
            "message": "Unknown exception occurred during the method call.",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                "reason": "INTERNAL_ERROR",
                "metadata": { "method": "/svc/Method" }
            }]
        }"#;

        let status: StatusResponse = serde_json::from_str(json).unwrap();

        assert_eq!(status.code, Code::Internal);
        let info = status.error_info().expect("ErrorInfo が存在すること");
        assert_eq!(info.reason, "INTERNAL_ERROR");
        assert_eq!(info.metadata.get("method").map(String::as_str), Some("/svc/Method"));
        assert!(status.bad_request().is_none());
    }

    #[test]
    fn test_details省略時は空として扱う() {
        let status: StatusResponse =
            serde_json::from_str(r#"{"code":16,"message":"Empty authentication metadata."}"#)
                .unwrap();

        assert_eq!(status.code, Code::Unauthenticated);
        assert!(status.details.is_empty());
    }
}
