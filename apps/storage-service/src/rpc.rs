//! # RPC トランスポートアダプタ
//!
//! axum の HTTP リクエストを 1 回の単項 RPC 呼び出しとしてパイプラインに渡し、
//! 結果を HTTP レスポンスに戻す。
//!
//! - HTTP ヘッダー → 呼び出しメタデータ（可視 ASCII でない値は捨てる）
//! - 呼び出しごとにキャンセルシグナルを生成し、期限切れまたはリクエスト Future の
//!   破棄（クライアント切断）で発火させる
//! - 成功: `200` + JSON、`grpc-status: 0`
//! - 失敗: コードに対応する HTTP ステータス + [`StatusResponse`] の JSON、`grpc-status: <code>`

use std::{future::Future, time::Duration};

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use fluxconfig_domain::{DomainError, FieldViolation, ValidationFailure};
use fluxconfig_shared::{Code, StatusResponse, cancellation, canonical_log::GRPC_STATUS_HEADER};
use serde::{Serialize, de::DeserializeOwned};

use crate::pipeline::{CallContext, Metadata, Pipeline};

/// 成功レスポンス
#[derive(Debug)]
pub struct RpcOk<T>(pub T);

impl<T: Serialize> IntoResponse for RpcOk<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.0).into_response();
        response
            .headers_mut()
            .insert(GRPC_STATUS_HEADER, HeaderValue::from(Code::Ok.as_i32()));
        response
    }
}

/// 失敗レスポンス
#[derive(Debug)]
pub struct RpcStatus(pub StatusResponse);

impl IntoResponse for RpcStatus {
    fn into_response(self) -> Response {
        let code = self.0.code;
        let http_status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (http_status, Json(self.0)).into_response();
        response
            .headers_mut()
            .insert(GRPC_STATUS_HEADER, HeaderValue::from(code.as_i32()));
        response
    }
}

pub type RpcResponse<T> = Result<RpcOk<T>, RpcStatus>;

/// HTTP ヘッダーを呼び出しメタデータに変換する
pub fn metadata_from_headers(headers: &HeaderMap) -> Metadata {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
        .collect()
}

/// リクエストボディを JSON としてデコードする
///
/// 空のボディは `{}` として扱う。デコード失敗は検証エラー。
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DomainError> {
    let body = if body.is_empty() { b"{}".as_slice() } else { body };

    serde_json::from_slice(body).map_err(|e| {
        DomainError::validation(
            "Invalid request body.",
            ValidationFailure::from(FieldViolation::new("body", e.to_string())),
        )
    })
}

/// 1 回の RPC 呼び出しをパイプラインに通して実行する
///
/// `timeout` を過ぎるとキャンセルシグナルを発火し、パイプラインが
/// キャンセルとして終了した場合は `DeadlineExceeded` を返す。
pub async fn dispatch<R, F, Fut>(
    pipeline: &Pipeline<R>,
    method: &str,
    headers: &HeaderMap,
    timeout: Duration,
    business: F,
) -> RpcResponse<R>
where
    R: Send + 'static,
    F: FnOnce(CallContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, DomainError>> + Send + 'static,
{
    // handle はこの Future と共に破棄され、破棄もキャンセルとして伝わる
    let (handle, signal) = cancellation::pair();
    let ctx = CallContext::new(method, metadata_from_headers(headers), signal);

    let call = pipeline.call(ctx, business);
    tokio::pin!(call);

    let result = tokio::select! {
        biased;
        result = &mut call => result,
        () = tokio::time::sleep(timeout) => {
            handle.cancel();
            match call.await {
                Err(status) if status.code == Code::Cancelled => {
                    tracing::warn!(rpc.method = %method, ?timeout, "呼び出し期限を超過しました");
                    Err(StatusResponse::deadline_exceeded())
                }
                other => other,
            }
        }
    };

    result.map(RpcOk).map_err(RpcStatus)
}

#[cfg(test)]
mod tests {
    use fluxconfig_domain::DomainErrorKind;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn test_metadata_from_headersは可視asciiでない値を捨てる() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("key"));
        headers.insert(
            "x-binary",
            HeaderValue::from_bytes(b"\xfa\xfb").unwrap(),
        );

        let metadata = metadata_from_headers(&headers);

        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("X-API-KEY"), Some("key"));
    }

    #[test]
    fn test_decodeは空のボディを空オブジェクトとして扱う() {
        let probe: Probe = decode(b"").unwrap();
        assert_eq!(probe, Probe { name: String::new() });
    }

    #[test]
    fn test_decodeの失敗は検証エラーになる() {
        let error = decode::<Probe>(b"{not json").unwrap_err();

        assert!(matches!(error.kind(), DomainErrorKind::Validation { .. }));
        assert_eq!(error.violations()[0].field, "body");
    }

    #[test]
    fn test_rpc_statusはhttpステータスとgrpc_statusヘッダーを設定する() {
        let response =
            RpcStatus(StatusResponse::new(Code::Unauthenticated, "Empty authentication metadata."))
                .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(GRPC_STATUS_HEADER).unwrap(), "16");
    }

    #[test]
    fn test_rpc_okはgrpc_status_0を設定する() {
        let response = RpcOk(serde_json::json!({})).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(GRPC_STATUS_HEADER).unwrap(), "0");
    }
}
