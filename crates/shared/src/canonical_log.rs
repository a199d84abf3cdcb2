//! # Canonical Log Line ミドルウェア
//!
//! RPC 呼び出し完了時に、その呼び出しの重要情報を 1 行に集約した
//! サマリログ（Canonical Log Line）を出力する tower Layer。
//!
//! パイプライン内のロギングハンドラは「呼び出し開始時のメタデータ」を記録する。
//! こちらは「呼び出し結果」（HTTP ステータス、`grpc-status`、レイテンシ）を記録する。
//!
//! TraceLayer のスパン内に配置することで、スパンフィールド（request_id, rpc.method）が
//! JSON ログに自動的に含まれる:
//!
//! ```text
//! TraceLayer → CanonicalLogLineLayer → handler（パイプライン）
//! ```

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use http::{Request, Response};
use tower::{Layer, Service};

/// RPC ステータスコードを運ぶレスポンスヘッダー名
pub const GRPC_STATUS_HEADER: &str = "grpc-status";

/// ヘルスチェックパスかどうかを判定する
///
/// `/health`（liveness）と `/health/ready`（readiness）を除外対象とする。
fn is_health_check_path(path: &str) -> bool {
    path.starts_with("/health")
}

/// レスポンスから RPC ステータスコードを読み取る
///
/// ヘッダーが存在しない、または数値でない場合は `None`。
fn rpc_code<B>(response: &Response<B>) -> Option<i32> {
    response
        .headers()
        .get(GRPC_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Canonical Log Line を出力する Layer
///
/// 呼び出し完了時に `log.type = "canonical"` マーカー付きのサマリログを出力する。
/// RPC が成功（`grpc-status: 0`）した場合は INFO、失敗した場合は WARN で出力する。
#[derive(Clone, Debug)]
pub struct CanonicalLogLineLayer;

impl<S> Layer<S> for CanonicalLogLineLayer {
    type Service = CanonicalLogLineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CanonicalLogLineService { inner }
    }
}

/// [`CanonicalLogLineLayer`] が生成する Service
#[derive(Clone, Debug)]
pub struct CanonicalLogLineService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CanonicalLogLineService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // clone-swap パターン: poll_ready で得た readiness を保持する inner を使う
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if is_health_check_path(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match rpc_code(response) {
                        Some(0) => tracing::info!(
                            log.r#type = "canonical",
                            http.status_code = status,
                            rpc.code = 0,
                            rpc.latency_ms = latency_ms,
                            "RPC 呼び出し完了"
                        ),
                        Some(code) => tracing::warn!(
                            log.r#type = "canonical",
                            http.status_code = status,
                            rpc.code = code,
                            rpc.latency_ms = latency_ms,
                            "RPC 呼び出し失敗"
                        ),
                        None => tracing::info!(
                            log.r#type = "canonical",
                            http.status_code = status,
                            rpc.latency_ms = latency_ms,
                            "リクエスト完了"
                        ),
                    }
                }
                Err(err) => {
                    tracing::error!(
                        log.r#type = "canonical",
                        rpc.latency_ms = latency_ms,
                        error.message = %err,
                        "リクエスト処理エラー"
                    );
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    // テスト用のダミー Service
    #[derive(Clone)]
    struct DummyService {
        status:      http::StatusCode,
        grpc_status: Option<&'static str>,
    }

    impl Service<Request<()>> for DummyService {
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            let mut builder = Response::builder().status(self.status);
            if let Some(code) = self.grpc_status {
                builder = builder.header(GRPC_STATUS_HEADER, code);
            }
            Box::pin(async move { Ok(builder.body(()).unwrap()) })
        }
    }

    // テスト用のエラーを返す Service
    #[derive(Clone)]
    struct ErrorService;

    impl Service<Request<()>> for ErrorService {
        type Error = String;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            Box::pin(async { Err("internal service error".to_string()) })
        }
    }

    /// テスト用にログイベントをキャプチャする Layer
    #[derive(Clone)]
    struct CaptureLayer {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Debug, Clone)]
    struct CapturedEvent {
        level:   tracing::Level,
        message: String,
        fields:  Vec<(String, String)>,
    }

    impl CapturedEvent {
        fn field(&self, name: &str) -> Option<&str> {
            self.fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = FieldVisitor::default();
            event.record(&mut visitor);

            self.events.lock().unwrap().push(CapturedEvent {
                level:   *event.metadata().level(),
                message: visitor.message.unwrap_or_default(),
                fields:  visitor.fields,
            });
        }
    }

    #[derive(Default)]
    struct FieldVisitor {
        message: Option<String>,
        fields:  Vec<(String, String)>,
    }

    impl tracing::field::Visit for FieldVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.message = Some(format!("{:?}", value));
            } else {
                self.fields
                    .push((field.name().to_string(), format!("{:?}", value)));
            }
        }

        fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }

        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "message" {
                self.message = Some(value.to_string());
            } else {
                self.fields
                    .push((field.name().to_string(), value.to_string()));
            }
        }
    }

    /// 返り値の `DefaultGuard` はスコープに保持すること（ドロップでリセット）。
    fn setup_capture() -> (
        tracing::subscriber::DefaultGuard,
        Arc<Mutex<Vec<CapturedEvent>>>,
    ) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let capture = CaptureLayer {
            events: events.clone(),
        };
        let subscriber = tracing_subscriber::registry().with(capture);
        let guard = tracing::subscriber::set_default(subscriber);
        (guard, events)
    }

    fn build_request(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    const LOAD_PATH: &str = "/fluxconfig.storage.v1.Storage/LoadConfiguration";

    #[test]
    fn test_is_health_check_pathはhealth系パスのみtrueを返す() {
        assert!(is_health_check_path("/health"));
        assert!(is_health_check_path("/health/ready"));
        assert!(!is_health_check_path(LOAD_PATH));
    }

    #[tokio::test]
    async fn test_成功したrpcはinfoレベルでrpc_codeとともに出力される() {
        let (_guard, events) = setup_capture();

        let mut sut = CanonicalLogLineLayer.layer(DummyService {
            status:      http::StatusCode::OK,
            grpc_status: Some("0"),
        });

        sut.call(build_request(LOAD_PATH)).await.unwrap();

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1, "1つのログイベントが出力されること");
        assert_eq!(captured[0].level, tracing::Level::INFO);
        assert_eq!(captured[0].message, "RPC 呼び出し完了");
        assert_eq!(captured[0].field("log.type"), Some("canonical"));
        assert_eq!(captured[0].field("rpc.code"), Some("0"));
        assert_eq!(captured[0].field("http.status_code"), Some("200"));
    }

    #[tokio::test]
    async fn test_失敗したrpcはwarnレベルで出力される() {
        let (_guard, events) = setup_capture();

        let mut sut = CanonicalLogLineLayer.layer(DummyService {
            status:      http::StatusCode::UNAUTHORIZED,
            grpc_status: Some("16"),
        });

        sut.call(build_request(LOAD_PATH)).await.unwrap();

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].level, tracing::Level::WARN);
        assert_eq!(captured[0].field("rpc.code"), Some("16"));
        assert_eq!(captured[0].field("http.status_code"), Some("401"));
    }

    #[tokio::test]
    async fn test_grpc_statusがないレスポンスはhttpステータスのみ出力する() {
        let (_guard, events) = setup_capture();

        let mut sut = CanonicalLogLineLayer.layer(DummyService {
            status:      http::StatusCode::NOT_FOUND,
            grpc_status: None,
        });

        sut.call(build_request("/unknown")).await.unwrap();

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].message, "リクエスト完了");
        assert_eq!(captured[0].field("rpc.code"), None);
        assert!(captured[0].field("rpc.latency_ms").is_some());
    }

    #[tokio::test]
    async fn test_healthパスではcanonical_log_lineが出力されない() {
        let (_guard, events) = setup_capture();

        let mut sut = CanonicalLogLineLayer.layer(DummyService {
            status:      http::StatusCode::OK,
            grpc_status: None,
        });

        sut.call(build_request("/health/ready")).await.unwrap();

        assert!(
            events.lock().unwrap().is_empty(),
            "ヘルスチェックではログが出力されないこと"
        );
    }

    #[tokio::test]
    async fn test_serviceエラー時にerrorレベルで出力される() {
        let (_guard, events) = setup_capture();

        let mut sut = CanonicalLogLineLayer.layer(ErrorService);

        let result = sut.call(build_request(LOAD_PATH)).await;
        assert!(result.is_err());

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].level, tracing::Level::ERROR);
        assert_eq!(captured[0].message, "リクエスト処理エラー");
    }
}
