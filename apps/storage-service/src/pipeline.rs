//! # リクエスト処理パイプライン
//!
//! すべての RPC 呼び出しを包む横断的ハンドラの連鎖。
//!
//! ```text
//! 公開 API:     認証 → ロギング → 例外境界(External) → ビジネスロジック
//! サービス間:          ロギング → 例外境界(Internal) → ビジネスロジック
//! ```
//!
//! 各ハンドラは残りのパイプラインを明示的な継続（[`Next`]）として受け取る。
//! 継続を呼ばずに返せば、それ以降のハンドラとビジネスロジックは実行されない。
//!
//! ## エラーの流れ
//!
//! ビジネスロジックは [`DomainError`] を返す。例外境界がそれを一度だけ
//! [`StatusResponse`] に変換し、[`CallError::Status`] として上流へ返す。
//! 境界より上（認証ハンドラ）で発生したエラーは、パイプラインの出口で
//! 同じ変換器によって変換され、境界と同じ基準でログに記録される。

mod auth;
mod context;
mod exception;
mod logging;

use std::{future::Future, pin::Pin, sync::Arc};

pub use auth::ApiKeyAuthHandler;
pub use context::{API_KEY_HEADER, CONFIGURATION_KEY_HEADER, CallContext, Metadata};
pub use exception::ExceptionHandler;
use fluxconfig_domain::DomainError;
use fluxconfig_shared::StatusResponse;
pub use logging::{LoggingHandler, render_headers};

use crate::translator::StatusTranslator;

/// パイプライン内を流れる失敗
#[derive(Debug)]
pub enum CallError {
    /// まだ変換されていないドメインエラー
    Domain(DomainError),
    /// 例外境界で変換済みのステータス
    Status(StatusResponse),
    /// 呼び出しがキャンセルされた
    Cancelled,
}

impl From<DomainError> for CallError {
    fn from(error: DomainError) -> Self {
        Self::Domain(error)
    }
}

pub type CallResult<R> = Result<R, CallError>;

pub type BoxCallFuture<'a, R> = Pin<Box<dyn Future<Output = CallResult<R>> + Send + 'a>>;

type UnaryMethod<'a, R> = Box<dyn FnOnce(CallContext) -> BoxCallFuture<'a, R> + Send + 'a>;

/// パイプラインの 1 段
#[async_trait::async_trait]
pub trait CallHandler<R: Send + 'static>: Send + Sync {
    async fn handle(&self, ctx: CallContext, next: Next<'_, R>) -> CallResult<R>;
}

/// 残りのパイプライン（継続）
pub struct Next<'a, R> {
    handlers: &'a [Arc<dyn CallHandler<R>>],
    method:   UnaryMethod<'a, R>,
}

impl<'a, R: Send + 'static> Next<'a, R> {
    /// 次のハンドラ、最後であればビジネスロジックを実行する
    pub async fn run(self, ctx: CallContext) -> CallResult<R> {
        match self.handlers.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    handlers: rest,
                    method:   self.method,
                };
                head.handle(ctx, next).await
            }
            None => (self.method)(ctx).await,
        }
    }
}

/// 起動時に組み立てる、順序付きハンドラの列
pub struct Pipeline<R> {
    handlers:   Vec<Arc<dyn CallHandler<R>>>,
    translator: StatusTranslator,
}

impl<R: Send + 'static> Pipeline<R> {
    pub fn builder() -> PipelineBuilder<R> {
        PipelineBuilder {
            handlers: Vec::new(),
        }
    }

    /// パイプラインを通してビジネスロジックを実行する
    pub async fn call<'a, F, Fut>(&'a self, ctx: CallContext, method: F) -> Result<R, StatusResponse>
    where
        F: FnOnce(CallContext) -> Fut + Send + 'a,
        Fut: Future<Output = Result<R, DomainError>> + Send + 'a,
    {
        let method_name = ctx.method().to_string();
        let method: UnaryMethod<'a, R> = Box::new(move |ctx| {
            Box::pin(async move { method(ctx).await.map_err(CallError::from) })
        });
        let next = Next {
            handlers: &self.handlers,
            method,
        };

        match next.run(ctx).await {
            Ok(response) => Ok(response),
            Err(CallError::Status(status)) => Err(status),
            Err(CallError::Domain(error)) => {
                exception::log_failure(&error, &method_name);
                Err(self.translator.translate(&error, &method_name))
            }
            Err(CallError::Cancelled) => {
                tracing::info!(rpc.method = %method_name, "呼び出しがキャンセルされました");
                Err(StatusResponse::cancelled())
            }
        }
    }
}

impl<R> Clone for Pipeline<R> {
    fn clone(&self) -> Self {
        Self {
            handlers:   self.handlers.clone(),
            translator: self.translator,
        }
    }
}

/// [`Pipeline`] のビルダー
///
/// [`boundary`](Self::boundary) で例外境界を追加してパイプラインを完成させる。
/// 境界は常に最後の段になる。
pub struct PipelineBuilder<R> {
    handlers: Vec<Arc<dyn CallHandler<R>>>,
}

impl<R: Send + 'static> PipelineBuilder<R> {
    pub fn handler(mut self, handler: Arc<dyn CallHandler<R>>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn boundary(mut self, translator: StatusTranslator) -> Pipeline<R> {
        self.handlers.push(Arc::new(ExceptionHandler::new(translator)));
        Pipeline {
            handlers: self.handlers,
            translator,
        }
    }
}

/// 公開 API 用パイプライン: 認証 → ロギング → 例外境界(External)
pub fn public<R: Send + 'static>(
    auth: Arc<ApiKeyAuthHandler>,
    logging: Arc<LoggingHandler>,
) -> Pipeline<R> {
    Pipeline::builder()
        .handler(auth)
        .handler(logging)
        .boundary(StatusTranslator::external())
}

/// サービス間 API 用パイプライン: ロギング → 例外境界(Internal)
pub fn internal<R: Send + 'static>(logging: Arc<LoggingHandler>) -> Pipeline<R> {
    Pipeline::builder()
        .handler(logging)
        .boundary(StatusTranslator::internal())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fluxconfig_domain::ErrorCause;
    use fluxconfig_shared::{CancellationSignal, Code};
    use pretty_assertions::assert_eq;

    use super::*;

    const METHOD: &str = "/fluxconfig.storage.v1.Storage/LoadConfiguration";

    /// 呼ばれた順に名前を記録するハンドラ
    struct Recorder {
        name: &'static str,
        log:  Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait::async_trait]
    impl<R: Send + 'static> CallHandler<R> for Recorder {
        async fn handle(&self, ctx: CallContext, next: Next<'_, R>) -> CallResult<R> {
            self.log.lock().unwrap().push(self.name);
            next.run(ctx).await
        }
    }

    /// 継続を呼ばずに失敗するハンドラ
    struct Reject;

    #[async_trait::async_trait]
    impl<R: Send + 'static> CallHandler<R> for Reject {
        async fn handle(&self, _ctx: CallContext, _next: Next<'_, R>) -> CallResult<R> {
            Err(DomainError::unauthenticated("rejected").into())
        }
    }

    fn context() -> CallContext {
        CallContext::new(METHOD, Metadata::new(), CancellationSignal::never())
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_ハンドラは登録順に実行される() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sut: Pipeline<u32> = Pipeline::builder()
            .handler(recorder("first", &log))
            .handler(recorder("second", &log))
            .boundary(StatusTranslator::external());

        let log_in_method = log.clone();
        let result = sut
            .call(context(), move |_ctx| async move {
                log_in_method.lock().unwrap().push("method");
                Ok(42)
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "method"]);
    }

    #[tokio::test]
    async fn test_継続を呼ばないハンドラは後続を実行させない() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sut: Pipeline<u32> = Pipeline::builder()
            .handler(Arc::new(Reject))
            .handler(recorder("after", &log))
            .boundary(StatusTranslator::external());

        let result = sut.call(context(), |_ctx| async { Ok(1) }).await;

        assert_eq!(result.unwrap_err().code, Code::Unauthenticated);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ビジネスロジックのエラーは境界で変換される() {
        let sut: Pipeline<u32> = internal(Arc::new(LoggingHandler));

        let result = sut
            .call(context(), |_ctx| async {
                Err(DomainError::not_found("Configuration data not found.", "missing"))
            })
            .await;

        let status = result.unwrap_err();
        assert_eq!(status.code, Code::NotFound);
    }

    /// 境界より手前で内部エラーを返すハンドラ
    struct FailInternally;

    #[async_trait::async_trait]
    impl<R: Send + 'static> CallHandler<R> for FailInternally {
        async fn handle(&self, _ctx: CallContext, _next: Next<'_, R>) -> CallResult<R> {
            Err(DomainError::internal("Management service unavailable.")
                .with_cause(ErrorCause::new("connection refused"))
                .into())
        }
    }

    /// 記録されたイベントのレベルとフィールド名を収集するレイヤー
    struct LevelCapture {
        events: Arc<Mutex<Vec<(tracing::Level, Vec<&'static str>)>>>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LevelCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let fields = event.fields().map(|field| field.name()).collect();
            self.events
                .lock()
                .unwrap()
                .push((*event.metadata().level(), fields));
        }
    }

    #[tokio::test]
    async fn test_境界の手前の内部エラーはerrorレベルで原因チェーン付きで記録される() {
        use tracing_subscriber::layer::SubscriberExt as _;

        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(LevelCapture {
            events: events.clone(),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let sut: Pipeline<u32> = Pipeline::builder()
            .handler(Arc::new(FailInternally))
            .boundary(StatusTranslator::external());

        let result = sut.call(context(), |_ctx| async { Ok(1) }).await;

        assert_eq!(result.unwrap_err().code, Code::Internal);
        let events = events.lock().unwrap();
        let (_, fields) = events
            .iter()
            .find(|(level, _)| *level == tracing::Level::ERROR)
            .expect("内部エラーは ERROR レベルで記録されること");
        assert!(fields.contains(&"error.causes"));
        assert!(fields.contains(&"span_trace"));
    }
}
