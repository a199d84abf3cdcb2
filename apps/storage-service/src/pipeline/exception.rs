//! # 例外境界
//!
//! 後続（ビジネスロジック）全体を 1 つの回復境界で包み、
//! 発生したドメインエラーを変換器で一度だけステータスに変換する。
//!
//! 境界はキャンセルシグナルも監視し、キャンセルされた呼び出しは
//! 後続を破棄して [`CallError::Cancelled`] として返す。

use async_trait::async_trait;
use fluxconfig_domain::{DomainError, DomainErrorKind};
use itertools::Itertools;

use super::{CallContext, CallError, CallHandler, CallResult, Next};
use crate::translator::StatusTranslator;

pub struct ExceptionHandler {
    translator: StatusTranslator,
}

impl ExceptionHandler {
    pub fn new(translator: StatusTranslator) -> Self {
        Self { translator }
    }
}

#[async_trait]
impl<R: Send + 'static> CallHandler<R> for ExceptionHandler {
    async fn handle(&self, ctx: CallContext, next: Next<'_, R>) -> CallResult<R> {
        let method = ctx.method().to_string();
        let cancellation = ctx.cancellation().clone();

        let result = tokio::select! {
            biased;
            () = cancellation.cancelled() => return Err(CallError::Cancelled),
            result = next.run(ctx) => result,
        };

        match result {
            Err(CallError::Domain(_)) if cancellation.is_cancelled() => Err(CallError::Cancelled),
            Err(CallError::Domain(error)) => {
                log_failure(&error, &method);
                Err(CallError::Status(self.translator.translate(&error, &method)))
            }
            other => other,
        }
    }
}

/// 失敗を重大度に応じたレベルで記録する
///
/// 内部エラーは原因チェーンとスパントレース付きで `error` レベルに出す。
pub(super) fn log_failure(error: &DomainError, method: &str) {
    let causes = error.causes().iter().map(|cause| cause.message()).join(" <- ");

    match error.kind() {
        DomainErrorKind::Internal => tracing::error!(
            rpc.method = %method,
            error.kind = error.kind_name(),
            error.causes = %causes,
            span_trace = %error.span_trace(),
            "RPC 呼び出しで予期しないエラーが発生: {}",
            error
        ),
        DomainErrorKind::Validation { .. } | DomainErrorKind::NotFound { .. } => tracing::info!(
            rpc.method = %method,
            error.kind = error.kind_name(),
            "RPC 呼び出しが失敗: {}",
            error
        ),
        DomainErrorKind::AlreadyExists { .. }
        | DomainErrorKind::Unauthenticated
        | DomainErrorKind::Unimplemented => tracing::warn!(
            rpc.method = %method,
            error.kind = error.kind_name(),
            error.causes = %causes,
            "RPC 呼び出しが失敗: {}",
            error
        ),
    }
}
