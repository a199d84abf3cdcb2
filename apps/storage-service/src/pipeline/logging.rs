//! # ロギングハンドラ
//!
//! 呼び出されたメソッド名と受信メタデータをすべて記録してから後続へ渡す。
//! 成功・失敗のどちらにも干渉しない。

use async_trait::async_trait;

use super::{CallContext, CallHandler, CallResult, Metadata, Next};

pub struct LoggingHandler;

#[async_trait]
impl<R: Send + 'static> CallHandler<R> for LoggingHandler {
    async fn handle(&self, ctx: CallContext, next: Next<'_, R>) -> CallResult<R> {
        tracing::info!(
            rpc.method = %ctx.method(),
            response_type = std::any::type_name::<R>(),
            ">>Executing call. Method: {}",
            ctx.method()
        );
        tracing::info!(
            rpc.method = %ctx.method(),
            headers = %render_headers(ctx.metadata()),
            "受信メタデータ"
        );

        next.run(ctx).await
    }
}

/// メタデータを 1 エントリ 1 行の文字列にする
///
/// ```text
/// Passed headers:
/// >>header: x-api-key, value: ...
/// >>header: x-cfg-key, value: ...
/// ```
pub fn render_headers(metadata: &Metadata) -> String {
    metadata.iter().fold(
        String::from("Passed headers:\n"),
        |mut rendered, (key, value)| {
            rendered.push_str(&format!(">>header: {key}, value: {value}\n"));
            rendered
        },
    )
}
