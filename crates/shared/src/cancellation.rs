//! # 呼び出し単位のキャンセルシグナル
//!
//! RPC 呼び出しごとに生成され、パイプライン上のすべてのハンドラから観測できる
//! キャンセルシグナルを提供する。
//!
//! ## 仕組み
//!
//! `tokio::sync::watch` チャネルを用いる。
//!
//! - [`CancellationHandle`] がキャンセルを発火する側（トランスポート層）
//! - [`CancellationSignal`] が観測する側（ハンドラ、クライアント、リポジトリ）
//!
//! ハンドルが drop された場合もキャンセル扱いとする。
//! クライアント切断で呼び出しの Future ごと破棄されたケースがこれに該当する。
//!
//! ## 使用例
//!
//! ```
//! use fluxconfig_shared::cancellation;
//!
//! let (handle, signal) = cancellation::pair();
//! assert!(!signal.is_cancelled());
//!
//! handle.cancel();
//! assert!(signal.is_cancelled());
//! ```

use tokio::sync::watch;

/// キャンセルシグナルとハンドルの組を生成する
pub fn pair() -> (CancellationHandle, CancellationSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        CancellationHandle { sender },
        CancellationSignal {
            receiver: Some(receiver),
        },
    )
}

/// キャンセルを発火するハンドル
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationHandle {
    /// 関連するすべてのシグナルにキャンセルを通知する
    pub fn cancel(&self) {
        // 受信側が全て drop 済みでも問題ない
        self.sender.send_replace(true);
    }
}

/// キャンセルを観測するシグナル
///
/// `Clone` 可能で、各ハンドラが自由に複製して保持できる。
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    // None は「決してキャンセルされない」シグナル
    receiver: Option<watch::Receiver<bool>>,
}

impl CancellationSignal {
    /// 決してキャンセルされないシグナル
    ///
    /// テストや、キャンセル元を持たない内部呼び出しで使用する。
    pub fn never() -> Self {
        Self { receiver: None }
    }

    /// キャンセル済みかどうか
    pub fn is_cancelled(&self) -> bool {
        match &self.receiver {
            Some(receiver) => *receiver.borrow() || receiver.has_changed().is_err(),
            None => false,
        }
    }

    /// キャンセルされるまで待機する
    ///
    /// 既にキャンセル済みの場合は即座に完了する。
    /// [`never`](Self::never) で作成したシグナルでは永遠に完了しない。
    pub async fn cancelled(&self) {
        let Some(receiver) = &self.receiver else {
            std::future::pending::<()>().await;
            return;
        };

        let mut receiver = receiver.clone();
        // 送信側の drop（Err）もキャンセルとして扱う
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::never()
    }
}
