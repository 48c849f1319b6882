//! ShutdownSignal - 一度だけ立つ shutdown 通知
//!
//! # 学習ポイント
//! - `watch::channel(false)` による broadcast
//! - `send_if_modified` で二重 close を構造的に防ぐ

use tokio::sync::watch;

/// Owner side of the shutdown broadcast.
///
/// The watched value flips `false -> true` once and never back. Raising it a
/// second time is a no-op, so there is nothing to "double close".
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Raise the signal. Returns `true` only for the call that raised it.
    pub fn raise(&self) -> bool {
        self.tx.send_if_modified(|raised| {
            if *raised {
                false
            } else {
                *raised = true;
                true
            }
        })
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> Completion {
        Completion {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side: resolves once the engine has shut down.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<bool>,
}

impl Completion {
    /// Wait until the signal is raised. Returns immediately if it already was.
    pub async fn wait(&mut self) {
        // Err means the engine was dropped without raising; nothing left to wait for.
        let _ = self.rx.wait_for(|raised| *raised).await;
    }

    pub fn is_done(&self) -> bool {
        *self.rx.borrow()
    }
}
