use std::future::Future;
use tokio::sync::watch;

use crate::error::{BindingError, Result};

/// Caller side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Cloneable token handed to operations through their options.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle cancels. Never resolves if the handle is dropped first.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub(crate) async fn wait_cancelled(cancel: Option<&CancelToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

/// Race `fut` against the optional token, mapping a cancellation to `on_cancel()`.
pub(crate) async fn with_cancel<F, T>(
    cancel: Option<&CancelToken>,
    fut: F,
    on_cancel: impl FnOnce() -> BindingError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(on_cancel());
    }

    tokio::select! {
        result = fut => result,
        _ = wait_cancelled(cancel) => Err(on_cancel()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_resolves_waiters() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
        assert!(handle.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_with_cancel_short_circuits() {
        let (handle, token) = cancel_pair();
        handle.cancel();

        let result: Result<u32> = with_cancel(
            Some(&token),
            std::future::pending(),
            || BindingError::rpc("cancelled"),
        )
        .await;
        assert_eq!(result, Err(BindingError::rpc("cancelled")));
    }

    #[tokio::test]
    async fn test_with_cancel_without_token_runs_future() {
        let result = with_cancel(None, async { Ok(7u32) }, || BindingError::rpc("cancelled")).await;
        assert_eq!(result, Ok(7));
    }
}
