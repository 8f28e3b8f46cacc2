use alloy::{
    eips::BlockId,
    primitives::Bytes,
    rpc::types::{Log, TransactionRequest},
};
use async_trait::async_trait;
use futures::{stream::BoxStream, Stream, StreamExt};
use std::fmt;

use super::{cancel::CancelToken, LogQuery, TxHandle};
use crate::error::Result;

/// Read-only access to contract state.
#[async_trait]
pub trait CallBackend: Send + Sync {
    /// Execute an `eth_call` against the given block and return the raw output.
    async fn call(&self, request: TransactionRequest, block: BlockId) -> Result<Bytes>;
}

/// Write access: sign and broadcast transactions.
#[async_trait]
pub trait TransactBackend: Send + Sync {
    /// Fill, sign and broadcast `request`, returning once the node has accepted it.
    ///
    /// `cancel` is honoured up to the broadcast. Once the transaction has been handed to the
    /// node the call runs to completion.
    async fn send_transaction(
        &self,
        request: TransactionRequest,
        cancel: Option<&CancelToken>,
    ) -> Result<TxHandle>;
}

/// Access to emitted logs.
#[async_trait]
pub trait LogBackend: Send + Sync {
    /// All logs matching `query`, in the order the node reports them.
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>>;

    /// A live stream of new logs matching `query`.
    async fn subscribe_logs(&self, query: &LogQuery) -> Result<LogSubscription>;
}

type Unsubscribe = Box<dyn FnOnce() + Send>;

/// A live log stream with an idempotent `close`.
///
/// Closing drops the underlying stream and runs the unsubscribe hook at most once. Dropping
/// the subscription closes it.
pub struct LogSubscription {
    stream: Option<BoxStream<'static, Result<Log>>>,
    unsubscribe: Option<Unsubscribe>,
}

impl LogSubscription {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Log>> + Send + 'static,
    {
        Self {
            stream: Some(stream.boxed()),
            unsubscribe: None,
        }
    }

    /// Register a hook that runs when the subscription is closed.
    pub fn with_unsubscribe(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.unsubscribe = Some(Box::new(hook));
        self
    }

    /// The next item, or `None` once the stream ended or the subscription was closed.
    pub async fn next(&mut self) -> Option<Result<Log>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    pub fn close(&mut self) {
        self.stream = None;
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSubscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
