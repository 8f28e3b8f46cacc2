//! In-memory backend used by the unit tests.

use alloy::{
    eips::BlockId,
    primitives::{address, Address, Bytes, LogData, B256, U256},
    rpc::types::{Log, TransactionRequest},
};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::{mpsc, Notify};

use super::{
    backend::{CallBackend, LogBackend, LogSubscription, TransactBackend},
    cancel::CancelToken,
    LogQuery, TxHandle,
};
use crate::error::{BindingError, Result};

pub(crate) const MODULE: Address = address!("aE7B191A31f627b4eB1d4DaC64eab9976995b433");

pub(crate) fn rpc_log(data: LogData, block: u64, index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: MODULE,
            data,
        },
        block_number: Some(block),
        log_index: Some(index),
        transaction_hash: Some(B256::with_last_byte(block as u8)),
        ..Default::default()
    }
}

#[derive(Default)]
pub(crate) struct MockBackend {
    /// Return data keyed by function selector.
    pub returns: Mutex<HashMap<[u8; 4], Bytes>>,
    pub call_error: Mutex<Option<BindingError>>,
    pub calls: Mutex<Vec<(TransactionRequest, BlockId)>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub send_error: Mutex<Option<BindingError>>,
    pub logs: Mutex<Vec<Log>>,
    pub queries: Mutex<Vec<LogQuery>>,
    pub live: Mutex<Option<mpsc::UnboundedReceiver<Result<Log>>>>,
    pub unsubscribes: Arc<AtomicUsize>,
    /// Notified when a send reaches the broadcast.
    pub broadcast_started: Arc<Notify>,
    broadcast_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(self, selector: [u8; 4], data: impl Into<Bytes>) -> Self {
        self.returns.lock().unwrap().insert(selector, data.into());
        self
    }

    pub fn with_logs(self, logs: Vec<Log>) -> Self {
        *self.logs.lock().unwrap() = logs;
        self
    }

    /// Install a live feed and return its sending half.
    pub fn live_feed(&self) -> mpsc::UnboundedSender<Result<Log>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.live.lock().unwrap() = Some(rx);
        tx
    }

    /// Hold every broadcast until the returned gate is notified.
    pub fn hold_broadcast(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.broadcast_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallBackend for MockBackend {
    async fn call(&self, request: TransactionRequest, block: BlockId) -> Result<Bytes> {
        if let Some(err) = self.call_error.lock().unwrap().clone() {
            return Err(err);
        }

        let input = request.input.input().cloned().unwrap_or_default();
        self.calls.lock().unwrap().push((request, block));

        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| BindingError::rpc("missing selector"))?;

        Ok(self
            .returns
            .lock()
            .unwrap()
            .get(&selector)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TransactBackend for MockBackend {
    async fn send_transaction(
        &self,
        request: TransactionRequest,
        cancel: Option<&CancelToken>,
    ) -> Result<TxHandle> {
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(BindingError::submission("cancelled before broadcast"));
        }

        let gate = self.broadcast_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.broadcast_started.notify_one();
            gate.notified().await;
        }

        let mut sent = self.sent.lock().unwrap();
        let handle = TxHandle {
            hash: B256::with_last_byte(sent.len() as u8 + 1),
            from: request.from.unwrap_or_default(),
            to: request.to.and_then(|kind| kind.to().copied()),
            nonce: request.nonce.unwrap_or(sent.len() as u64),
            gas_limit: request.gas.unwrap_or(21_000),
            value: request.value.unwrap_or(U256::ZERO),
        };
        sent.push(request);
        Ok(handle)
    }
}

#[async_trait]
impl LogBackend for MockBackend {
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| query.matches(log))
            .cloned()
            .collect())
    }

    async fn subscribe_logs(&self, query: &LogQuery) -> Result<LogSubscription> {
        self.queries.lock().unwrap().push(query.clone());
        let rx = self
            .live
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BindingError::rpc("no live feed installed"))?;

        let query = query.clone();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .filter(move |item| {
            let keep = match item {
                Ok(log) => query.matches(log),
                Err(_) => true,
            };
            futures::future::ready(keep)
        });

        let unsubscribes = self.unsubscribes.clone();
        Ok(LogSubscription::new(stream).with_unsubscribe(move || {
            unsubscribes.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
