use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::Log,
    sol_types::{SolEvent, SolEventInterface, TopicList},
};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    abi::SimpleDvtEvent,
    backend::LogSubscription,
    cancel::{wait_cancelled, CancelToken},
    LogQuery,
};
use crate::error::{BindingError, Result};

/// A decoded event together with the log it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    pub data: T,
    pub raw: Log,
}

/// Converts a value into the 32-byte word stored in a log topic.
pub trait IntoTopic {
    fn into_topic(self) -> B256;
}

impl IntoTopic for B256 {
    fn into_topic(self) -> B256 {
        self
    }
}

impl IntoTopic for U256 {
    fn into_topic(self) -> B256 {
        B256::from(self.to_be_bytes::<32>())
    }
}

impl IntoTopic for u64 {
    fn into_topic(self) -> B256 {
        U256::from(self).into_topic()
    }
}

impl IntoTopic for Address {
    fn into_topic(self) -> B256 {
        self.into_word()
    }
}

/// Candidate values for an event's indexed parameters, in declaration order.
///
/// Values within one position are OR'd, positions are AND'd, and an empty position is a
/// wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedFilter {
    positions: Vec<Vec<B256>>,
}

impl IndexedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain the next indexed parameter to `values`.
    pub fn and<T, I>(mut self, values: I) -> Self
    where
        T: IntoTopic,
        I: IntoIterator<Item = T>,
    {
        self.positions
            .push(values.into_iter().map(IntoTopic::into_topic).collect());
        self
    }

    /// Leave the next indexed parameter unconstrained.
    pub fn any(mut self) -> Self {
        self.positions.push(Vec::new());
        self
    }

    /// Build the backend query for event `E` at `address`.
    pub fn query<E: SolEvent>(
        &self,
        address: Address,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<LogQuery> {
        let indexed = indexed_count::<E>();
        if self.positions.len() > indexed {
            return Err(BindingError::Encoding(format!(
                "{} has {} indexed parameters, got predicates for {}",
                E::SIGNATURE,
                indexed,
                self.positions.len()
            )));
        }

        let mut query = LogQuery {
            address,
            from_block,
            to_block,
            ..Default::default()
        };
        query.topics[0] = vec![E::SIGNATURE_HASH];
        for (i, values) in self.positions.iter().enumerate() {
            query.topics[i + 1] = values.clone();
        }
        Ok(query)
    }
}

fn indexed_count<E: SolEvent>() -> usize {
    let topics = <E::TopicList as TopicList>::COUNT;
    if E::ANONYMOUS {
        topics
    } else {
        topics - 1
    }
}

/// Decode one raw log as event `E`. Performs no I/O.
pub fn parse_log<E: SolEvent>(log: &Log) -> Result<Event<E>> {
    let topics = log.topics();
    let expected = <E::TopicList as TopicList>::COUNT;
    if topics.len() != expected {
        return Err(BindingError::Decoding(format!(
            "{} expects {} topics, log has {}",
            E::SIGNATURE,
            expected,
            topics.len()
        )));
    }

    if !E::ANONYMOUS && topics[0] != E::SIGNATURE_HASH {
        return Err(BindingError::Decoding(format!(
            "log topic {} is not the {} signature",
            topics[0],
            E::SIGNATURE
        )));
    }

    let data = E::decode_raw_log(topics.iter().copied(), &log.data().data, true)
        .map_err(|e| BindingError::Decoding(format!("{}: {}", E::SIGNATURE, e)))?;

    Ok(Event {
        data,
        raw: log.clone(),
    })
}

/// Decode one raw log as whichever module event it carries.
pub fn parse_any_log(log: &Log) -> Result<Event<SimpleDvtEvent>> {
    let data = SimpleDvtEvent::decode_raw_log(log.topics(), &log.data().data, true)
        .map_err(BindingError::decoding)?;

    Ok(Event {
        data,
        raw: log.clone(),
    })
}

/// Cursor over a bounded set of fetched logs, decoding one per `advance`.
///
/// The first decode failure is sticky: the error is kept and `advance` returns false from
/// then on.
#[derive(Debug)]
pub struct EventIterator<E> {
    pending: VecDeque<Log>,
    current: Option<Event<E>>,
    error: Option<BindingError>,
    error_taken: bool,
    done: bool,
}

impl<E: SolEvent> EventIterator<E> {
    pub(crate) fn new(mut logs: Vec<Log>) -> Self {
        logs.sort_by_key(|log| {
            (
                log.block_number.unwrap_or_default(),
                log.log_index.unwrap_or_default(),
            )
        });

        Self {
            pending: logs.into(),
            current: None,
            error: None,
            error_taken: false,
            done: false,
        }
    }

    /// Decode the next log. Returns false when exhausted, closed or failed.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }

        let Some(log) = self.pending.pop_front() else {
            self.current = None;
            self.done = true;
            return false;
        };

        match parse_log::<E>(&log) {
            Ok(event) => {
                self.current = Some(event);
                true
            }
            Err(e) => {
                warn!("Stopping event iteration: {}", e);
                self.current = None;
                self.error = Some(e);
                self.done = true;
                false
            }
        }
    }

    /// The event decoded by the last successful `advance`.
    pub fn event(&self) -> Option<&Event<E>> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&BindingError> {
        self.error.as_ref()
    }

    /// Logs fetched but not yet decoded.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Release the fetched logs. Safe to call any number of times.
    pub fn close(&mut self) {
        self.pending.clear();
        self.current = None;
        self.done = true;
    }
}

impl<E: SolEvent> Iterator for EventIterator<E> {
    type Item = Result<Event<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.current.take().map(Ok);
        }

        match &self.error {
            Some(e) if !self.error_taken => {
                self.error_taken = true;
                Some(Err(e.clone()))
            }
            _ => None,
        }
    }
}

/// How a watch ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The caller cancelled or dropped the receiving end of the sink.
    Cancelled,
    /// The transport ended the stream.
    Completed,
}

enum Step {
    Cancelled,
    Next(Option<Result<Log>>),
}

/// Forward decoded `E` events from `subscription` into `sink` until cancelled, failed or
/// completed. The subscription is closed on every exit path.
pub async fn run_watch<E: SolEvent>(
    mut subscription: LogSubscription,
    sink: mpsc::Sender<Event<E>>,
    cancel: Option<CancelToken>,
) -> Result<WatchExit> {
    info!("Watching {} logs", E::SIGNATURE);
    let cancel = cancel.as_ref();

    let outcome = loop {
        let step = tokio::select! {
            _ = wait_cancelled(cancel) => Step::Cancelled,
            next = subscription.next() => Step::Next(next),
        };

        let log = match step {
            Step::Cancelled => break Ok(WatchExit::Cancelled),
            Step::Next(None) => break Ok(WatchExit::Completed),
            Step::Next(Some(Err(e))) => break Err(e),
            Step::Next(Some(Ok(log))) => log,
        };

        let event = match parse_log::<E>(&log) {
            Ok(event) => event,
            Err(e) => break Err(e),
        };

        let delivered = tokio::select! {
            _ = wait_cancelled(cancel) => false,
            sent = sink.send(event) => sent.is_ok(),
        };
        if !delivered {
            break Ok(WatchExit::Cancelled);
        }
    };

    subscription.close();
    match &outcome {
        Ok(exit) => info!("Stopped watching {} logs: {:?}", E::SIGNATURE, exit),
        Err(e) => debug!("Watch on {} logs failed: {}", E::SIGNATURE, e),
    }
    outcome
}
