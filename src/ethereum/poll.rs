//! Live log subscriptions driven by `eth_newFilter` / `eth_getFilterChanges` polling.
//!
//! The stream only polls the node when the consumer asks for the next log, so a slow sink
//! slows polling down instead of losing batches. Poll failures are yielded into the stream
//! and end it.

use alloy::{primitives::U256, rpc::types::Log};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{backend::LogSubscription, LogQuery};
use crate::error::Result;

/// Node operations a polled log subscription needs.
#[async_trait]
pub trait FilterSource: Send + Sync + 'static {
    async fn block_number(&self) -> Result<u64>;

    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>>;

    async fn install_filter(&self, query: &LogQuery) -> Result<U256>;

    async fn filter_changes(&self, id: U256) -> Result<Vec<Log>>;

    async fn uninstall_filter(&self, id: U256) -> Result<bool>;
}

struct PollState<S> {
    source: Arc<S>,
    filter_id: U256,
    pending: VecDeque<Log>,
    /// Live logs at or below this block were already covered by the replay.
    skip_through: Option<u64>,
    interval: Duration,
    failed: bool,
}

/// Open a polled subscription for `query`.
///
/// When `query.from_block` is set, the logs from that block up to the current head are
/// emitted first, in (block, log index) order, before live logs from `head + 1` onwards.
pub async fn subscribe<S: FilterSource>(
    source: Arc<S>,
    query: &LogQuery,
    interval: Duration,
) -> Result<LogSubscription> {
    let live = LogQuery {
        from_block: None,
        to_block: None,
        ..query.clone()
    };
    // Installed before the replay so nothing between the head and the filter is missed.
    let filter_id = source.install_filter(&live).await?;
    debug!("Installed log filter {} for {}", filter_id, query.address);

    let (pending, skip_through) = match query.from_block {
        Some(from) => match replay(&*source, query, from).await {
            Ok(replayed) => replayed,
            Err(e) => {
                if let Err(uninstall) = source.uninstall_filter(filter_id).await {
                    debug!("Failed to uninstall log filter {}: {}", filter_id, uninstall);
                }
                return Err(e);
            }
        },
        None => (VecDeque::new(), None),
    };

    let state = PollState {
        source: source.clone(),
        filter_id,
        pending,
        skip_through,
        interval,
        failed: false,
    };
    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(log) = state.pending.pop_front() {
                return Some((Ok(log), state));
            }
            if state.failed {
                return None;
            }

            tokio::time::sleep(state.interval).await;
            match state.source.filter_changes(state.filter_id).await {
                Ok(mut logs) => {
                    if let Some(skip) = state.skip_through {
                        logs.retain(|log| log.block_number.map_or(true, |block| block > skip));
                    }
                    state.pending.extend(logs);
                }
                Err(e) => {
                    state.failed = true;
                    return Some((Err(e), state));
                }
            }
        }
    });

    Ok(LogSubscription::new(stream).with_unsubscribe(move || uninstall(source, filter_id)))
}

async fn replay<S: FilterSource>(
    source: &S,
    query: &LogQuery,
    from: u64,
) -> Result<(VecDeque<Log>, Option<u64>)> {
    let head = source.block_number().await?;
    if from > head {
        return Ok((VecDeque::new(), Some(from - 1)));
    }

    let backlog = LogQuery {
        from_block: Some(from),
        to_block: Some(head),
        ..query.clone()
    };
    let mut logs = source.logs(&backlog).await?;
    logs.sort_by_key(|log| {
        (
            log.block_number.unwrap_or_default(),
            log.log_index.unwrap_or_default(),
        )
    });

    info!("Replaying {} logs from block {} to {}", logs.len(), from, head);
    Ok((logs.into(), Some(head)))
}

fn uninstall<S: FilterSource>(source: Arc<S>, filter_id: U256) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!("No runtime to uninstall log filter {}", filter_id);
        return;
    };

    handle.spawn(async move {
        match source.uninstall_filter(filter_id).await {
            Ok(_) => debug!("Uninstalled log filter {}", filter_id),
            Err(e) => debug!("Failed to uninstall log filter {}: {}", filter_id, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::{
        abi::ISimpleDVTModule::NodeOperatorActiveSet,
        events::run_watch,
        mock::{rpc_log, MODULE},
    };
    use crate::error::BindingError;
    use alloy::sol_types::SolEvent;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use tokio::sync::mpsc;

    fn active_set(id: u64, block: u64, index: u64) -> Log {
        let event = NodeOperatorActiveSet {
            nodeOperatorId: U256::from(id),
            active: true,
        };
        rpc_log(event.encode_log_data(), block, index)
    }

    fn ids(logs: &[Log]) -> Vec<u64> {
        logs.iter()
            .map(|log| U256::from_be_bytes(log.topics()[1].0).to::<u64>())
            .collect()
    }

    #[derive(Default)]
    struct ScriptedNode {
        head: u64,
        history: Vec<Log>,
        changes: Mutex<VecDeque<Result<Vec<Log>>>>,
        backlog_queries: Mutex<Vec<LogQuery>>,
        polls: AtomicUsize,
        uninstalls: AtomicUsize,
    }

    impl ScriptedNode {
        fn with_changes(mut self, changes: Vec<Result<Vec<Log>>>) -> Self {
            self.changes = Mutex::new(changes.into());
            self
        }
    }

    #[async_trait]
    impl FilterSource for ScriptedNode {
        async fn block_number(&self) -> Result<u64> {
            Ok(self.head)
        }

        async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
            self.backlog_queries.lock().unwrap().push(query.clone());
            Ok(self
                .history
                .iter()
                .filter(|log| query.matches(log))
                .cloned()
                .collect())
        }

        async fn install_filter(&self, _query: &LogQuery) -> Result<U256> {
            Ok(U256::from(0x42))
        }

        async fn filter_changes(&self, id: U256) -> Result<Vec<Log>> {
            assert_eq!(id, U256::from(0x42));
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.changes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn uninstall_filter(&self, _id: U256) -> Result<bool> {
            self.uninstalls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn query(from_block: Option<u64>) -> LogQuery {
        LogQuery {
            address: MODULE,
            from_block,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_replays_from_start_block_then_follows_live() {
        let node = Arc::new(
            ScriptedNode {
                head: 10,
                history: vec![active_set(5, 8, 1), active_set(3, 4, 0), active_set(4, 8, 0)],
                ..Default::default()
            }
            .with_changes(vec![
                // Block 10 was replayed already.
                Ok(vec![active_set(9, 10, 0), active_set(11, 11, 0)]),
                Ok(vec![active_set(12, 12, 3)]),
            ]),
        );

        let mut subscription = subscribe(node.clone(), &query(Some(4)), Duration::ZERO)
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(subscription.next().await.unwrap().unwrap());
        }
        assert_eq!(ids(&seen), vec![3, 4, 5, 11, 12]);

        let backlog = &node.backlog_queries.lock().unwrap()[0];
        assert_eq!((backlog.from_block, backlog.to_block), (Some(4), Some(10)));
        assert_eq!(node.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_polls_only_on_demand() {
        let node = Arc::new(ScriptedNode::default().with_changes(vec![Ok(vec![
            active_set(1, 1, 0),
            active_set(2, 1, 1),
        ])]));

        let mut subscription = subscribe(node.clone(), &query(None), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(node.polls.load(Ordering::SeqCst), 0);

        subscription.next().await.unwrap().unwrap();
        subscription.next().await.unwrap().unwrap();
        assert_eq!(node.polls.load(Ordering::SeqCst), 1);
        assert!(node.backlog_queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_error_ends_stream() {
        let node = Arc::new(ScriptedNode::default().with_changes(vec![
            Ok(vec![active_set(1, 1, 0)]),
            Err(BindingError::rpc("filter not found")),
        ]));

        let mut subscription = subscribe(node, &query(None), Duration::ZERO)
            .await
            .unwrap();
        assert!(subscription.next().await.unwrap().is_ok());
        assert_eq!(
            subscription.next().await.unwrap(),
            Err(BindingError::rpc("filter not found"))
        );
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_fails_on_poll_error() {
        let node = Arc::new(ScriptedNode::default().with_changes(vec![
            Ok(vec![active_set(7, 1, 0)]),
            Err(BindingError::rpc("connection reset")),
        ]));
        let subscription = subscribe(node.clone(), &query(None), Duration::ZERO)
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let result = run_watch::<NodeOperatorActiveSet>(subscription, tx, None).await;
        assert_eq!(result, Err(BindingError::rpc("connection reset")));
        assert_eq!(rx.recv().await.unwrap().data.nodeOperatorId, U256::from(7));

        for _ in 0..10 {
            if node.uninstalls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(node.uninstalls.load(Ordering::SeqCst), 1);
    }
}
