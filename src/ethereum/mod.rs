pub mod abi;
pub mod backend;
pub mod cancel;
pub mod contract;
pub mod events;
pub mod poll;
pub mod provider;
pub mod utils;
pub mod values;

#[cfg(test)]
pub(crate) mod mock;

use alloy::{
    eips::BlockId,
    primitives::{Address, B256, U256},
    rpc::types::{Log, TransactionRequest},
};
use serde::{Deserialize, Serialize};

use cancel::CancelToken;

/// Options for read-only calls.
#[derive(Debug, Clone, Default)]
pub struct CallOpts {
    /// State to read against; latest when unset.
    pub block: Option<BlockId>,
    /// Sender override for permission-sensitive views.
    pub from: Option<Address>,
}

impl CallOpts {
    pub fn at_block(number: u64) -> Self {
        Self {
            block: Some(BlockId::number(number)),
            from: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            block: Some(BlockId::pending()),
            from: None,
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub(crate) fn block_id(&self) -> BlockId {
        self.block.unwrap_or_else(BlockId::latest)
    }
}

/// Options for state-mutating transactions.
///
/// Unset fee, gas and nonce fields are filled by the backend right before signing.
#[derive(Debug, Clone, Default)]
pub struct TransactOpts {
    /// Signer to use; the backend's default signer when unset.
    pub from: Option<Address>,
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    /// Legacy gas price. Takes precedence over the EIP-1559 fields.
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
    pub cancel: Option<CancelToken>,
}

impl TransactOpts {
    pub fn sender(from: Address) -> Self {
        Self {
            from: Some(from),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, mut request: TransactionRequest) -> TransactionRequest {
        request.from = self.from;
        request.value = self.value;
        request.gas = self.gas_limit;
        request.nonce = self.nonce;
        if self.gas_price.is_some() {
            request.gas_price = self.gas_price;
        } else {
            request.max_fee_per_gas = self.max_fee_per_gas;
            request.max_priority_fee_per_gas = self.max_priority_fee_per_gas;
        }
        request
    }
}

/// Options for historical log queries. The range is inclusive.
#[derive(Debug, Clone, Default)]
pub struct FilterOpts {
    pub from_block: u64,
    /// Latest block when unset.
    pub to_block: Option<u64>,
    pub cancel: Option<CancelToken>,
}

impl FilterOpts {
    pub fn range(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block: Some(to_block),
            cancel: None,
        }
    }
}

/// Options for live log subscriptions.
#[derive(Debug, Clone, Default)]
pub struct WatchOpts {
    /// Logs from this block up to the head are delivered before live logs.
    pub start_block: Option<u64>,
    pub cancel: Option<CancelToken>,
}

/// A broadcast transaction. Mining status is not tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub value: U256,
}

/// Backend-level log query: one address, up to four topic positions and a block range.
///
/// An empty topic set matches any value at that position; several values are OR'd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topics: [Vec<B256>; 4],
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl LogQuery {
    pub fn matches(&self, log: &Log) -> bool {
        if log.address() != self.address {
            return false;
        }

        if let Some(block) = log.block_number {
            if self.from_block.is_some_and(|from| block < from)
                || self.to_block.is_some_and(|to| block > to)
            {
                return false;
            }
        }

        let topics = log.topics();
        self.topics.iter().enumerate().all(|(i, wanted)| {
            wanted.is_empty() || topics.get(i).is_some_and(|topic| wanted.contains(topic))
        })
    }
}
