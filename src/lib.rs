//! Typed client bindings for the Lido SimpleDVT staking module.
//!
//! [`SimpleDvtModule`] wraps one deployment and exposes every contract function and event
//! over pluggable backends. [`HttpBackend`] talks JSON-RPC over HTTP; anything implementing
//! the [`CallBackend`], [`TransactBackend`] or [`LogBackend`] traits can stand in for it.

pub mod config;
pub mod error;
pub mod ethereum;

pub use config::BindingConfig;
pub use error::{BindingError, Result};
pub use ethereum::{
    abi::{simple_dvt_abi, ContractDescriptor, ISimpleDVTModule, SimpleDvtEvent},
    backend::{CallBackend, LogBackend, LogSubscription, TransactBackend},
    cancel::{cancel_pair, CancelHandle, CancelToken},
    contract::SimpleDvtModule,
    events::{Event, EventIterator, IndexedFilter, WatchExit},
    poll::FilterSource,
    provider::HttpBackend,
    CallOpts, FilterOpts, LogQuery, TransactOpts, TxHandle, WatchOpts,
};
