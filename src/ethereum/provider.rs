use alloy::{
    eips::BlockId,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, Log, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use anyhow::anyhow;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    backend::{CallBackend, LogBackend, LogSubscription, TransactBackend},
    cancel::{with_cancel, CancelToken},
    contract::SimpleDvtModule,
    poll::{self, FilterSource},
    utils, LogQuery, TxHandle,
};
use crate::config::{BindingConfig, GasConfig, NetworkConfig};
use crate::error::{BindingError, Result};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// JSON-RPC backend over HTTP with optional local signers.
pub struct HttpBackend {
    provider: RootProvider<Http<Client>>,
    wallet: Option<EthereumWallet>,
    signers: Vec<Address>,
    network: NetworkConfig,
    writes_enabled: bool,
    max_transaction_value: Option<U256>,
    poll_interval: Duration,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("rpc_url", &self.network.rpc_url)
            .field("chain_id", &self.network.chain_id)
            .field("signers", &self.signers)
            .field("writes_enabled", &self.writes_enabled)
            .finish()
    }
}

impl HttpBackend {
    /// Read-only backend for one network.
    pub fn new(network: NetworkConfig) -> anyhow::Result<Self> {
        let url = network
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network.rpc_url, e))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            wallet: None,
            signers: Vec::new(),
            network,
            writes_enabled: false,
            max_transaction_value: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Backend for `network` (or the default network) with the config's security settings.
    pub fn from_config(config: &BindingConfig, network: Option<&str>) -> anyhow::Result<Self> {
        let mut backend = Self::new(config.network(network)?.clone())?;
        backend.writes_enabled = config.security.allow_write_operations;
        backend.max_transaction_value = config.security.max_transaction_value()?;
        Ok(backend)
    }

    /// Register a signer. The first one registered is used when a transaction names no
    /// sender. Ignored while write operations are disabled.
    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        if !self.writes_enabled {
            warn!(
                "Write operations are disabled, not attaching signer {}",
                signer.address()
            );
            return self;
        }

        let address = signer.address();
        match self.wallet.as_mut() {
            Some(wallet) => wallet.register_signer(signer),
            None => self.wallet = Some(EthereumWallet::from(signer)),
        }
        self.signers.push(address);
        self
    }

    /// Parse a hex private key and register it as a signer.
    pub fn with_private_key(self, private_key: &str) -> anyhow::Result<Self> {
        let signer = utils::parse_private_key(private_key)?;
        Ok(self.with_signer(signer))
    }

    /// How long live subscriptions wait between `eth_getFilterChanges` polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn writes_enabled(&self) -> bool {
        self.writes_enabled
    }

    pub async fn check_connection(&self) -> bool {
        match self.provider.get_block_number().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Connection check failed for {}: {}", self.network.rpc_url, e);
                false
            }
        }
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(BindingError::rpc)
    }

    /// Bind the configured module deployment, or `address` when given.
    pub fn into_module(self, address: Option<&str>) -> anyhow::Result<SimpleDvtModule<Self>> {
        let address = match address {
            Some(address) => utils::validate_address(address)?,
            None => self.network.module_address,
        };
        Ok(SimpleDvtModule::at(address, Arc::new(self)))
    }

    fn check_request(&self, request: &TransactionRequest) -> Result<(&EthereumWallet, Address)> {
        if !self.writes_enabled {
            return Err(BindingError::submission(
                "write operations are disabled by configuration",
            ));
        }

        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| BindingError::signing("no signer configured"))?;

        let from = match request.from {
            Some(from) if self.signers.contains(&from) => from,
            Some(from) => {
                return Err(BindingError::Signing(format!("no signer for {}", from)));
            }
            None => self
                .signers
                .first()
                .copied()
                .ok_or_else(|| BindingError::signing("no signer configured"))?,
        };

        if let (Some(value), Some(max)) = (request.value, self.max_transaction_value) {
            if value > max {
                return Err(BindingError::Submission(format!(
                    "transaction value {} exceeds configured maximum {}",
                    value, max
                )));
            }
        }

        Ok((wallet, from))
    }

    async fn fill(&self, mut request: TransactionRequest, from: Address) -> Result<TransactionRequest> {
        request.from = Some(from);
        request.chain_id = Some(self.network.chain_id);

        if request.nonce.is_none() {
            let nonce = self
                .provider
                .get_transaction_count(from)
                .pending()
                .await
                .map_err(BindingError::rpc)?;
            request.nonce = Some(nonce);
        }

        if request.gas.is_none() {
            let gas = match self.provider.estimate_gas(&request).await {
                Ok(gas) => gas,
                Err(e) => {
                    warn!(
                        "Gas estimation failed, using default {}: {}",
                        self.network.gas.default_gas_limit, e
                    );
                    self.network.gas.default_gas_limit
                }
            };
            request.gas = Some(gas);
        }

        let estimate = if needs_fee_estimate(&request, &self.network.gas) {
            let estimate = self
                .provider
                .estimate_eip1559_fees(None)
                .await
                .map_err(BindingError::rpc)?;
            Some(FeeEstimate {
                max_fee_per_gas: estimate.max_fee_per_gas,
                max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
            })
        } else {
            None
        };
        fill_fees(&mut request, &self.network.gas, estimate)?;

        Ok(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

fn needs_fee_estimate(request: &TransactionRequest, gas: &GasConfig) -> bool {
    request.gas_price.is_none()
        && (request.max_fee_per_gas.is_none()
            || (request.max_priority_fee_per_gas.is_none() && gas.priority_fee.is_none()))
}

/// Complete the EIP-1559 fee fields. Caller-set fields are kept as given; a missing max fee
/// comes from the estimate capped at `max_gas_price`, a missing tip from `priority_fee` or
/// else the estimate, never above the max fee. Legacy requests are left untouched.
pub(crate) fn fill_fees(
    request: &mut TransactionRequest,
    gas: &GasConfig,
    estimate: Option<FeeEstimate>,
) -> Result<()> {
    if request.gas_price.is_some() {
        return Ok(());
    }

    let missing = || BindingError::rpc("no fee estimate available");
    let max_fee = match request.max_fee_per_gas {
        Some(max_fee) => max_fee,
        None => {
            let estimated = estimate.ok_or_else(missing)?.max_fee_per_gas;
            match gas.max_gas_price {
                Some(cap) => estimated.min(u128::from(cap)),
                None => estimated,
            }
        }
    };
    let priority = match request.max_priority_fee_per_gas {
        Some(priority) => priority,
        None => gas
            .priority_fee
            .map(u128::from)
            .or(estimate.map(|e| e.max_priority_fee_per_gas))
            .ok_or_else(missing)?
            .min(max_fee),
    };

    request.max_fee_per_gas = Some(max_fee);
    request.max_priority_fee_per_gas = Some(priority);
    Ok(())
}

/// Convert a backend log query into a JSON-RPC filter.
pub(crate) fn log_filter(query: &LogQuery) -> Filter {
    let [topic0, topic1, topic2, topic3] = query.topics.clone();
    let mut filter = Filter::new()
        .address(query.address)
        .event_signature(topic0)
        .topic1(topic1)
        .topic2(topic2)
        .topic3(topic3);

    if let Some(from) = query.from_block {
        filter = filter.from_block(from);
    }
    if let Some(to) = query.to_block {
        filter = filter.to_block(to);
    }
    filter
}

#[async_trait]
impl CallBackend for HttpBackend {
    async fn call(&self, request: TransactionRequest, block: BlockId) -> Result<Bytes> {
        self.provider
            .call(&request)
            .block(block)
            .await
            .map_err(BindingError::rpc)
    }
}

#[async_trait]
impl TransactBackend for HttpBackend {
    async fn send_transaction(
        &self,
        request: TransactionRequest,
        cancel: Option<&CancelToken>,
    ) -> Result<TxHandle> {
        let (wallet, from) = self.check_request(&request)?;
        let cancelled = || BindingError::submission("cancelled before broadcast");
        let request = with_cancel(cancel, self.fill(request, from), cancelled).await?;

        let handle = TxHandle {
            hash: Default::default(),
            from,
            to: request.to.and_then(|kind| kind.to().copied()),
            nonce: request.nonce.unwrap_or_default(),
            gas_limit: request.gas.unwrap_or_default(),
            value: request.value.unwrap_or_default(),
        };

        let envelope = with_cancel(
            cancel,
            async { request.build(wallet).await.map_err(BindingError::signing) },
            cancelled,
        )
        .await?;

        // Past this point the node may accept the transaction, so the broadcast is never raced.
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(cancelled());
        }
        let pending = self
            .provider
            .send_tx_envelope(envelope)
            .await
            .map_err(BindingError::submission)?;

        let hash = *pending.tx_hash();
        info!("Transaction sent with hash: {:?}", hash);
        Ok(TxHandle { hash, ..handle })
    }
}

#[async_trait]
impl LogBackend for HttpBackend {
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        debug!("eth_getLogs on {}", query.address);
        self.provider
            .get_logs(&log_filter(query))
            .await
            .map_err(BindingError::rpc)
    }

    async fn subscribe_logs(&self, query: &LogQuery) -> Result<LogSubscription> {
        poll::subscribe(Arc::new(self.provider.clone()), query, self.poll_interval).await
    }
}

#[async_trait]
impl FilterSource for RootProvider<Http<Client>> {
    async fn block_number(&self) -> Result<u64> {
        self.get_block_number().await.map_err(BindingError::rpc)
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        self.get_logs(&log_filter(query))
            .await
            .map_err(BindingError::rpc)
    }

    async fn install_filter(&self, query: &LogQuery) -> Result<U256> {
        self.new_filter(&log_filter(query))
            .await
            .map_err(BindingError::rpc)
    }

    async fn filter_changes(&self, id: U256) -> Result<Vec<Log>> {
        self.get_filter_changes::<Log>(id)
            .await
            .map_err(BindingError::rpc)
    }

    async fn uninstall_filter(&self, id: U256) -> Result<bool> {
        self.raw_request::<_, bool>("eth_uninstallFilter".into(), (id,))
            .await
            .map_err(BindingError::rpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::{cancel::cancel_pair, mock::MODULE};
    use alloy::primitives::B256;

    // Anvil's first development key.
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn config(writes: bool) -> BindingConfig {
        let mut config = BindingConfig::default();
        config.security.allow_write_operations = writes;
        config.security.max_transaction_value = Some("1000".to_string());
        config
    }

    fn request(value: u64) -> TransactionRequest {
        TransactionRequest::default()
            .to(MODULE)
            .value(U256::from(value))
    }

    #[tokio::test]
    async fn test_writes_disabled() {
        let backend = HttpBackend::from_config(&config(false), None)
            .unwrap()
            .with_private_key(KEY)
            .unwrap();
        assert!(backend.signers().is_empty());

        let err = backend.send_transaction(request(1), None).await.unwrap_err();
        assert!(matches!(err, BindingError::Submission(_)));
    }

    #[tokio::test]
    async fn test_missing_signer() {
        let backend = HttpBackend::from_config(&config(true), Some("holesky")).unwrap();
        let err = backend.send_transaction(request(1), None).await.unwrap_err();
        assert!(matches!(err, BindingError::Signing(_)));

        let backend = backend.with_private_key(KEY).unwrap();
        let mut unknown = request(1);
        unknown.from = Some(MODULE);
        let err = backend.send_transaction(unknown, None).await.unwrap_err();
        assert!(matches!(err, BindingError::Signing(_)));
    }

    #[tokio::test]
    async fn test_value_cap() {
        let backend = HttpBackend::from_config(&config(true), None)
            .unwrap()
            .with_private_key(KEY)
            .unwrap();
        let err = backend.send_transaction(request(1001), None).await.unwrap_err();
        assert!(matches!(err, BindingError::Submission(msg) if msg.contains("exceeds")));
    }

    #[tokio::test]
    async fn test_cancelled_before_fill() {
        let backend = HttpBackend::from_config(&config(true), None)
            .unwrap()
            .with_private_key(KEY)
            .unwrap();
        let (handle, token) = cancel_pair();
        handle.cancel();

        let err = backend
            .send_transaction(request(1), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::Submission(msg) if msg.contains("before broadcast")));
    }

    fn gas(max_gas_price: Option<u64>, priority_fee: Option<u64>) -> GasConfig {
        GasConfig {
            default_gas_limit: 500_000,
            max_gas_price,
            priority_fee,
        }
    }

    const ESTIMATE: FeeEstimate = FeeEstimate {
        max_fee_per_gas: 40,
        max_priority_fee_per_gas: 3,
    };

    #[test]
    fn test_fill_fees_keeps_caller_tip() {
        let gas = gas(Some(30), Some(2));
        let mut tx = request(0);
        tx.max_priority_fee_per_gas = Some(5);
        assert!(needs_fee_estimate(&tx, &gas));

        fill_fees(&mut tx, &gas, Some(ESTIMATE)).unwrap();
        assert_eq!(tx.max_fee_per_gas, Some(30));
        assert_eq!(tx.max_priority_fee_per_gas, Some(5));
    }

    #[test]
    fn test_fill_fees_tip_falls_back_to_estimate() {
        let gas = gas(None, None);
        let mut tx = request(0);
        tx.max_fee_per_gas = Some(2);
        assert!(needs_fee_estimate(&tx, &gas));

        fill_fees(&mut tx, &gas, Some(ESTIMATE)).unwrap();
        assert_eq!(tx.max_fee_per_gas, Some(2));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2));
    }

    #[test]
    fn test_fill_fees_without_estimate() {
        let gas = gas(Some(30), Some(2));
        let mut tx = request(0);
        tx.max_fee_per_gas = Some(20);
        assert!(!needs_fee_estimate(&tx, &gas));

        fill_fees(&mut tx, &gas, None).unwrap();
        assert_eq!(tx.max_fee_per_gas, Some(20));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2));

        let mut legacy = request(0);
        legacy.gas_price = Some(7);
        assert!(!needs_fee_estimate(&legacy, &gas));
        fill_fees(&mut legacy, &gas, None).unwrap();
        assert_eq!(legacy.max_fee_per_gas, None);
        assert_eq!(legacy.max_priority_fee_per_gas, None);
    }

    #[test]
    fn test_into_module() {
        let backend = HttpBackend::from_config(&config(false), Some("holesky")).unwrap();
        assert_eq!(backend.network().chain_id, 17000);

        let module = backend.into_module(None).unwrap();
        assert_eq!(module.address(), crate::config::HOLESKY_MODULE);

        let backend = HttpBackend::from_config(&config(false), None).unwrap();
        assert!(backend.into_module(Some("0x1234")).is_err());
    }

    #[test]
    fn test_invalid_rpc_url() {
        let mut network = BindingConfig::default().networks["mainnet"].clone();
        network.rpc_url = "not a url".to_string();
        assert!(HttpBackend::new(network).is_err());
    }

    #[test]
    fn test_log_filter() {
        let sig = B256::with_last_byte(0xaa);
        let id = B256::with_last_byte(7);
        let query = LogQuery {
            address: MODULE,
            topics: [vec![sig], vec![id], vec![], vec![]],
            from_block: Some(100),
            to_block: Some(200),
        };

        let filter = log_filter(&query);
        assert_eq!(filter.get_from_block(), Some(100));
        assert_eq!(filter.get_to_block(), Some(200));
        assert!(filter.address.matches(&MODULE));
        assert!(filter.topics[0].matches(&sig));
        assert!(filter.topics[1].matches(&id));
        assert!(!filter.topics[1].matches(&B256::with_last_byte(8)));
        assert!(filter.topics[2].is_empty());
    }
}
