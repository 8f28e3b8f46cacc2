use alloy::{
    dyn_abi::{DecodedEvent, DynSolValue, EventExt, FunctionExt, JsonAbiExt},
    json_abi::Function,
    primitives::{Address, Bytes, B256, U256},
    rpc::types::{Log, TransactionRequest},
    sol_types::{SolCall, SolEvent},
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    abi::{ContractDescriptor, ISimpleDVTModule, SimpleDvtEvent},
    backend::{CallBackend, LogBackend, TransactBackend},
    cancel::with_cancel,
    events::{self, Event, EventIterator, IndexedFilter, WatchExit},
    utils, values, CallOpts, FilterOpts, TransactOpts, TxHandle, WatchOpts,
};
use crate::error::{BindingError, Result};

/// Typed handle to one SimpleDVT module deployment.
///
/// Which operations are available depends on the backend: reads need a [`CallBackend`],
/// transactions a [`TransactBackend`] and event queries a [`LogBackend`].
pub struct SimpleDvtModule<B> {
    descriptor: ContractDescriptor,
    backend: Arc<B>,
}

impl<B> Clone for SimpleDvtModule<B> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<B> fmt::Debug for SimpleDvtModule<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SimpleDvtModule")
            .field(&self.descriptor.address())
            .finish()
    }
}

impl<B> SimpleDvtModule<B> {
    pub fn new(descriptor: ContractDescriptor, backend: Arc<B>) -> Self {
        Self {
            descriptor,
            backend,
        }
    }

    /// Bind the built-in SimpleDVT interface at `address`.
    pub fn at(address: Address, backend: Arc<B>) -> Self {
        Self::new(ContractDescriptor::simple_dvt(address), backend)
    }

    pub fn address(&self) -> Address {
        self.descriptor.address()
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Decode one raw log as event `E`.
    pub fn parse<E: SolEvent>(&self, log: &Log) -> Result<Event<E>> {
        events::parse_log(log)
    }

    /// Decode one raw log as whichever module event it carries.
    pub fn decode_log(&self, log: &Log) -> Result<Event<SimpleDvtEvent>> {
        events::parse_any_log(log)
    }

    /// Decode one raw log against the descriptor's ABI by event name or signature.
    pub fn decode_log_by_name(&self, event: &str, log: &Log) -> Result<DecodedEvent> {
        let event = self.descriptor.event(event)?;
        event
            .decode_log_parts(log.topics().iter().copied(), &log.data().data, true)
            .map_err(|e| BindingError::Decoding(format!("{}: {}", event.signature(), e)))
    }

    fn request(&self, input: Bytes) -> TransactionRequest {
        TransactionRequest::default()
            .to(self.address())
            .input(input.into())
    }

    fn resolve(&self, name: &str) -> Result<&Function> {
        if !name.contains('(') {
            utils::validate_function_name(name).map_err(BindingError::encoding)?;
        }
        self.descriptor.function(name)
    }
}

fn encode_function_call(function: &Function, args: &[DynSolValue]) -> Result<Bytes> {
    if args.len() != function.inputs.len() {
        return Err(BindingError::Encoding(format!(
            "Parameter count mismatch for function '{}': expected {} parameters, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        )));
    }

    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| BindingError::Encoding(format!("{}: {}", function.signature(), e)))
}

fn decode_function_result(function: &Function, data: &Bytes) -> Result<Vec<DynSolValue>> {
    if function.outputs.is_empty() {
        return Ok(Vec::new());
    }

    function
        .abi_decode_output(data, true)
        .map_err(|e| BindingError::Decoding(format!("{}: {}", function.signature(), e)))
}

impl<B: CallBackend> SimpleDvtModule<B> {
    /// Execute a typed read-only call and decode its return values.
    ///
    /// Any function can be called this way, including state-mutating ones, which yields a
    /// simulation of the transaction against the selected block.
    pub async fn call<C: SolCall>(&self, opts: &CallOpts, call: C) -> Result<C::Return> {
        let data = self
            .call_raw(opts, call.abi_encode().into(), C::SIGNATURE)
            .await?;
        C::abi_decode_returns(&data, true)
            .map_err(|e| BindingError::Decoding(format!("{}: {}", C::SIGNATURE, e)))
    }

    /// Call a function by name or full signature with dynamically typed arguments.
    pub async fn call_by_name(
        &self,
        opts: &CallOpts,
        name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let function = self.resolve(name)?;
        let input = encode_function_call(function, args)?;
        let data = self.call_raw(opts, input, name).await?;
        decode_function_result(function, &data)
    }

    /// Call a function with JSON parameters (positional array or named object) and return
    /// the outputs as JSON.
    pub async fn call_json(&self, opts: &CallOpts, name: &str, parameters: &Value) -> Result<Value> {
        let function = self.resolve(name)?;
        let args = values::json_to_args(function, parameters)?;
        let outputs = self.call_by_name(opts, name, &args).await?;
        values::values_to_json(&outputs)
    }

    async fn call_raw(&self, opts: &CallOpts, input: Bytes, name: &str) -> Result<Bytes> {
        let mut request = self.request(input);
        request.from = opts.from;
        let block = opts.block_id();

        debug!("Calling {} on {} at {:?}", name, self.address(), block);
        self.backend.call(request, block).await
    }
}

impl<B: TransactBackend> SimpleDvtModule<B> {
    /// Submit a typed state-mutating call. Returns once the node accepted the transaction;
    /// the function's outputs are not available from the handle.
    pub async fn transact<C: SolCall>(&self, opts: &TransactOpts, call: C) -> Result<TxHandle> {
        self.transact_raw(opts, call.abi_encode().into(), C::SIGNATURE)
            .await
    }

    /// Submit a transaction for a function given by name or full signature.
    pub async fn transact_by_name(
        &self,
        opts: &TransactOpts,
        name: &str,
        args: &[DynSolValue],
    ) -> Result<TxHandle> {
        let function = self.resolve(name)?;
        let input = encode_function_call(function, args)?;
        self.transact_raw(opts, input, name).await
    }

    /// Submit a transaction with JSON parameters.
    pub async fn transact_json(
        &self,
        opts: &TransactOpts,
        name: &str,
        parameters: &Value,
    ) -> Result<TxHandle> {
        let function = self.resolve(name)?;
        let args = values::json_to_args(function, parameters)?;
        let input = encode_function_call(function, &args)?;
        self.transact_raw(opts, input, name).await
    }

    async fn transact_raw(&self, opts: &TransactOpts, input: Bytes, name: &str) -> Result<TxHandle> {
        let request = opts.apply(self.request(input));

        debug!("Submitting {} to {}", name, self.address());
        self.backend
            .send_transaction(request, opts.cancel.as_ref())
            .await
    }
}

impl<B: LogBackend> SimpleDvtModule<B> {
    /// Fetch historical `E` logs in the options' block range that satisfy `indexed`.
    pub async fn filter<E: SolEvent>(
        &self,
        opts: &FilterOpts,
        indexed: &IndexedFilter,
    ) -> Result<EventIterator<E>> {
        let query = indexed.query::<E>(self.address(), Some(opts.from_block), opts.to_block)?;

        debug!(
            "Filtering {} logs from block {} to {:?}",
            E::SIGNATURE,
            opts.from_block,
            opts.to_block
        );
        let logs = with_cancel(
            opts.cancel.as_ref(),
            self.backend.filter_logs(&query),
            || BindingError::Rpc(format!("{} log query cancelled", E::SIGNATURE)),
        )
        .await?;

        Ok(EventIterator::new(logs))
    }

    /// Fetch historical logs of every module event and decode them into the tagged union.
    pub async fn filter_all(&self, opts: &FilterOpts) -> Result<Vec<Event<SimpleDvtEvent>>> {
        let query = super::LogQuery {
            address: self.address(),
            from_block: Some(opts.from_block),
            to_block: opts.to_block,
            ..Default::default()
        };

        let mut logs = with_cancel(
            opts.cancel.as_ref(),
            self.backend.filter_logs(&query),
            || BindingError::rpc("log query cancelled"),
        )
        .await?;
        logs.sort_by_key(|log| {
            (
                log.block_number.unwrap_or_default(),
                log.log_index.unwrap_or_default(),
            )
        });

        logs.iter().map(events::parse_any_log).collect()
    }

    /// Stream new `E` logs satisfying `indexed` into `sink` until cancelled, failed or the
    /// transport ends the stream.
    pub async fn watch<E: SolEvent>(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<Event<E>>,
        indexed: &IndexedFilter,
    ) -> Result<WatchExit> {
        let query = indexed.query::<E>(self.address(), opts.start_block, None)?;
        let subscription = self.backend.subscribe_logs(&query).await?;
        events::run_watch(subscription, sink, opts.cancel.clone()).await
    }
}

macro_rules! view_methods {
    ($( $(#[$meta:meta])* $method:ident($($arg:ident: $ty:ty),*) => $call:ident($abi:literal); )*) => {
        impl<B: CallBackend> SimpleDvtModule<B> {
            /// ABI names of the generated read wrappers, with their selectors.
            pub(crate) const VIEW_FUNCTIONS: &'static [(&'static str, [u8; 4])] =
                &[$(($abi, <ISimpleDVTModule::$call as SolCall>::SELECTOR)),*];

            $(
                $(#[$meta])*
                #[doc = concat!("Calls `", $abi, "`.")]
                pub async fn $method(
                    &self,
                    opts: &CallOpts,
                    $($arg: $ty),*
                ) -> Result<<ISimpleDVTModule::$call as SolCall>::Return> {
                    self.call(opts, <ISimpleDVTModule::$call as SolCall>::new(($($arg,)*)))
                        .await
                }
            )*
        }
    };
}

macro_rules! transact_methods {
    ($( $(#[$meta:meta])* $method:ident($($arg:ident: $ty:ty),*) => $call:ident($abi:literal); )*) => {
        impl<B: TransactBackend> SimpleDvtModule<B> {
            pub(crate) const TRANSACT_FUNCTIONS: &'static [(&'static str, [u8; 4])] =
                &[$(($abi, <ISimpleDVTModule::$call as SolCall>::SELECTOR)),*];

            $(
                $(#[$meta])*
                #[doc = concat!("Submits `", $abi, "`.")]
                pub async fn $method(
                    &self,
                    opts: &TransactOpts,
                    $($arg: $ty),*
                ) -> Result<TxHandle> {
                    self.transact(opts, <ISimpleDVTModule::$call as SolCall>::new(($($arg,)*)))
                        .await
                }
            )*
        }
    };
}

macro_rules! event_methods {
    ($( $filter:ident, $watch:ident => $event:ident($($field:ident: $ty:ty),*); )*) => {
        impl<B: LogBackend> SimpleDvtModule<B> {
            $(
                #[doc = concat!("Historical `", stringify!($event), "` logs. Empty slices match any value.")]
                pub async fn $filter(
                    &self,
                    opts: &FilterOpts,
                    $($field: &[$ty]),*
                ) -> Result<EventIterator<ISimpleDVTModule::$event>> {
                    let indexed = IndexedFilter::new()$(.and($field.iter().copied()))*;
                    self.filter(opts, &indexed).await
                }

                #[doc = concat!("Live `", stringify!($event), "` logs. Empty slices match any value.")]
                pub async fn $watch(
                    &self,
                    opts: &WatchOpts,
                    sink: mpsc::Sender<Event<ISimpleDVTModule::$event>>,
                    $($field: &[$ty]),*
                ) -> Result<WatchExit> {
                    let indexed = IndexedFilter::new()$(.and($field.iter().copied()))*;
                    self.watch(opts, sink, &indexed).await
                }
            )*
        }
    };
}

view_methods! {
    manage_signing_keys() => MANAGE_SIGNING_KEYSCall("MANAGE_SIGNING_KEYS");
    set_node_operator_limit_role() => SET_NODE_OPERATOR_LIMIT_ROLECall("SET_NODE_OPERATOR_LIMIT_ROLE");
    manage_node_operator_role() => MANAGE_NODE_OPERATOR_ROLECall("MANAGE_NODE_OPERATOR_ROLE");
    staking_router_role() => STAKING_ROUTER_ROLECall("STAKING_ROUTER_ROLE");
    max_node_operators_count() => MAX_NODE_OPERATORS_COUNTCall("MAX_NODE_OPERATORS_COUNT");
    max_node_operator_name_length() => MAX_NODE_OPERATOR_NAME_LENGTHCall("MAX_NODE_OPERATOR_NAME_LENGTH");
    max_stuck_penalty_delay() => MAX_STUCK_PENALTY_DELAYCall("MAX_STUCK_PENALTY_DELAY");
    has_initialized() => hasInitializedCall("hasInitialized");
    get_initialization_block() => getInitializationBlockCall("getInitializationBlock");
    get_contract_version() => getContractVersionCall("getContractVersion");
    is_petrified() => isPetrifiedCall("isPetrified");
    get_node_operator(node_operator_id: U256, full_info: bool) => getNodeOperatorCall("getNodeOperator");
    get_node_operators_count() => getNodeOperatorsCountCall("getNodeOperatorsCount");
    get_active_node_operators_count() => getActiveNodeOperatorsCountCall("getActiveNodeOperatorsCount");
    get_node_operator_is_active(node_operator_id: U256) => getNodeOperatorIsActiveCall("getNodeOperatorIsActive");
    get_node_operator_ids(offset: U256, limit: U256) => getNodeOperatorIdsCall("getNodeOperatorIds");
    get_node_operator_summary(node_operator_id: U256) => getNodeOperatorSummaryCall("getNodeOperatorSummary");
    get_staking_module_summary() => getStakingModuleSummaryCall("getStakingModuleSummary");
    get_total_signing_key_count(node_operator_id: U256) => getTotalSigningKeyCountCall("getTotalSigningKeyCount");
    get_unused_signing_key_count(node_operator_id: U256) => getUnusedSigningKeyCountCall("getUnusedSigningKeyCount");
    get_signing_key(node_operator_id: U256, index: U256) => getSigningKeyCall("getSigningKey");
    get_signing_keys(node_operator_id: U256, offset: U256, limit: U256) => getSigningKeysCall("getSigningKeys");
    get_type() => getTypeCall("getType");
    get_locator() => getLocatorCall("getLocator");
    get_nonce() => getNonceCall("getNonce");
    get_keys_op_index() => getKeysOpIndexCall("getKeysOpIndex");
    get_stuck_penalty_delay() => getStuckPenaltyDelayCall("getStuckPenaltyDelay");
    is_operator_penalized(node_operator_id: U256) => isOperatorPenalizedCall("isOperatorPenalized");
    is_operator_penalty_cleared(node_operator_id: U256) => isOperatorPenaltyClearedCall("isOperatorPenaltyCleared");
    get_rewards_distribution(total_reward_shares: U256) => getRewardsDistributionCall("getRewardsDistribution");
    get_reward_distribution_state() => getRewardDistributionStateCall("getRewardDistributionState");
    exit_deadline_threshold(node_operator_id: U256) => exitDeadlineThresholdCall("exitDeadlineThreshold");
    exit_penalty_cutoff_timestamp() => exitPenaltyCutoffTimestampCall("exitPenaltyCutoffTimestamp");
    is_validator_exit_delay_penalty_applicable(
        node_operator_id: U256,
        proof_slot_timestamp: U256,
        public_key: Bytes,
        eligible_to_exit_in_sec: U256
    ) => isValidatorExitDelayPenaltyApplicableCall("isValidatorExitDelayPenaltyApplicable");
    kernel() => kernelCall("kernel");
    app_id() => appIdCall("appId");
    can_perform(sender: Address, role: B256, params: Vec<U256>) => canPerformCall("canPerform");
    get_recovery_vault() => getRecoveryVaultCall("getRecoveryVault");
    allow_recoverability(token: Address) => allowRecoverabilityCall("allowRecoverability");
    get_evm_script_registry() => getEVMScriptRegistryCall("getEVMScriptRegistry");
    get_evm_script_executor(script: Bytes) => getEVMScriptExecutorCall("getEVMScriptExecutor");
}

transact_methods! {
    initialize(locator: Address, module_type: B256, exit_deadline_threshold: U256) => initializeCall("initialize");
    finalize_upgrade_v2(locator: Address, module_type: B256, stuck_penalty_delay: U256) => finalizeUpgrade_v2Call("finalizeUpgrade_v2");
    finalize_upgrade_v3() => finalizeUpgrade_v3Call("finalizeUpgrade_v3");
    finalize_upgrade_v4(exit_deadline_threshold: U256) => finalizeUpgrade_v4Call("finalizeUpgrade_v4");
    add_node_operator(name: String, reward_address: Address) => addNodeOperatorCall("addNodeOperator");
    activate_node_operator(node_operator_id: U256) => activateNodeOperatorCall("activateNodeOperator");
    deactivate_node_operator(node_operator_id: U256) => deactivateNodeOperatorCall("deactivateNodeOperator");
    set_node_operator_name(node_operator_id: U256, name: String) => setNodeOperatorNameCall("setNodeOperatorName");
    set_node_operator_reward_address(node_operator_id: U256, reward_address: Address) => setNodeOperatorRewardAddressCall("setNodeOperatorRewardAddress");
    set_node_operator_staking_limit(node_operator_id: U256, vetted_signing_keys_count: u64) => setNodeOperatorStakingLimitCall("setNodeOperatorStakingLimit");
    decrease_vetted_signing_keys_count(node_operator_ids: Bytes, vetted_signing_keys_counts: Bytes) => decreaseVettedSigningKeysCountCall("decreaseVettedSigningKeysCount");
    on_rewards_minted(total_shares: U256) => onRewardsMintedCall("onRewardsMinted");
    update_exited_validators_count(node_operator_ids: Bytes, exited_validators_counts: Bytes) => updateExitedValidatorsCountCall("updateExitedValidatorsCount");
    update_stuck_validators_count(node_operator_ids: Bytes, stuck_validators_counts: Bytes) => updateStuckValidatorsCountCall("updateStuckValidatorsCount");
    update_refunded_validators_count(node_operator_id: U256, refunded_validators_count: U256) => updateRefundedValidatorsCountCall("updateRefundedValidatorsCount");
    on_exited_and_stuck_validators_counts_updated() => onExitedAndStuckValidatorsCountsUpdatedCall("onExitedAndStuckValidatorsCountsUpdated");
    unsafe_update_validators_count(
        node_operator_id: U256,
        exited_validators_count: U256,
        stuck_validators_count: U256
    ) => unsafeUpdateValidatorsCountCall("unsafeUpdateValidatorsCount");
    /// Target limit given as a numeric mode (0 disabled, 1 soft, 2 forced).
    update_target_validators_limits(node_operator_id: U256, target_limit_mode: U256, target_limit: U256) => updateTargetValidatorsLimits_0Call("updateTargetValidatorsLimits(uint256,uint256,uint256)");
    /// Target limit given as an on/off flag.
    update_target_validators_limits_active(node_operator_id: U256, is_target_limit_active: bool, target_limit: U256) => updateTargetValidatorsLimits_1Call("updateTargetValidatorsLimits(uint256,bool,uint256)");
    on_withdrawal_credentials_changed() => onWithdrawalCredentialsChangedCall("onWithdrawalCredentialsChanged");
    invalidate_ready_to_deposit_keys_range(index_from: U256, index_to: U256) => invalidateReadyToDepositKeysRangeCall("invalidateReadyToDepositKeysRange");
    obtain_deposit_data(deposits_count: U256, deposit_calldata: Bytes) => obtainDepositDataCall("obtainDepositData");
    add_signing_keys(node_operator_id: U256, keys_count: U256, public_keys: Bytes, signatures: Bytes) => addSigningKeysCall("addSigningKeys");
    add_signing_keys_operator_bh(node_operator_id: U256, keys_count: U256, public_keys: Bytes, signatures: Bytes) => addSigningKeysOperatorBHCall("addSigningKeysOperatorBH");
    remove_signing_key(node_operator_id: U256, index: U256) => removeSigningKeyCall("removeSigningKey");
    remove_signing_keys(node_operator_id: U256, from_index: U256, keys_count: U256) => removeSigningKeysCall("removeSigningKeys");
    remove_signing_key_operator_bh(node_operator_id: U256, index: U256) => removeSigningKeyOperatorBHCall("removeSigningKeyOperatorBH");
    remove_signing_keys_operator_bh(node_operator_id: U256, from_index: U256, keys_count: U256) => removeSigningKeysOperatorBHCall("removeSigningKeysOperatorBH");
    set_stuck_penalty_delay(delay: U256) => setStuckPenaltyDelayCall("setStuckPenaltyDelay");
    clear_node_operator_penalty(node_operator_id: U256) => clearNodeOperatorPenaltyCall("clearNodeOperatorPenalty");
    distribute_reward() => distributeRewardCall("distributeReward");
    set_exit_deadline_threshold(threshold: U256, late_reporting_window: U256) => setExitDeadlineThresholdCall("setExitDeadlineThreshold");
    report_validator_exit_delay(
        node_operator_id: U256,
        proof_slot_timestamp: U256,
        public_key: Bytes,
        eligible_to_exit_in_sec: U256
    ) => reportValidatorExitDelayCall("reportValidatorExitDelay");
    on_validator_exit_triggered(
        node_operator_id: U256,
        public_key: Bytes,
        withdrawal_request_paid_fee: U256,
        exit_type: U256
    ) => onValidatorExitTriggeredCall("onValidatorExitTriggered");
    transfer_to_vault(token: Address) => transferToVaultCall("transferToVault");
}

event_methods! {
    filter_node_operator_added, watch_node_operator_added => NodeOperatorAdded();
    filter_node_operator_active_set, watch_node_operator_active_set => NodeOperatorActiveSet(node_operator_id: U256);
    filter_node_operator_name_set, watch_node_operator_name_set => NodeOperatorNameSet(node_operator_id: U256);
    filter_node_operator_reward_address_set, watch_node_operator_reward_address_set => NodeOperatorRewardAddressSet(node_operator_id: U256);
    filter_node_operator_total_keys_trimmed, watch_node_operator_total_keys_trimmed => NodeOperatorTotalKeysTrimmed(node_operator_id: U256);
    filter_keys_op_index_set, watch_keys_op_index_set => KeysOpIndexSet();
    filter_staking_module_type_set, watch_staking_module_type_set => StakingModuleTypeSet();
    filter_rewards_distributed, watch_rewards_distributed => RewardsDistributed(reward_address: Address);
    filter_reward_distribution_state_changed, watch_reward_distribution_state_changed => RewardDistributionStateChanged();
    filter_locator_contract_set, watch_locator_contract_set => LocatorContractSet();
    filter_vetted_signing_keys_count_changed, watch_vetted_signing_keys_count_changed => VettedSigningKeysCountChanged(node_operator_id: U256);
    filter_deposited_signing_keys_count_changed, watch_deposited_signing_keys_count_changed => DepositedSigningKeysCountChanged(node_operator_id: U256);
    filter_exited_signing_keys_count_changed, watch_exited_signing_keys_count_changed => ExitedSigningKeysCountChanged(node_operator_id: U256);
    filter_total_signing_keys_count_changed, watch_total_signing_keys_count_changed => TotalSigningKeysCountChanged(node_operator_id: U256);
    filter_nonce_changed, watch_nonce_changed => NonceChanged();
    filter_stuck_penalty_delay_changed, watch_stuck_penalty_delay_changed => StuckPenaltyDelayChanged();
    filter_stuck_penalty_state_changed, watch_stuck_penalty_state_changed => StuckPenaltyStateChanged(node_operator_id: U256);
    filter_target_validators_count_changed, watch_target_validators_count_changed => TargetValidatorsCountChanged(node_operator_id: U256);
    filter_node_operator_penalized, watch_node_operator_penalized => NodeOperatorPenalized(recipient_address: Address);
    filter_node_operator_penalty_cleared, watch_node_operator_penalty_cleared => NodeOperatorPenaltyCleared(node_operator_id: U256);
    filter_signing_key_added, watch_signing_key_added => SigningKeyAdded(node_operator_id: U256);
    filter_signing_key_removed, watch_signing_key_removed => SigningKeyRemoved(node_operator_id: U256);
    filter_validator_exit_status_updated, watch_validator_exit_status_updated => ValidatorExitStatusUpdated(node_operator_id: U256);
    filter_validator_exit_triggered, watch_validator_exit_triggered => ValidatorExitTriggered(node_operator_id: U256);
    filter_exit_deadline_threshold_changed, watch_exit_deadline_threshold_changed => ExitDeadlineThresholdChanged();
    filter_contract_version_set, watch_contract_version_set => ContractVersionSet();
    filter_recover_to_vault, watch_recover_to_vault => RecoverToVault(vault: Address, token: Address);
    filter_script_result, watch_script_result => ScriptResult(executor: Address);
}
