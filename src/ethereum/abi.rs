use alloy::{
    json_abi::{Event, Function, JsonAbi},
    primitives::Address,
    sol,
};
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::error::BindingError;

sol! {
    #![sol(all_derives)]

    /// Interface of the SimpleDVT staking module, a `NodeOperatorsRegistry` deployment.
    #[allow(missing_docs)]
    #[sol(abi)]
    interface ISimpleDVTModule {
        // Roles and limits
        function MANAGE_SIGNING_KEYS() external view returns (bytes32);
        function SET_NODE_OPERATOR_LIMIT_ROLE() external view returns (bytes32);
        function MANAGE_NODE_OPERATOR_ROLE() external view returns (bytes32);
        function STAKING_ROUTER_ROLE() external view returns (bytes32);
        function MAX_NODE_OPERATORS_COUNT() external view returns (uint256);
        function MAX_NODE_OPERATOR_NAME_LENGTH() external view returns (uint256);
        function MAX_STUCK_PENALTY_DELAY() external view returns (uint256);

        // Initialization and upgrades
        function initialize(address _locator, bytes32 _type, uint256 _exitDeadlineThresholdInSeconds) external;
        function finalizeUpgrade_v2(address _locator, bytes32 _type, uint256 _stuckPenaltyDelay) external;
        function finalizeUpgrade_v3() external;
        function finalizeUpgrade_v4(uint256 _exitDeadlineThresholdInSeconds) external;
        function hasInitialized() external view returns (bool);
        function getInitializationBlock() external view returns (uint256);
        function getContractVersion() external view returns (uint256);
        function isPetrified() external view returns (bool);

        // Node operator management
        function addNodeOperator(string _name, address _rewardAddress) external returns (uint256 id);
        function activateNodeOperator(uint256 _nodeOperatorId) external;
        function deactivateNodeOperator(uint256 _nodeOperatorId) external;
        function setNodeOperatorName(uint256 _nodeOperatorId, string _name) external;
        function setNodeOperatorRewardAddress(uint256 _nodeOperatorId, address _rewardAddress) external;
        function setNodeOperatorStakingLimit(uint256 _nodeOperatorId, uint64 _vettedSigningKeysCount) external;
        function decreaseVettedSigningKeysCount(bytes _nodeOperatorIds, bytes _vettedSigningKeysCounts) external;
        function getNodeOperator(uint256 _nodeOperatorId, bool _fullInfo) external view returns (bool active, string name, address rewardAddress, uint64 totalVettedValidators, uint64 totalExitedValidators, uint64 totalAddedValidators, uint64 totalDepositedValidators);
        function getNodeOperatorsCount() external view returns (uint256);
        function getActiveNodeOperatorsCount() external view returns (uint256);
        function getNodeOperatorIsActive(uint256 _nodeOperatorId) external view returns (bool);
        function getNodeOperatorIds(uint256 _offset, uint256 _limit) external view returns (uint256[] nodeOperatorIds);
        function getNodeOperatorSummary(uint256 _nodeOperatorId) external view returns (uint256 targetLimitMode, uint256 targetValidatorsCount, uint256 stuckValidatorsCount, uint256 refundedValidatorsCount, uint256 stuckPenaltyEndTimestamp, uint256 totalExitedValidators, uint256 totalDepositedValidators, uint256 depositableValidatorsCount);

        // Validator counters reported by the staking router
        function onRewardsMinted(uint256 _totalShares) external;
        function updateExitedValidatorsCount(bytes _nodeOperatorIds, bytes _exitedValidatorsCounts) external;
        function updateStuckValidatorsCount(bytes _nodeOperatorIds, bytes _stuckValidatorsCounts) external;
        function updateRefundedValidatorsCount(uint256 _nodeOperatorId, uint256 _refundedValidatorsCount) external;
        function onExitedAndStuckValidatorsCountsUpdated() external;
        function unsafeUpdateValidatorsCount(uint256 _nodeOperatorId, uint256 _exitedValidatorsCount, uint256 _stuckValidatorsCount) external;
        function updateTargetValidatorsLimits(uint256 _nodeOperatorId, uint256 _targetLimitMode, uint256 _targetLimit) external;
        function updateTargetValidatorsLimits(uint256 _nodeOperatorId, bool _isTargetLimitActive, uint256 _targetLimit) external;
        function onWithdrawalCredentialsChanged() external;
        function invalidateReadyToDepositKeysRange(uint256 _indexFrom, uint256 _indexTo) external;
        function obtainDepositData(uint256 _depositsCount, bytes _depositCalldata) external returns (bytes publicKeys, bytes signatures);
        function getStakingModuleSummary() external view returns (uint256 totalExitedValidators, uint256 totalDepositedValidators, uint256 depositableValidatorsCount);

        // Signing keys
        function addSigningKeys(uint256 _nodeOperatorId, uint256 _keysCount, bytes _publicKeys, bytes _signatures) external;
        function addSigningKeysOperatorBH(uint256 _nodeOperatorId, uint256 _keysCount, bytes _publicKeys, bytes _signatures) external;
        function removeSigningKey(uint256 _nodeOperatorId, uint256 _index) external;
        function removeSigningKeys(uint256 _nodeOperatorId, uint256 _fromIndex, uint256 _keysCount) external;
        function removeSigningKeyOperatorBH(uint256 _nodeOperatorId, uint256 _index) external;
        function removeSigningKeysOperatorBH(uint256 _nodeOperatorId, uint256 _fromIndex, uint256 _keysCount) external;
        function getTotalSigningKeyCount(uint256 _nodeOperatorId) external view returns (uint256);
        function getUnusedSigningKeyCount(uint256 _nodeOperatorId) external view returns (uint256);
        function getSigningKey(uint256 _nodeOperatorId, uint256 _index) external view returns (bytes key, bytes depositSignature, bool used);
        function getSigningKeys(uint256 _nodeOperatorId, uint256 _offset, uint256 _limit) external view returns (bytes pubkeys, bytes signatures, bool[] used);

        // Module metadata
        function getType() external view returns (bytes32);
        function getLocator() external view returns (address);
        function getNonce() external view returns (uint256);
        function getKeysOpIndex() external view returns (uint256);

        // Penalties and rewards
        function getStuckPenaltyDelay() external view returns (uint256);
        function setStuckPenaltyDelay(uint256 _delay) external;
        function isOperatorPenalized(uint256 _nodeOperatorId) external view returns (bool);
        function isOperatorPenaltyCleared(uint256 _nodeOperatorId) external view returns (bool);
        function clearNodeOperatorPenalty(uint256 _nodeOperatorId) external returns (bool);
        function getRewardsDistribution(uint256 _totalRewardShares) external view returns (address[] recipients, uint256[] shares, bool[] penalized);
        function getRewardDistributionState() external view returns (uint8);
        function distributeReward() external;

        // Validator exit delay reporting
        function exitDeadlineThreshold(uint256 _nodeOperatorId) external view returns (uint256);
        function exitPenaltyCutoffTimestamp() external view returns (uint256);
        function setExitDeadlineThreshold(uint256 _threshold, uint256 _lateReportingWindow) external;
        function isValidatorExitDelayPenaltyApplicable(uint256 _nodeOperatorId, uint256 _proofSlotTimestamp, bytes _publicKey, uint256 _eligibleToExitInSec) external view returns (bool);
        function reportValidatorExitDelay(uint256 _nodeOperatorId, uint256 _proofSlotTimestamp, bytes _publicKey, uint256 _eligibleToExitInSec) external;
        function onValidatorExitTriggered(uint256 _nodeOperatorId, bytes _publicKey, uint256 _withdrawalRequestPaidFee, uint256 _exitType) external;

        // Aragon app plumbing
        function kernel() external view returns (address);
        function appId() external view returns (bytes32);
        function canPerform(address _sender, bytes32 _role, uint256[] _params) external view returns (bool);
        function getRecoveryVault() external view returns (address);
        function allowRecoverability(address _token) external view returns (bool);
        function transferToVault(address _token) external;
        function getEVMScriptRegistry() external view returns (address);
        function getEVMScriptExecutor(bytes _script) external view returns (address);

        event NodeOperatorAdded(uint256 nodeOperatorId, string name, address rewardAddress, uint64 stakingLimit);
        event NodeOperatorActiveSet(uint256 indexed nodeOperatorId, bool active);
        event NodeOperatorNameSet(uint256 indexed nodeOperatorId, string name);
        event NodeOperatorRewardAddressSet(uint256 indexed nodeOperatorId, address rewardAddress);
        event NodeOperatorTotalKeysTrimmed(uint256 indexed nodeOperatorId, uint64 totalKeysTrimmed);
        event KeysOpIndexSet(uint256 keysOpIndex);
        event StakingModuleTypeSet(bytes32 moduleType);
        event RewardsDistributed(address indexed rewardAddress, uint256 sharesAmount);
        event RewardDistributionStateChanged(uint8 state);
        event LocatorContractSet(address locatorAddress);
        event VettedSigningKeysCountChanged(uint256 indexed nodeOperatorId, uint256 approvedValidatorsCount);
        event DepositedSigningKeysCountChanged(uint256 indexed nodeOperatorId, uint256 depositedValidatorsCount);
        event ExitedSigningKeysCountChanged(uint256 indexed nodeOperatorId, uint256 exitedValidatorsCount);
        event TotalSigningKeysCountChanged(uint256 indexed nodeOperatorId, uint256 totalValidatorsCount);
        event NonceChanged(uint256 nonce);
        event StuckPenaltyDelayChanged(uint256 stuckPenaltyDelay);
        event StuckPenaltyStateChanged(uint256 indexed nodeOperatorId, uint256 stuckValidatorsCount, uint256 refundedValidatorsCount, uint256 stuckPenaltyEndTimestamp);
        event TargetValidatorsCountChanged(uint256 indexed nodeOperatorId, uint256 targetValidatorsCount, uint256 targetLimitMode);
        event NodeOperatorPenalized(address indexed recipientAddress, uint256 sharesPenalizedAmount);
        event NodeOperatorPenaltyCleared(uint256 indexed nodeOperatorId);
        event SigningKeyAdded(uint256 indexed nodeOperatorId, bytes pubkey);
        event SigningKeyRemoved(uint256 indexed nodeOperatorId, bytes pubkey);
        event ValidatorExitStatusUpdated(uint256 indexed nodeOperatorId, bytes publicKey, uint256 eligibleToExitInSec, uint256 proofSlotTimestamp);
        event ValidatorExitTriggered(uint256 indexed nodeOperatorId, bytes publicKey, uint256 withdrawalRequestPaidFee, uint256 exitType);
        event ExitDeadlineThresholdChanged(uint256 threshold, uint256 reportingWindow);
        event ContractVersionSet(uint256 version);
        event RecoverToVault(address indexed vault, address indexed token, uint256 amount);
        event ScriptResult(address indexed executor, bytes script, bytes input, bytes returnData);
    }
}

/// Tagged union over every event payload the module emits.
pub type SimpleDvtEvent = ISimpleDVTModule::ISimpleDVTModuleEvents;

/// The SimpleDVT interface as a JSON ABI, built from the `sol!` declaration above.
pub fn simple_dvt_abi() -> JsonAbi {
    ISimpleDVTModule::abi::contract()
}

/// Immutable (address, ABI) pair shared by every handle bound to one deployment.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    address: Address,
    abi: Arc<JsonAbi>,
}

impl ContractDescriptor {
    pub fn new(address: Address, abi: JsonAbi) -> Self {
        Self {
            address,
            abi: Arc::new(abi),
        }
    }

    /// Descriptor for a SimpleDVT deployment using the built-in interface.
    pub fn simple_dvt(address: Address) -> Self {
        Self::new(address, simple_dvt_abi())
    }

    /// Descriptor whose ABI is read from a JSON file, for deployments that have been
    /// upgraded past the built-in interface.
    pub async fn from_abi_file<P: AsRef<Path>>(address: Address, path: P) -> Result<Self> {
        let abi = load_abi_file(path).await?;
        Ok(Self::new(address, abi))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Looks up a function by bare name or by full signature such as
    /// `updateTargetValidatorsLimits(uint256,bool,uint256)`.
    ///
    /// A bare name that resolves to several overloads is rejected; the caller has to pick
    /// one by signature.
    pub fn function(&self, name_or_signature: &str) -> Result<&Function, BindingError> {
        if name_or_signature.contains('(') {
            return self
                .abi
                .functions()
                .find(|f| f.signature() == name_or_signature)
                .ok_or_else(|| self.unknown_function(name_or_signature));
        }

        match self.abi.function(name_or_signature).map(Vec::as_slice) {
            Some([function]) => Ok(function),
            Some(overloads) if !overloads.is_empty() => {
                let signatures: Vec<String> = overloads.iter().map(|f| f.signature()).collect();
                Err(BindingError::Encoding(format!(
                    "Function '{}' is overloaded, use one of: {}",
                    name_or_signature,
                    signatures.join(", ")
                )))
            }
            _ => Err(self.unknown_function(name_or_signature)),
        }
    }

    /// Looks up an event by bare name or full signature.
    pub fn event(&self, name_or_signature: &str) -> Result<&Event, BindingError> {
        let found = if name_or_signature.contains('(') {
            self.abi
                .events()
                .find(|e| e.signature() == name_or_signature)
        } else {
            self.abi
                .event(name_or_signature)
                .and_then(|events| events.first())
        };

        found.ok_or_else(|| {
            BindingError::Decoding(format!(
                "Event '{}' not found in contract ABI",
                name_or_signature
            ))
        })
    }

    fn unknown_function(&self, name: &str) -> BindingError {
        let available: Vec<&str> = self.abi.functions().map(|f| f.name.as_str()).collect();
        if available.is_empty() {
            BindingError::Encoding(format!(
                "Function '{}' not found. The contract ABI contains no functions.",
                name
            ))
        } else {
            BindingError::Encoding(format!(
                "Function '{}' not found in contract ABI. Available functions: {}",
                name,
                available.join(", ")
            ))
        }
    }
}

/// Load a JSON ABI from disk.
pub async fn load_abi_file<P: AsRef<Path>>(path: P) -> Result<JsonAbi> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read ABI file {:?}: {}", path, e))?;

    let abi: JsonAbi = serde_json::from_str(&content)
        .map_err(|e| anyhow!("Failed to parse ABI file {:?}: {}", path, e))?;

    debug!("Loaded ABI with {} functions from {:?}", abi.functions().count(), path);
    Ok(abi)
}

/// Write a JSON ABI to disk, creating parent directories as needed.
pub async fn save_abi_file<P: AsRef<Path>>(abi: &JsonAbi, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow!("Failed to create ABI directory {:?}: {}", parent, e))?;
        }
    }

    let content =
        serde_json::to_string_pretty(abi).map_err(|e| anyhow!("Failed to serialize ABI: {}", e))?;

    fs::write(path, content)
        .await
        .map_err(|e| anyhow!("Failed to write ABI file {:?}: {}", path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{primitives::address, sol_types::SolEvent};
    use tempfile::tempdir;

    const MODULE: Address = address!("aE7B191A31f627b4eB1d4DaC64eab9976995b433");

    #[test]
    fn test_builtin_abi_has_both_target_limit_overloads() {
        let descriptor = ContractDescriptor::simple_dvt(MODULE);

        let by_mode = descriptor
            .function("updateTargetValidatorsLimits(uint256,uint256,uint256)")
            .unwrap();
        let by_flag = descriptor
            .function("updateTargetValidatorsLimits(uint256,bool,uint256)")
            .unwrap();
        assert_ne!(by_mode.selector(), by_flag.selector());

        let err = descriptor
            .function("updateTargetValidatorsLimits")
            .unwrap_err();
        assert!(matches!(err, BindingError::Encoding(msg) if msg.contains("overloaded")));
    }

    #[test]
    fn test_unknown_function_lists_available() {
        let descriptor = ContractDescriptor::simple_dvt(MODULE);
        let err = descriptor.function("transfer").unwrap_err();
        assert!(matches!(err, BindingError::Encoding(msg) if msg.contains("getNodeOperator")));
    }

    #[test]
    fn test_event_lookup_matches_sol_signature() {
        let descriptor = ContractDescriptor::simple_dvt(MODULE);
        let event = descriptor.event("NodeOperatorAdded").unwrap();
        assert_eq!(
            event.selector(),
            ISimpleDVTModule::NodeOperatorAdded::SIGNATURE_HASH
        );
        assert!(descriptor
            .event("NodeOperatorActiveSet(uint256,bool)")
            .is_ok());
        assert!(descriptor.event("Transfer").is_err());
    }

    #[tokio::test]
    async fn test_abi_file_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("abi").join("SimpleDVTModule.json");

        save_abi_file(&simple_dvt_abi(), &path).await.unwrap();
        let descriptor = ContractDescriptor::from_abi_file(MODULE, &path)
            .await
            .unwrap();

        assert_eq!(descriptor.address(), MODULE);
        assert_eq!(
            descriptor.abi().functions().count(),
            simple_dvt_abi().functions().count()
        );
    }

    #[tokio::test]
    async fn test_missing_abi_file() {
        let temp_dir = tempdir().unwrap();
        let result = load_abi_file(temp_dir.path().join("missing.json")).await;
        assert!(result.is_err());
    }
}
