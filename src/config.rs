use alloy::primitives::{address, Address, U256};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

use crate::ethereum::utils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// SimpleDVT module proxy on this network.
    pub module_address: Address,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Used when gas estimation fails.
    pub default_gas_limit: u64,
    /// Upper bound for `maxFeePerGas`, in wei.
    pub max_gas_price: Option<u64>,
    /// Priority fee used instead of the node's suggestion, in wei.
    pub priority_fee: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
    /// Largest `value` a transaction may carry, in wei (decimal or 0x-hex).
    pub max_transaction_value: Option<String>,
}

impl SecurityConfig {
    pub fn max_transaction_value(&self) -> Result<Option<U256>> {
        self.max_transaction_value
            .as_deref()
            .map(|value| {
                utils::validate_hex_value(value)
                    .map_err(|e| anyhow!("Invalid max_transaction_value: {}", e))
            })
            .transpose()
    }
}

pub const MAINNET_MODULE: Address = address!("aE7B191A31f627b4eB1d4DaC64eab9976995b433");
pub const HOLESKY_MODULE: Address = address!("11a93807078f8BB880c1BD0ee4C387537de4b4b6");

impl Default for BindingConfig {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "mainnet".to_string(),
            NetworkConfig {
                rpc_url: "https://eth-mainnet.g.alchemy.com/v2/demo".to_string(),
                chain_id: 1,
                module_address: MAINNET_MODULE,
                explorer_url: Some("https://etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 500_000,
                    max_gas_price: Some(50_000_000_000), // 50 Gwei
                    priority_fee: Some(2_000_000_000),   // 2 Gwei
                },
            },
        );

        networks.insert(
            "holesky".to_string(),
            NetworkConfig {
                rpc_url: "https://eth-holesky.g.alchemy.com/v2/demo".to_string(),
                chain_id: 17000,
                module_address: HOLESKY_MODULE,
                explorer_url: Some("https://holesky.etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 500_000,
                    max_gas_price: Some(20_000_000_000), // 20 Gwei
                    priority_fee: Some(1_000_000_000),   // 1 Gwei
                },
            },
        );

        Self {
            networks,
            default_network: "mainnet".to_string(),
            security: SecurityConfig {
                allow_write_operations: false,
                max_transaction_value: None,
            },
        }
    }
}

impl BindingConfig {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: BindingConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    /// Look up a network by name, or the default network when `name` is `None`.
    pub fn network(&self, name: Option<&str>) -> Result<&NetworkConfig> {
        let name = name.unwrap_or(&self.default_network);
        let available: Vec<String> = self.networks.keys().cloned().collect();
        utils::validate_network(name, &available)?;

        self.networks
            .get(name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", name))
    }

    pub fn add_network(&mut self, name: String, config: NetworkConfig) {
        self.networks.insert(name, config);
    }

    /// Apply environment variable substitutions to configuration
    pub fn apply_env_vars(&mut self) {
        let rpc_override = std::env::var("SIMPLE_DVT_RPC_URL").ok();
        let api_key = std::env::var("ALCHEMY_API_KEY").ok();
        self.apply_overrides(rpc_override.as_deref(), api_key.as_deref());
    }

    fn apply_overrides(&mut self, rpc_override: Option<&str>, api_key: Option<&str>) {
        if let Some(url) = rpc_override {
            if let Some(network) = self.networks.get_mut(&self.default_network) {
                tracing::info!(
                    "Using SIMPLE_DVT_RPC_URL for network {}",
                    self.default_network
                );
                network.rpc_url = url.to_string();
            }
        }

        match api_key {
            Some(api_key) => {
                for (network_name, network_config) in &mut self.networks {
                    if network_config.rpc_url.contains("alchemy.com/v2/demo") {
                        network_config.rpc_url = network_config
                            .rpc_url
                            .replace("/demo", &format!("/{}", api_key));
                        tracing::debug!("Updated {} RPC URL with API key", network_name);
                    } else if network_config.rpc_url.contains("YOUR_API_KEY_HERE") {
                        network_config.rpc_url =
                            network_config.rpc_url.replace("YOUR_API_KEY_HERE", api_key);
                        tracing::debug!("Updated {} RPC URL with API key", network_name);
                    }
                }
            }
            None => {
                for (network_name, network_config) in &self.networks {
                    if network_config.rpc_url.contains("/demo") {
                        tracing::warn!("Using demo RPC endpoint for {}, set ALCHEMY_API_KEY or SIMPLE_DVT_RPC_URL for better reliability", network_name);
                    }
                }
            }
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<std::path::PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("simple-dvt").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# SimpleDVT bindings configuration

# Network used when none is specified
default_network = "mainnet"

[networks.mainnet]
rpc_url = "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 1
module_address = "0xaE7B191A31f627b4eB1d4DaC64eab9976995b433"
explorer_url = "https://etherscan.io"

[networks.mainnet.gas]
default_gas_limit = 500000
max_gas_price = 50_000_000_000  # 50 Gwei
priority_fee = 2_000_000_000    # 2 Gwei

[networks.holesky]
rpc_url = "https://eth-holesky.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 17000
module_address = "0x11a93807078f8BB880c1BD0ee4C387537de4b4b6"
explorer_url = "https://holesky.etherscan.io"

[networks.holesky.gas]
default_gas_limit = 500000
max_gas_price = 20_000_000_000  # 20 Gwei
priority_fee = 1_000_000_000    # 1 Gwei

[security]
allow_write_operations = false
# max_transaction_value = "1000000000000000000"  # 1 ETH in wei

# Environment variables that can be used:
# SIMPLE_DVT_RPC_URL - RPC endpoint for the default network
# ALCHEMY_API_KEY - Your Alchemy API key (replaces YOUR_API_KEY_HERE above)
"#;
        sample_config.to_string()
    }
}
