use alloy::{
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    // Check if all characters after 0x are valid hex
    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    // Parse using Alloy's Address type which handles checksumming
    Address::from_str(address)
        .map_err(|e| anyhow!("Invalid Ethereum address: '{}'. Error: {}", address, e))
}

/// Validates network name
pub fn validate_network(network: &str, available_networks: &[String]) -> Result<()> {
    if network.is_empty() {
        return Err(anyhow!("Network name cannot be empty"));
    }

    if !available_networks.contains(&network.to_string()) {
        return Err(anyhow!(
            "Unknown network: '{}'. Available networks: {}",
            network,
            available_networks.join(", ")
        ));
    }

    Ok(())
}

/// Validates function name
pub fn validate_function_name(function_name: &str) -> Result<()> {
    if function_name.is_empty() {
        return Err(anyhow!("Function name cannot be empty"));
    }

    if !function_name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    {
        return Err(anyhow!(
            "Invalid function name: '{}'. Function names must start with a letter or underscore",
            function_name
        ));
    }

    if !function_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(anyhow!(
            "Invalid function name: '{}'. Function names can only contain letters, numbers, and underscores",
            function_name
        ));
    }

    Ok(())
}

/// Parses a wei amount given in decimal or `0x`-prefixed hex.
pub fn validate_hex_value(value_str: &str) -> Result<U256> {
    let value_str = value_str.trim();
    if value_str.is_empty() {
        return Err(anyhow!("Value cannot be empty"));
    }

    let value = if let Some(hex_part) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        U256::from_str_radix(hex_part, 16)
            .map_err(|_| anyhow!("Invalid hexadecimal value: '{}'", value_str))?
    } else {
        U256::from_str_radix(value_str, 10).map_err(|_| {
            anyhow!(
                "Invalid numeric value: '{}'. Use decimal format or '0x' prefixed hex",
                value_str
            )
        })?
    };

    Ok(value)
}

/// Parses a hex private key, with or without `0x`, into a local signer.
pub fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner> {
    let private_key = private_key.trim();
    let private_key = private_key.strip_prefix("0x").unwrap_or(private_key);

    if private_key.is_empty() {
        return Err(anyhow!("Private key cannot be empty"));
    }

    PrivateKeySigner::from_str(private_key).map_err(|e| anyhow!("Invalid private key: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        // Valid addresses
        assert!(validate_address("0xaE7B191A31f627b4eB1d4DaC64eab9976995b433").is_ok());
        assert!(validate_address(" 0x11a93807078f8BB880c1BD0ee4C387537de4b4b6 ").is_ok());
        assert!(validate_address("0x0000000000000000000000000000000000000000").is_ok());

        // Invalid addresses
        assert!(validate_address("").is_err());
        assert!(validate_address("not_an_address").is_err());
        assert!(validate_address("0x123").is_err()); // Too short
        assert!(validate_address("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err()); // Missing 0x
        assert!(validate_address("0xgg2d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
        // Invalid hex
    }

    #[test]
    fn test_validate_network() {
        let networks = vec!["mainnet".to_string(), "holesky".to_string()];

        assert!(validate_network("mainnet", &networks).is_ok());
        assert!(validate_network("holesky", &networks).is_ok());
        assert!(validate_network("invalid", &networks).is_err());
        assert!(validate_network("", &networks).is_err());
    }

    #[test]
    fn test_validate_function_name() {
        assert!(validate_function_name("getNodeOperator").is_ok());
        assert!(validate_function_name("_internal").is_ok());
        assert!(validate_function_name("finalizeUpgrade_v4").is_ok());

        assert!(validate_function_name("").is_err());
        assert!(validate_function_name("123invalid").is_err());
        assert!(validate_function_name("invalid-name").is_err());
    }

    #[test]
    fn test_validate_hex_value() {
        assert_eq!(validate_hex_value("1000").unwrap(), U256::from(1000));
        assert_eq!(validate_hex_value("0x3e8").unwrap(), U256::from(1000));
        assert!(validate_hex_value("").is_err());
        assert!(validate_hex_value("-1").is_err());
        assert!(validate_hex_value("0xzz").is_err());
    }

    #[test]
    fn test_parse_private_key() {
        // Anvil's first development key.
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer = parse_private_key(key).unwrap();
        assert_eq!(
            signer.address(),
            validate_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
        assert_eq!(parse_private_key(&key[2..]).unwrap().address(), signer.address());

        assert!(parse_private_key("").is_err());
        assert!(parse_private_key("0x1234").is_err());
    }
}
