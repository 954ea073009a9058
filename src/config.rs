//! Bridge and connection configuration
//!
//! [`BridgeConfig`] holds the tunables shared by every bridger and tracker
//! (polling, log scanning, gas estimate margins). [`ConnectionConfig`] holds
//! the endpoints and keys needed to build chain clients.

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Tunables for polling and fee estimation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BridgeConfig {
    /// First polling delay
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Polling delay ceiling
    #[serde(default = "default_max_poll_interval")]
    pub max_poll_interval_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Largest block span requested in a single eth_getLogs call
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
    /// How long to wait for a submitted transaction to be mined
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_ms: u64,
    /// Margin added on top of the estimated submission fee, in percent
    #[serde(default = "default_submission_fee_percent_increase")]
    pub submission_fee_percent_increase: u64,
    /// Margin added on top of the child gas price, in percent
    #[serde(default = "default_max_fee_per_gas_percent_increase")]
    pub max_fee_per_gas_percent_increase: u64,
    /// Margin added on top of the estimated retryable gas limit, in percent
    #[serde(default)]
    pub gas_limit_percent_increase: u64,
    /// Floor for estimated retryable gas limits
    #[serde(default)]
    pub min_gas_limit: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_poll_interval() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_block_range() -> u64 {
    5_000
}

fn default_receipt_timeout() -> u64 {
    300_000
}

fn default_submission_fee_percent_increase() -> u64 {
    300
}

fn default_max_fee_per_gas_percent_increase() -> u64 {
    200
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_poll_interval_ms: default_max_poll_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            max_block_range: default_max_block_range(),
            receipt_timeout_ms: default_receipt_timeout(),
            submission_fee_percent_increase: default_submission_fee_percent_increase(),
            max_fee_per_gas_percent_increase: default_max_fee_per_gas_percent_increase(),
            gas_limit_percent_increase: 0,
            min_gas_limit: 0,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

impl BridgeConfig {
    /// Load from `BRIDGE_*` environment variables, defaulting anything unset
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            poll_interval_ms: parse_or(&lookup, "BRIDGE_POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            max_poll_interval_ms: parse_or(
                &lookup,
                "BRIDGE_MAX_POLL_INTERVAL_MS",
                defaults.max_poll_interval_ms,
            )?,
            backoff_multiplier: parse_or(
                &lookup,
                "BRIDGE_BACKOFF_MULTIPLIER",
                defaults.backoff_multiplier,
            )?,
            max_block_range: parse_or(&lookup, "BRIDGE_MAX_BLOCK_RANGE", defaults.max_block_range)?,
            receipt_timeout_ms: parse_or(
                &lookup,
                "BRIDGE_RECEIPT_TIMEOUT_MS",
                defaults.receipt_timeout_ms,
            )?,
            submission_fee_percent_increase: parse_or(
                &lookup,
                "BRIDGE_SUBMISSION_FEE_PERCENT_INCREASE",
                defaults.submission_fee_percent_increase,
            )?,
            max_fee_per_gas_percent_increase: parse_or(
                &lookup,
                "BRIDGE_MAX_FEE_PER_GAS_PERCENT_INCREASE",
                defaults.max_fee_per_gas_percent_increase,
            )?,
            gas_limit_percent_increase: parse_or(
                &lookup,
                "BRIDGE_GAS_LIMIT_PERCENT_INCREASE",
                defaults.gas_limit_percent_increase,
            )?,
            min_gas_limit: parse_or(&lookup, "BRIDGE_MIN_GAS_LIMIT", defaults.min_gas_limit)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(eyre!("poll_interval_ms must be greater than zero"));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(eyre!(
                "max_poll_interval_ms ({}) must be at least poll_interval_ms ({})",
                self.max_poll_interval_ms,
                self.poll_interval_ms
            ));
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(eyre!("backoff_multiplier must be >= 1.0"));
        }
        if self.max_block_range == 0 {
            return Err(eyre!("max_block_range must be greater than zero"));
        }
        Ok(())
    }
}

/// Endpoints and keys for one parent/child pair
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    pub parent_rpc_url: String,
    pub child_rpc_url: String,
    pub child_chain_id: u64,
    #[serde(default)]
    pub parent_private_key: Option<String>,
    #[serde(default)]
    pub child_private_key: Option<String>,
}

/// Custom Debug that redacts private keys to prevent accidental log leakage.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "<redacted>");
        f.debug_struct("ConnectionConfig")
            .field("parent_rpc_url", &self.parent_rpc_url)
            .field("child_rpc_url", &self.child_rpc_url)
            .field("child_chain_id", &self.child_chain_id)
            .field("parent_private_key", &redact(&self.parent_private_key))
            .field("child_private_key", &redact(&self.child_private_key))
            .finish()
    }
}

impl ConnectionConfig {
    /// Load from `PARENT_RPC_URL`, `CHILD_RPC_URL`, `CHILD_CHAIN_ID` and the
    /// optional `PARENT_PRIVATE_KEY` / `CHILD_PRIVATE_KEY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            parent_rpc_url: lookup("PARENT_RPC_URL")
                .ok_or_else(|| eyre!("PARENT_RPC_URL environment variable is required"))?,
            child_rpc_url: lookup("CHILD_RPC_URL")
                .ok_or_else(|| eyre!("CHILD_RPC_URL environment variable is required"))?,
            child_chain_id: lookup("CHILD_CHAIN_ID")
                .ok_or_else(|| eyre!("CHILD_CHAIN_ID environment variable is required"))?
                .trim()
                .parse()
                .wrap_err("CHILD_CHAIN_ID must be a valid u64")?,
            parent_private_key: lookup("PARENT_PRIVATE_KEY").filter(|k| !k.is_empty()),
            child_private_key: lookup("CHILD_PRIVATE_KEY").filter(|k| !k.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_rpc_url(&self.parent_rpc_url, "PARENT_RPC_URL")?;
        validate_rpc_url(&self.child_rpc_url, "CHILD_RPC_URL")?;

        for (name, key) in [
            ("PARENT_PRIVATE_KEY", &self.parent_private_key),
            ("CHILD_PRIVATE_KEY", &self.child_private_key),
        ] {
            if let Some(key) = key {
                let hex_part = key.strip_prefix("0x").unwrap_or(key);
                if hex_part.len() != 64 || hex::decode(hex_part).is_err() {
                    return Err(eyre!("{} must be 32 bytes of hex (64 chars, 0x optional)", name));
                }
            }
        }
        Ok(())
    }
}

/// Validate that an RPC URL is well-formed http(s)
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} must have a host component", name));
    }

    if scheme == "http" {
        tracing::debug!("{} uses unencrypted http://", name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "0xb6b15c8cb491557369f3c7d2c287b053eb229daa9c22138887752191c9520659";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_bridge_config_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.submission_fee_percent_increase, 300);
        assert_eq!(config.max_fee_per_gas_percent_increase, 200);
        assert_eq!(config.gas_limit_percent_increase, 0);
        assert_eq!(config.min_gas_limit, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bridge_config_deserialize_empty() {
        let config: BridgeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_bridge_config_from_lookup() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("BRIDGE_POLL_INTERVAL_MS", "250"),
            ("BRIDGE_MIN_GAS_LIMIT", "120000"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.min_gas_limit, 120_000);
        assert_eq!(config.max_block_range, 5_000);
    }

    #[test]
    fn test_bridge_config_rejects_garbage() {
        assert!(BridgeConfig::from_lookup(lookup(&[("BRIDGE_MAX_BLOCK_RANGE", "lots")])).is_err());
        assert!(BridgeConfig::from_lookup(lookup(&[("BRIDGE_MAX_BLOCK_RANGE", "0")])).is_err());
        assert!(
            BridgeConfig::from_lookup(lookup(&[("BRIDGE_BACKOFF_MULTIPLIER", "0.5")])).is_err()
        );
    }

    #[test]
    fn test_connection_config_from_lookup() {
        let config = ConnectionConfig::from_lookup(lookup(&[
            ("PARENT_RPC_URL", "http://localhost:8545"),
            ("CHILD_RPC_URL", "http://localhost:8547"),
            ("CHILD_CHAIN_ID", "412346"),
            ("PARENT_PRIVATE_KEY", KEY),
        ]))
        .unwrap();
        assert_eq!(config.child_chain_id, 412346);
        assert!(config.child_private_key.is_none());
    }

    #[test]
    fn test_connection_config_requires_urls() {
        let err = ConnectionConfig::from_lookup(lookup(&[("CHILD_CHAIN_ID", "1")])).unwrap_err();
        assert!(err.to_string().contains("PARENT_RPC_URL"));
    }

    #[test]
    fn test_connection_config_rejects_bad_key() {
        let result = ConnectionConfig::from_lookup(lookup(&[
            ("PARENT_RPC_URL", "http://localhost:8545"),
            ("CHILD_RPC_URL", "http://localhost:8547"),
            ("CHILD_CHAIN_ID", "412346"),
            ("CHILD_PRIVATE_KEY", "0x1234"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = ConnectionConfig {
            parent_rpc_url: "http://localhost:8545".into(),
            child_rpc_url: "http://localhost:8547".into(),
            child_chain_id: 412346,
            parent_private_key: Some(KEY.into()),
            child_private_key: None,
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("b6b15c8c"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_validate_rpc_url() {
        assert!(validate_rpc_url("https://rpc.example.com", "X").is_ok());
        assert!(validate_rpc_url("ws://rpc.example.com", "X").is_err());
        assert!(validate_rpc_url("not a url", "X").is_err());
    }
}
