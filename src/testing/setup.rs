//! Integration test setup
//!
//! Builds every bridger from environment variables:
//!
//! - `PARENT_RPC_URL`, `CHILD_RPC_URL`, `CHILD_CHAIN_ID`
//! - `PARENT_PRIVATE_KEY`, `CHILD_PRIVATE_KEY` (both required here)
//! - `CUSTOM_NETWORKS_FILE` (optional JSON with `customL1Network`/`customL2Network`)
//! - `BRIDGE_*` tuning variables, see [`BridgeConfig::from_env`]
//!
//! The local Nitro dev pair (1337/412346) is registered automatically when the
//! child chain id points at it and no custom file is given.

use std::sync::Arc;

use eyre::{eyre, Result, WrapErr};
use tracing::info;

use crate::bridger::{AdminErc20Bridger, BridgeContext, Erc20Bridger, EthBridger};
use crate::config::{BridgeConfig, ConnectionConfig};
use crate::evm::client::{connect_with_signer, ChainProvider};
use crate::inbox::InboxForcer;
use crate::networks::{default_local_networks, NetworkPair, NetworkRegistry};

/// Everything an integration test needs
pub struct TestBridge<PP, CP> {
    pub network: Arc<NetworkPair>,
    pub context: BridgeContext<PP, CP>,
    pub eth_bridger: EthBridger<PP, CP>,
    pub erc20_bridger: Erc20Bridger<PP, CP>,
    pub admin_erc20_bridger: AdminErc20Bridger<PP, CP>,
    pub inbox_forcer: InboxForcer<PP>,
}

/// Registry for the configured child chain
pub fn registry_from_env(child_chain_id: u64) -> Result<NetworkRegistry> {
    let mut registry = NetworkRegistry::with_defaults();

    if let Ok(path) = std::env::var("CUSTOM_NETWORKS_FILE") {
        let json = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read {}", path))?;
        registry
            .add_custom_networks_json(&json)
            .wrap_err("Invalid custom networks file")?;
    } else if child_chain_id == default_local_networks().1.chain_id
        && registry.l2_network(child_chain_id).is_err()
    {
        registry.add_default_local_network()?;
    }

    Ok(registry)
}

/// Connect to both chains and build every bridger
pub fn instantiate_bridge() -> Result<TestBridge<impl ChainProvider, impl ChainProvider>> {
    let connection = ConnectionConfig::from_env()?;
    let config = BridgeConfig::from_env()?;

    let parent_key = connection
        .parent_private_key
        .as_deref()
        .ok_or_else(|| eyre!("need PARENT_PRIVATE_KEY var"))?;
    let child_key = connection
        .child_private_key
        .as_deref()
        .ok_or_else(|| eyre!("need CHILD_PRIVATE_KEY var"))?;

    let registry = registry_from_env(connection.child_chain_id)?;
    let network = Arc::new(registry.network_pair(connection.child_chain_id)?);

    let parent = connect_with_signer(&connection.parent_rpc_url, network.parent.chain_id, parent_key)?;
    let child = connect_with_signer(&connection.child_rpc_url, network.child.chain_id, child_key)?;

    info!(
        parent_chain = network.parent.chain_id,
        child_chain = network.child.chain_id,
        signer = ?parent.signer_address().ok(),
        "Bridge instantiated"
    );

    let context = BridgeContext::new(network.clone(), parent.clone(), child, config.clone())?;
    Ok(TestBridge {
        eth_bridger: EthBridger::new(context.clone()),
        erc20_bridger: Erc20Bridger::new(context.clone()),
        admin_erc20_bridger: AdminErc20Bridger::new(context.clone()),
        inbox_forcer: InboxForcer::new(parent, network.clone(), &config),
        network,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_registry() {
        let registry = registry_from_env(412346).unwrap();
        let pair = registry.network_pair(412346).unwrap();
        assert_eq!(pair.parent.chain_id, 1337);
    }
}
