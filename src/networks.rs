//! Parent/child network registry
//!
//! Holds the contract addresses of every known parent chain (L1) and rollup
//! child chain (L2). The registry is built up front, optionally extended with
//! custom networks, and then shared read-only by the bridgers.
//!
//! A child chain is only usable when both sides agree on the pairing: the L2
//! names the L1 as its partner and the L1 lists the L2 among its partners.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::env;
use tracing::{debug, info};

use crate::error::BridgeError;

/// Default lifetime of a retryable ticket before it expires
pub const SEVEN_DAYS_IN_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Contract addresses may be configured as "" when not deployed yet
fn empty_as_zero<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(Address::ZERO);
    }
    raw.trim().parse().map_err(serde::de::Error::custom)
}

/// Token bridge contracts on both sides of a pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBridge {
    #[serde(deserialize_with = "empty_as_zero")]
    pub l1_gateway_router: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l2_gateway_router: Address,
    #[serde(rename = "l1ERC20Gateway", deserialize_with = "empty_as_zero")]
    pub l1_erc20_gateway: Address,
    #[serde(rename = "l2ERC20Gateway", deserialize_with = "empty_as_zero")]
    pub l2_erc20_gateway: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l1_custom_gateway: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l2_custom_gateway: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l1_weth_gateway: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l2_weth_gateway: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l2_weth: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l1_weth: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l1_proxy_admin: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub l2_proxy_admin: Address,
    #[serde(rename = "l1MultiCall", deserialize_with = "empty_as_zero")]
    pub l1_multicall: Address,
    #[serde(rename = "l2Multicall", deserialize_with = "empty_as_zero")]
    pub l2_multicall: Address,
}

impl TokenBridge {
    /// Whether the gateway router has been deployed for this pair
    pub fn is_deployed(&self) -> bool {
        !self.l1_gateway_router.is_zero() && !self.l2_gateway_router.is_zero()
    }
}

/// Core rollup contracts on the parent chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBridge {
    #[serde(deserialize_with = "empty_as_zero")]
    pub bridge: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub inbox: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub sequencer_inbox: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub outbox: Address,
    #[serde(deserialize_with = "empty_as_zero")]
    pub rollup: Address,
}

impl EthBridge {
    pub fn is_deployed(&self) -> bool {
        !self.bridge.is_zero() && !self.inbox.is_zero()
    }
}

/// A parent chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Network {
    #[serde(rename = "chainID")]
    pub chain_id: u64,
    pub name: String,
    #[serde(default)]
    pub explorer_url: String,
    #[serde(default)]
    pub rpc_url: String,
    #[serde(rename = "partnerChainIDs")]
    pub partner_chain_ids: Vec<u64>,
    /// Seconds
    pub block_time: u64,
    pub is_custom: bool,
}

/// A rollup child chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Network {
    #[serde(rename = "chainID")]
    pub chain_id: u64,
    pub name: String,
    #[serde(default)]
    pub explorer_url: String,
    #[serde(default)]
    pub rpc_url: String,
    pub token_bridge: TokenBridge,
    pub eth_bridge: EthBridge,
    #[serde(rename = "partnerChainID")]
    pub partner_chain_id: u64,
    pub is_custom: bool,
    pub confirm_period_blocks: u64,
    #[serde(default = "default_retryable_lifetime")]
    pub retryable_lifetime_seconds: u64,
    #[serde(default)]
    pub nitro_genesis_block: u64,
    #[serde(default, rename = "nitroGenesisL1Block")]
    pub nitro_genesis_l1_block: u64,
    /// How long to wait (ms) for a deposit to arrive on the child chain
    pub deposit_timeout: u64,
}

fn default_retryable_lifetime() -> u64 {
    SEVEN_DAYS_IN_SECONDS
}

/// Timing parameters of a mutually consistent parent/child pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPair {
    pub parent_chain_id: u64,
    pub child_chain_id: u64,
    pub confirm_period_blocks: u64,
    pub retryable_lifetime_seconds: u64,
    pub deposit_timeout_ms: u64,
}

/// Both network descriptions of a validated pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPair {
    pub parent: L1Network,
    pub child: L2Network,
}

impl NetworkPair {
    pub fn chain_pair(&self) -> ChainPair {
        ChainPair {
            parent_chain_id: self.parent.chain_id,
            child_chain_id: self.child.chain_id,
            confirm_period_blocks: self.child.confirm_period_blocks,
            retryable_lifetime_seconds: self.child.retryable_lifetime_seconds,
            deposit_timeout_ms: self.child.deposit_timeout,
        }
    }

    pub fn eth_bridge(&self) -> &EthBridge {
        &self.child.eth_bridge
    }

    pub fn token_bridge(&self) -> &TokenBridge {
        &self.child.token_bridge
    }
}

/// Custom networks as loaded from JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNetworks {
    #[serde(default)]
    pub custom_l1_network: Option<L1Network>,
    pub custom_l2_network: L2Network,
}

/// Registry of known parent and child networks
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    l1_networks: BTreeMap<u64, L1Network>,
    l2_networks: BTreeMap<u64, L2Network>,
}

impl NetworkRegistry {
    /// A registry with no networks at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in production and test networks
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for network in default_l1_networks() {
            registry.l1_networks.insert(network.chain_id, network);
        }
        for network in default_l2_networks() {
            registry.l2_networks.insert(network.chain_id, network);
        }
        registry
    }

    pub fn l1_network(&self, chain_id: u64) -> Result<&L1Network, BridgeError> {
        self.l1_networks
            .get(&chain_id)
            .ok_or(BridgeError::UnknownNetwork(chain_id))
    }

    pub fn l2_network(&self, chain_id: u64) -> Result<&L2Network, BridgeError> {
        self.l2_networks
            .get(&chain_id)
            .ok_or(BridgeError::UnknownNetwork(chain_id))
    }

    pub fn l1_networks(&self) -> impl Iterator<Item = &L1Network> {
        self.l1_networks.values()
    }

    pub fn l2_networks(&self) -> impl Iterator<Item = &L2Network> {
        self.l2_networks.values()
    }

    /// Resolve a child chain and its parent, checking both agree on the pairing
    pub fn network_pair(&self, child_chain_id: u64) -> Result<NetworkPair, BridgeError> {
        let child = self.l2_network(child_chain_id)?;
        let parent = self.l1_network(child.partner_chain_id)?;

        if !parent.partner_chain_ids.contains(&child_chain_id) {
            return Err(BridgeError::ChainPairMismatch {
                child: child_chain_id,
                declared_parent: child.partner_chain_id,
            });
        }

        Ok(NetworkPair {
            parent: parent.clone(),
            child: child.clone(),
        })
    }

    /// Timing parameters for a child chain
    pub fn lookup(&self, child_chain_id: u64) -> Result<ChainPair, BridgeError> {
        self.network_pair(child_chain_id).map(|pair| pair.chain_pair())
    }

    /// Register a custom child network, and optionally its custom parent
    ///
    /// Nothing is inserted unless every check passes.
    pub fn add_custom_network(
        &mut self,
        custom_l1_network: Option<L1Network>,
        custom_l2_network: L2Network,
    ) -> Result<(), BridgeError> {
        if let Some(l1) = &custom_l1_network {
            if self.l1_networks.contains_key(&l1.chain_id) {
                return Err(BridgeError::NetworkAlreadyRegistered(l1.chain_id));
            }
            if !l1.is_custom {
                return Err(BridgeError::NotCustomNetwork(l1.chain_id));
            }
        }

        let l2_id = custom_l2_network.chain_id;
        if self.l2_networks.contains_key(&l2_id) {
            return Err(BridgeError::NetworkAlreadyRegistered(l2_id));
        }
        if !custom_l2_network.is_custom {
            return Err(BridgeError::NotCustomNetwork(l2_id));
        }

        let partner = custom_l2_network.partner_chain_id;
        match custom_l1_network {
            // A custom pair must name each other on both sides
            Some(l1) => {
                if l1.chain_id != partner || !l1.partner_chain_ids.contains(&l2_id) {
                    return Err(BridgeError::ChainPairMismatch {
                        child: l2_id,
                        declared_parent: partner,
                    });
                }
                info!(chain_id = l1.chain_id, name = %l1.name, "Registered custom parent network");
                self.l1_networks.insert(l1.chain_id, l1);
            }
            None => {
                let parent = self
                    .l1_networks
                    .get_mut(&partner)
                    .ok_or(BridgeError::UnknownNetwork(partner))?;
                if !parent.partner_chain_ids.contains(&l2_id) {
                    parent.partner_chain_ids.push(l2_id);
                }
            }
        }

        info!(
            chain_id = l2_id,
            partner_chain_id = partner,
            name = %custom_l2_network.name,
            "Registered custom child network"
        );
        self.l2_networks.insert(l2_id, custom_l2_network);
        Ok(())
    }

    /// Register custom networks described as JSON
    ///
    /// Expects `{"customL1Network": {...}?, "customL2Network": {...}}` with the
    /// camelCase field names used by network config files.
    pub fn add_custom_networks_json(&mut self, json: &str) -> Result<(), BridgeError> {
        let networks: CustomNetworks = serde_json::from_str(json)
            .map_err(|e| BridgeError::InvalidConfig(format!("custom network JSON: {}", e)))?;
        debug!(
            child_chain_id = networks.custom_l2_network.chain_id,
            "Parsed custom network JSON"
        );
        self.add_custom_network(networks.custom_l1_network, networks.custom_l2_network)
    }

    /// Register the networks created by a Nitro local dev node
    pub fn add_default_local_network(&mut self) -> Result<NetworkPair, BridgeError> {
        let (l1, l2) = default_local_networks();
        let child_id = l2.chain_id;
        self.add_custom_network(Some(l1), l2)?;
        self.network_pair(child_id)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn default_l1_networks() -> Vec<L1Network> {
    vec![
        L1Network {
            chain_id: 1,
            name: "Mainnet".into(),
            explorer_url: "https://etherscan.io".into(),
            rpc_url: env_or("L1_MAINNET_RPC_URL", "https://rpc.ankr.com/eth"),
            partner_chain_ids: vec![620],
            block_time: 14,
            is_custom: false,
        },
        L1Network {
            chain_id: 11155111,
            name: "Sepolia".into(),
            explorer_url: "https://sepolia.etherscan.io".into(),
            rpc_url: env_or("L1_SEPOLIA_RPC_URL", "https://rpc.sepolia.org"),
            partner_chain_ids: vec![621],
            block_time: 12,
            is_custom: false,
        },
        L1Network {
            chain_id: 56,
            name: "Binance Smart Chain".into(),
            explorer_url: "https://bscscan.com".into(),
            rpc_url: env_or("L1_BSC_MAINNET_RPC_URL", "https://bsc-dataseed1.binance.org"),
            partner_chain_ids: vec![630],
            block_time: 3,
            is_custom: false,
        },
        L1Network {
            chain_id: 97,
            name: "Binance Smart Chain Testnet".into(),
            explorer_url: "https://testnet.bscscan.com".into(),
            rpc_url: env_or(
                "L1_BSC_TESTNET_RPC_URL",
                "https://data-seed-prebsc-1-s1.binance.org:8545",
            ),
            partner_chain_ids: vec![631],
            block_time: 3,
            is_custom: false,
        },
    ]
}

fn ecoblock_l2(
    chain_id: u64,
    name: &str,
    partner_chain_id: u64,
    confirm_period_blocks: u64,
    eth_bridge: EthBridge,
    testnet: bool,
) -> L2Network {
    let (explorer, rpc_env) = if testnet {
        ("https://testnet.ecoscan.io", "L2_ECOBLOCK_TESTNET_RPC_URL")
    } else {
        ("https://ecoscan.io", "L2_ECOBLOCK_MAINNET_RPC_URL")
    };
    L2Network {
        chain_id,
        name: name.into(),
        explorer_url: explorer.into(),
        rpc_url: env_or(rpc_env, "https://rpc.ecoblock.tech"),
        // Token bridge not deployed yet on these chains
        token_bridge: TokenBridge::default(),
        eth_bridge,
        partner_chain_id,
        is_custom: false,
        confirm_period_blocks,
        retryable_lifetime_seconds: SEVEN_DAYS_IN_SECONDS,
        nitro_genesis_block: 0,
        nitro_genesis_l1_block: 0,
        deposit_timeout: 1_800_000,
    }
}

fn default_l2_networks() -> Vec<L2Network> {
    vec![
        ecoblock_l2(
            620,
            "EcoBlock Mainnet",
            1,
            45818,
            EthBridge {
                bridge: address!("7bebf467ecbfe4e70814e10622e20474216f6329"),
                inbox: address!("0a1a2b5e9e86f28ede54e1b3821496a61fcf06bc"),
                sequencer_inbox: address!("e66a9277357f695b312e3d90045853e8b4b25e1b"),
                outbox: address!("a8c62f6e47d4d3013f0daadc4a5b74b87f53f583"),
                rollup: address!("84fe05f541cee93d0b02e03cd4319c29ba0030a2"),
            },
            false,
        ),
        ecoblock_l2(
            621,
            "EcoBlock Sepolia Testnet",
            11155111,
            20,
            EthBridge {
                bridge: address!("043d53d7883f81c947963f11d25130b97061c22a"),
                inbox: address!("e44f80a5d59975e058b33cd62569b4ae2cbe30e1"),
                sequencer_inbox: address!("c5eca22b8f79a11bde3f304021b7e6abbf60f851"),
                outbox: address!("d7560ec4ec67350830222c616f590cb3efce2347"),
                rollup: address!("8da4f0c8e6ffb168a6e9ae75af2866a9d24ae30c"),
            },
            true,
        ),
        // Declares Mainnet (1) as partner while BSC (56) lists it; lookups fail
        // until the deployment settles.
        ecoblock_l2(630, "EcoBlock Mainnet", 1, 20, EthBridge::default(), false),
        ecoblock_l2(
            631,
            "EcoBlock Testnet",
            97,
            20,
            EthBridge {
                bridge: address!("ed16681b27f3239ef352f51fa5b03460b863c29f"),
                inbox: address!("812f40cc7b0fdaa7387de75368e175367e6fec56"),
                sequencer_inbox: address!("70f3117c714c9e09c53db431afd10360a6c17a56"),
                outbox: address!("04bf8e8aeb38139bd4ab88971ee44c0ddaa6cbe8"),
                rollup: address!("719adb12dbadc772b5160a5fbf32e398229c0939"),
            },
            true,
        ),
    ]
}

/// Networks matching a Nitro local dev node
pub fn default_local_networks() -> (L1Network, L2Network) {
    let l1 = L1Network {
        chain_id: 1337,
        name: "EthLocal".into(),
        explorer_url: String::new(),
        rpc_url: String::new(),
        partner_chain_ids: vec![412346],
        block_time: 10,
        is_custom: true,
    };

    let l2 = L2Network {
        chain_id: 412346,
        name: "ArbLocal".into(),
        explorer_url: String::new(),
        rpc_url: String::new(),
        token_bridge: TokenBridge {
            l1_gateway_router: address!("525c2aBA45F66987217323E8a05EA400C65D06DC"),
            l2_gateway_router: address!("1294b86822ff4976BfE136cB06CF43eC7FCF2574"),
            l1_erc20_gateway: address!("4A2bA922052bA54e29c5417bC979Daaf7D5Fe4f4"),
            l2_erc20_gateway: address!("e1080224B632A93951A7CFA33EeEa9Fd81558b5e"),
            l1_custom_gateway: address!("3DF948c956e14175f43670407d5796b95Bb219D8"),
            l2_custom_gateway: address!("525c2aBA45F66987217323E8a05EA400C65D06DC"),
            l1_weth_gateway: address!("F5FfD11A55AFD39377411Ab9856474D2a7Cb697e"),
            l2_weth_gateway: address!("4A2bA922052bA54e29c5417bC979Daaf7D5Fe4f4"),
            l2_weth: address!("408Da76E87511429485C32E4Ad647DD14823Fdc4"),
            l1_weth: address!("408Da76E87511429485C32E4Ad647DD14823Fdc4"),
            l1_proxy_admin: address!("e1080224B632A93951A7CFA33EeEa9Fd81558b5e"),
            l2_proxy_admin: address!("da52b25ddB0e3B9CC393b0690Ac62245Ac772527"),
            l1_multicall: address!("DB2D15a3EB70C347E0D2C2c7861cAFb946baAb48"),
            l2_multicall: address!("DB2D15a3EB70C347E0D2C2c7861cAFb946baAb48"),
        },
        eth_bridge: EthBridge {
            bridge: address!("2b360a9881f21c3d7aa0ea6ca0de2a3341d4ef3c"),
            inbox: address!("ff4a24b22f94979e9ba5f3eb35838aa814bad6f1"),
            sequencer_inbox: address!("e7362d0787b51d8c72d504803e5b1d6dcda89540"),
            outbox: address!("49940929c7cA9b50Ff57a01d3a92817A414E6B9B"),
            rollup: address!("65a59d67da8e710ef9a01eca37f83f84aedec416"),
        },
        partner_chain_id: 1337,
        is_custom: true,
        confirm_period_blocks: 20,
        retryable_lifetime_seconds: SEVEN_DAYS_IN_SECONDS,
        nitro_genesis_block: 0,
        nitro_genesis_l1_block: 0,
        deposit_timeout: 900_000,
    };

    (l1, l2)
}
