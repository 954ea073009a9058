//! Chain RPC client wrapper
//!
//! A [`ChainClient`] pairs an alloy provider with the chain id it is expected
//! to serve and, when it can sign, the signer address. Bridgers and trackers
//! are generic over the provider so read-only and signing clients share code.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256, U256, U64},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, Log, TransactionReceipt},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::poll::{poll_until, CancelToken, PollConfig};

/// Provider bound used throughout the crate
pub trait ChainProvider: Provider<Http<Client>> + Clone + Send + Sync + 'static {}

impl<P> ChainProvider for P where P: Provider<Http<Client>> + Clone + Send + Sync + 'static {}

/// Provider behind [`connect_read_only`]
pub type ReadOnlyProvider = RootProvider<Http<Client>>;

/// The header fields the bridge needs from a block
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub hash: B256,
    pub number: U64,
    pub timestamp: U64,
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
}

/// RPC client bound to one chain
#[derive(Clone)]
pub struct ChainClient<P> {
    provider: P,
    chain_id: u64,
    signer: Option<Address>,
}

impl<P> fmt::Debug for ChainClient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain_id)
            .field("signer", &self.signer)
            .finish()
    }
}

/// Create a read-only client
pub fn connect_read_only(
    rpc_url: &str,
    chain_id: u64,
) -> Result<ChainClient<ReadOnlyProvider>, BridgeError> {
    let url = rpc_url
        .parse()
        .map_err(|e| BridgeError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;
    let provider = ProviderBuilder::new().on_http(url);

    info!(rpc_url = %rpc_url, chain_id = chain_id, "Created read-only chain client");

    Ok(ChainClient::new(provider, chain_id, None))
}

/// Create a client that signs with a local private key
pub fn connect_with_signer(
    rpc_url: &str,
    chain_id: u64,
    private_key: &str,
) -> Result<ChainClient<impl ChainProvider>, BridgeError> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| BridgeError::InvalidConfig(format!("Invalid private key: {}", e)))?;
    let address = signer.address();
    let wallet = EthereumWallet::from(signer);

    let url = rpc_url
        .parse()
        .map_err(|e| BridgeError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;
    // Nonce, gas and chain id fillers are required for the wallet filler to sign
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(url);

    info!(
        rpc_url = %rpc_url,
        chain_id = chain_id,
        address = %address,
        "Created chain client with signer"
    );

    Ok(ChainClient::new(provider, chain_id, Some(address)))
}

impl<P: ChainProvider> ChainClient<P> {
    pub fn new(provider: P, chain_id: u64, signer: Option<Address>) -> Self {
        Self {
            provider,
            chain_id,
            signer,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Check if the client has a signer
    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Signer address, or [`BridgeError::MissingSigner`] for read-only clients
    pub fn signer_address(&self) -> Result<Address, BridgeError> {
        self.signer.ok_or(BridgeError::MissingSigner)
    }

    /// Fail unless the RPC serves the configured chain id
    pub async fn verify_chain_id(&self) -> Result<(), BridgeError> {
        let actual = self.provider.get_chain_id().await?;
        if actual != self.chain_id {
            return Err(BridgeError::InvalidConfig(format!(
                "RPC reports chain id {} but client is configured for {}",
                actual, self.chain_id
            )));
        }
        Ok(())
    }

    /// Get the current block number
    pub async fn block_number(&self) -> Result<u64, BridgeError> {
        Ok(self.provider.get_block_number().await?)
    }

    /// Get the ETH balance of an address
    pub async fn balance(&self, address: Address) -> Result<U256, BridgeError> {
        Ok(self.provider.get_balance(address).await?)
    }

    /// Current gas price
    pub async fn gas_price(&self) -> Result<U256, BridgeError> {
        Ok(U256::from(self.provider.get_gas_price().await?))
    }

    /// Header fields of a block, `None` for the latest block
    pub async fn block(&self, number: Option<u64>) -> Result<Option<BlockSummary>, BridgeError> {
        let tag = match number {
            Some(n) => format!("0x{:x}", n),
            None => "latest".to_string(),
        };
        let block: Option<BlockSummary> = self
            .provider
            .raw_request("eth_getBlockByNumber".into(), (tag, false))
            .await?;
        Ok(block)
    }

    /// Base fee of the latest block
    pub async fn base_fee(&self) -> Result<U256, BridgeError> {
        let block = self
            .block(None)
            .await?
            .ok_or_else(|| BridgeError::Decode("latest block".into()))?;
        block
            .base_fee_per_gas
            .ok_or_else(|| BridgeError::Decode("baseFeePerGas of latest block".into()))
    }

    pub async fn receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>, BridgeError> {
        Ok(self.provider.get_transaction_receipt(tx_hash).await?)
    }

    pub async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, BridgeError> {
        Ok(self.provider.get_logs(filter).await?)
    }

    /// Poll until a transaction is mined
    pub async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        poll: &PollConfig,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        debug!(tx_hash = %tx_hash, chain_id = self.chain_id, "Waiting for receipt");
        poll_until("transaction receipt", poll, timeout, cancel, || {
            self.receipt(tx_hash)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_client() {
        let client = connect_read_only("http://localhost:8545", 1337).unwrap();
        assert_eq!(client.chain_id(), 1337);
        assert!(!client.has_signer());
        assert!(matches!(
            client.signer_address(),
            Err(BridgeError::MissingSigner)
        ));
    }

    #[test]
    fn test_signer_client() {
        // Well-known dev account
        let client = connect_with_signer(
            "http://localhost:8545",
            1337,
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            client.signer_address().unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ac0974"));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(connect_read_only("not a url", 1).is_err());
        assert!(connect_with_signer("http://localhost:8545", 1, "0x1234").is_err());
    }

    #[test]
    fn test_block_summary_deserialize() {
        let json = r#"{
            "hash": "0x88e96d4537bea4d9c05d12549907b32561d3bf31f45aae734cdc119f13406cb6",
            "number": "0x1b4",
            "timestamp": "0x55ba467c",
            "baseFeePerGas": "0x7",
            "transactions": []
        }"#;
        let block: BlockSummary = serde_json::from_str(json).unwrap();
        assert_eq!(block.number.to::<u64>(), 436);
        assert_eq!(block.base_fee_per_gas, Some(U256::from(7u64)));
    }
}
