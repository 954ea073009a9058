//! ERC20 Token Helpers
//!
//! Balance, allowance and metadata reads plus the approve transaction used
//! before gateway deposits.

use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::ERC20;
use crate::poll::{CancelToken, PollConfig};
use alloy::{
    primitives::{
        utils::{format_units, parse_units},
        Address, U256,
    },
    rpc::types::TransactionReceipt,
};
use std::time::Duration;
use tracing::info;

/// Get the ERC20 token balance of an address
pub async fn token_balance<P: ChainProvider>(
    client: &ChainClient<P>,
    token_address: Address,
    account: Address,
) -> Result<U256, BridgeError> {
    let contract = ERC20::new(token_address, client.provider());
    Ok(contract.balanceOf(account).call().await?._0)
}

/// Get the ERC20 token allowance
pub async fn token_allowance<P: ChainProvider>(
    client: &ChainClient<P>,
    token_address: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, BridgeError> {
    let contract = ERC20::new(token_address, client.provider());
    Ok(contract.allowance(owner, spender).call().await?._0)
}

/// Approve `spender` to pull `amount` of the signer's tokens
///
/// The receipt wait follows `poll` and gives up after `timeout`.
pub async fn approve<P: ChainProvider>(
    client: &ChainClient<P>,
    token_address: Address,
    spender: Address,
    amount: U256,
    poll: &PollConfig,
    timeout: Duration,
    cancel: Option<&CancelToken>,
) -> Result<TransactionReceipt, BridgeError> {
    let owner = client.signer_address()?;
    let contract = ERC20::new(token_address, client.provider());

    let pending = contract.approve(spender, amount).from(owner).send().await?;
    let receipt = client
        .wait_for_receipt(*pending.tx_hash(), poll, timeout, cancel)
        .await?;

    if !receipt.status() {
        return Err(BridgeError::TransactionReverted(receipt.transaction_hash));
    }

    info!(
        token = %token_address,
        spender = %spender,
        amount = %amount,
        tx_hash = %receipt.transaction_hash,
        "Token approval confirmed"
    );
    Ok(receipt)
}

/// Token info helper struct
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Get complete token info
pub async fn token_info<P: ChainProvider>(
    client: &ChainClient<P>,
    token_address: Address,
) -> Result<TokenInfo, BridgeError> {
    let contract = ERC20::new(token_address, client.provider());

    let (name, symbol, decimals) = tokio::try_join!(
        async { contract.name().call().await.map(|r| r._0) },
        async { contract.symbol().call().await.map(|r| r._0) },
        async { contract.decimals().call().await.map(|r| r._0) }
    )?;

    Ok(TokenInfo {
        address: token_address,
        name,
        symbol,
        decimals,
    })
}

/// Convert a human-readable amount ("1.5") to raw token units
pub fn to_token_units(amount: &str, decimals: u8) -> Result<U256, BridgeError> {
    parse_units(amount, decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| BridgeError::Decode(format!("token amount {:?}: {}", amount, e)))
}

/// Convert raw token units to a human-readable amount
pub fn from_token_units(raw: U256, decimals: u8) -> Result<String, BridgeError> {
    format_units(raw, decimals).map_err(|e| BridgeError::Decode(format!("token amount: {}", e)))
}
