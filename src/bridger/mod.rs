//! Asset Bridgers
//!
//! Build and submit the paired parent/child transactions that move assets
//! across the rollup:
//!
//! - [`EthBridger`] - native currency deposits and withdrawals
//! - [`Erc20Bridger`] - token deposits and withdrawals through the gateway router
//! - [`AdminErc20Bridger`] - custom token registration and router administration
//!
//! Every bridger shares a [`BridgeContext`]: the validated network pair, one
//! client per chain, the fee estimator and the polling schedule.

pub mod admin;
pub mod erc20;
pub mod eth;
pub mod gateway;

pub use admin::{AdminErc20Bridger, RegisterCustomTokenResult, SetGatewaysResult};
pub use erc20::{
    Erc20Bridger, Erc20DepositParams, Erc20DepositResult, Erc20WithdrawParams, Erc20WithdrawResult,
};
pub use eth::{EthBridger, EthDepositResult, EthDepositToResult, EthWithdrawResult};
pub use gateway::{classify_gateway, GatewayResolver, KnownGateway};

use std::sync::Arc;
use std::time::Duration;

use alloy::{
    primitives::{B256, U256},
    rpc::types::TransactionReceipt,
};
use tracing::info;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::gas::GasEstimator;
use crate::message::parent_receipt::{ParentToChildMessage, ParentTransactionReceipt};
use crate::message::ticket::RetryableTicket;
use crate::message::tracker::{ChainStatusSource, MessageStatusTracker};
use crate::networks::NetworkPair;
use crate::poll::{CancelToken, PollConfig};

/// Shared state of every bridger
#[derive(Debug, Clone)]
pub struct BridgeContext<PP, CP> {
    pub network: Arc<NetworkPair>,
    pub parent: ChainClient<PP>,
    pub child: ChainClient<CP>,
    pub config: BridgeConfig,
    pub gas: GasEstimator,
    pub poll: PollConfig,
}

impl<PP: ChainProvider, CP: ChainProvider> BridgeContext<PP, CP> {
    /// Bind two clients to a network pair
    ///
    /// Fails when a client's chain id is not the one the pair expects.
    pub fn new(
        network: Arc<NetworkPair>,
        parent: ChainClient<PP>,
        child: ChainClient<CP>,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        if parent.chain_id() != network.parent.chain_id {
            return Err(BridgeError::InvalidConfig(format!(
                "parent client serves chain {}, network pair expects {}",
                parent.chain_id(),
                network.parent.chain_id
            )));
        }
        if child.chain_id() != network.child.chain_id {
            return Err(BridgeError::InvalidConfig(format!(
                "child client serves chain {}, network pair expects {}",
                child.chain_id(),
                network.child.chain_id
            )));
        }

        Ok(Self {
            gas: GasEstimator::new(&config),
            poll: PollConfig::from_bridge_config(&config),
            network,
            parent,
            child,
            config,
        })
    }

    /// Ask both nodes which chain they serve
    pub async fn verify_chains(&self) -> Result<(), BridgeError> {
        tokio::try_join!(self.parent.verify_chain_id(), self.child.verify_chain_id())?;
        Ok(())
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.config.receipt_timeout_ms)
    }

    pub fn deposit_timeout(&self) -> Duration {
        Duration::from_millis(self.network.child.deposit_timeout)
    }

    pub fn tracker(&self) -> MessageStatusTracker<ChainStatusSource<ChainClient<CP>>> {
        MessageStatusTracker::new(self.child.clone(), &self.config, &self.network.chain_pair())
    }

    /// Handle for a ticket known by id
    pub fn ticket(&self, ticket_id: B256) -> RetryableTicket<CP> {
        RetryableTicket::new(
            ticket_id,
            self.child.clone(),
            &self.config,
            &self.network.chain_pair(),
        )
    }

    /// Handle for a discovered ticket
    pub fn ticket_for(&self, message: &ParentToChildMessage) -> RetryableTicket<CP> {
        RetryableTicket::from_message(
            message,
            self.child.clone(),
            &self.config,
            &self.network.chain_pair(),
        )
    }

    /// Retryable tickets created by a parent-chain transaction
    pub fn parent_to_child_messages(
        &self,
        receipt: &TransactionReceipt,
    ) -> Result<Vec<ParentToChildMessage>, BridgeError> {
        ParentTransactionReceipt::new(receipt.clone()).parent_to_child_messages(&self.network)
    }

    /// Wait for a parent-chain transaction, rejecting reverts
    ///
    /// Bounded by the receipt timeout; a dropped transaction ends in
    /// [`BridgeError::MessageTimeout`] instead of waiting forever.
    pub async fn confirm_parent(
        &self,
        tx_hash: B256,
        what: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        let receipt = self
            .parent
            .wait_for_receipt(tx_hash, &self.poll, self.receipt_timeout(), cancel)
            .await?;
        check_receipt(receipt, what)
    }

    /// Wait for a child-chain transaction, rejecting reverts
    pub async fn confirm_child(
        &self,
        tx_hash: B256,
        what: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        let receipt = self
            .child
            .wait_for_receipt(tx_hash, &self.poll, self.receipt_timeout(), cancel)
            .await?;
        check_receipt(receipt, what)
    }

    /// Fail early when the parent-chain signer cannot pay `required`
    pub(crate) async fn ensure_parent_funds(&self, required: U256) -> Result<(), BridgeError> {
        let signer = self.parent.signer_address()?;
        let available = self.parent.balance(signer).await?;
        ensure_covers(required, available)
    }

    /// Fail early when the child-chain signer cannot pay `required`
    pub(crate) async fn ensure_child_funds(&self, required: U256) -> Result<(), BridgeError> {
        let signer = self.child.signer_address()?;
        let available = self.child.balance(signer).await?;
        ensure_covers(required, available)
    }
}

pub(crate) fn ensure_covers(required: U256, available: U256) -> Result<(), BridgeError> {
    if available < required {
        return Err(BridgeError::InsufficientFunds {
            required,
            available,
        });
    }
    Ok(())
}

/// Turn a mined receipt into a result, rejecting reverted transactions
pub(crate) fn check_receipt(
    receipt: TransactionReceipt,
    what: &str,
) -> Result<TransactionReceipt, BridgeError> {
    if !receipt.status() {
        return Err(BridgeError::TransactionReverted(receipt.transaction_hash));
    }
    info!(
        tx_hash = %receipt.transaction_hash,
        block = ?receipt.block_number,
        gas_used = receipt.gas_used,
        "{} confirmed",
        what
    );
    Ok(receipt)
}
