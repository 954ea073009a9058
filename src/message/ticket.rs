//! Retryable ticket handle
//!
//! Wraps a ticket id with the child-chain client needed to query and act on
//! it: status, manual redemption, lifetime extension and cancellation.

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, B256},
    rpc::types::TransactionReceipt,
    sol_types::SolCall,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::{ArbRetryableTx, ARB_RETRYABLE_TX_ADDRESS};
use crate::evm::events::redeem_scheduled;
use crate::message::parent_receipt::ParentToChildMessage;
use crate::message::retryable_data::RetryableTicketParams;
use crate::message::status::TicketState;
use crate::message::tracker::{ChainStatusSource, MessageStatusTracker};
use crate::networks::ChainPair;
use crate::poll::{CancelToken, PollConfig};
use crate::types::MessageStatus;

/// Optional gas settings for a manual redeem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemOverrides {
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
}

/// A retryable ticket on the child chain
pub struct RetryableTicket<CP> {
    ticket_id: B256,
    params: Option<RetryableTicketParams>,
    child: ChainClient<CP>,
    tracker: MessageStatusTracker<ChainStatusSource<ChainClient<CP>>>,
    poll: PollConfig,
    receipt_timeout: Duration,
}

impl<CP: ChainProvider> RetryableTicket<CP> {
    /// Handle for a ticket known only by its id
    pub fn new(
        ticket_id: B256,
        child: ChainClient<CP>,
        config: &BridgeConfig,
        chain_pair: &ChainPair,
    ) -> Self {
        Self {
            ticket_id,
            params: None,
            tracker: MessageStatusTracker::new(child.clone(), config, chain_pair),
            child,
            poll: PollConfig::from_bridge_config(config),
            receipt_timeout: Duration::from_millis(config.receipt_timeout_ms),
        }
    }

    /// Handle for a ticket discovered in a parent-chain receipt
    pub fn from_message(
        message: &ParentToChildMessage,
        child: ChainClient<CP>,
        config: &BridgeConfig,
        chain_pair: &ChainPair,
    ) -> Self {
        let mut ticket = Self::new(message.ticket_id, child, config, chain_pair);
        ticket.params = Some(message.params.clone());
        ticket
    }

    pub fn ticket_id(&self) -> B256 {
        self.ticket_id
    }

    pub fn params(&self) -> Option<&RetryableTicketParams> {
        self.params.as_ref()
    }

    pub fn tracker(&self) -> &MessageStatusTracker<ChainStatusSource<ChainClient<CP>>> {
        &self.tracker
    }

    pub async fn status(&self) -> Result<TicketState, BridgeError> {
        self.tracker.get_status(self.ticket_id).await
    }

    pub async fn wait_for_status(
        &self,
        targets: &[MessageStatus],
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<TicketState, BridgeError> {
        self.tracker
            .wait_for_status(self.ticket_id, targets, timeout, cancel)
            .await
    }

    /// Wait until the ticket exists on the child chain in any form
    pub async fn wait_for_creation(
        &self,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<TicketState, BridgeError> {
        self.tracker
            .wait_for_creation(self.ticket_id, timeout, cancel)
            .await
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        self.child
            .wait_for_receipt(tx_hash, &self.poll, self.receipt_timeout, cancel)
            .await
    }

    async fn ensure_redeemable(&self) -> Result<(), BridgeError> {
        let state = self.status().await?;
        redeemable(self.ticket_id, &state)
    }

    /// Gas needed to redeem the ticket now
    ///
    /// The status is re-checked first so a ticket that was redeemed or expired
    /// in the meantime fails with a protocol error instead of a revert.
    pub async fn estimate_redeem_gas(&self) -> Result<u64, BridgeError> {
        self.ensure_redeemable().await?;
        let signer = self.child.signer_address()?;
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.child.provider());
        Ok(precompile
            .redeem(self.ticket_id)
            .from(signer)
            .estimate_gas()
            .await?)
    }

    /// Send a single `redeem` transaction
    ///
    /// Never retried. A reverted retry is reported through the returned
    /// handle, not as an error.
    pub async fn redeem(
        &self,
        overrides: RedeemOverrides,
        cancel: Option<&CancelToken>,
    ) -> Result<RedeemHandle<CP>, BridgeError> {
        self.ensure_redeemable().await?;
        let signer = self.child.signer_address()?;
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.child.provider());

        let mut call = precompile.redeem(self.ticket_id).from(signer);
        if let Some(gas_limit) = overrides.gas_limit {
            call = call.gas(gas_limit);
        }
        if let Some(max_fee_per_gas) = overrides.max_fee_per_gas {
            call = call.max_fee_per_gas(max_fee_per_gas);
        }

        let pending = call.send().await?;
        let receipt = self.wait_for_receipt(*pending.tx_hash(), cancel).await?;
        if !receipt.status() {
            return Err(BridgeError::TransactionReverted(receipt.transaction_hash));
        }

        info!(
            ticket_id = %self.ticket_id,
            tx_hash = %receipt.transaction_hash,
            gas_limit = ?overrides.gas_limit,
            "Redeem transaction mined"
        );

        Ok(RedeemHandle {
            ticket_id: self.ticket_id,
            receipt,
            child: self.child.clone(),
            poll: self.poll.clone(),
            timeout: self.receipt_timeout,
        })
    }

    /// Unix timestamp after which the ticket expires
    pub async fn timeout(&self) -> Result<u64, BridgeError> {
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.child.provider());
        Ok(precompile
            .getTimeout(self.ticket_id)
            .call()
            .await?
            ._0
            .saturating_to())
    }

    /// Address allowed to cancel the ticket and receive its call value
    pub async fn beneficiary(&self) -> Result<Address, BridgeError> {
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.child.provider());
        Ok(precompile.getBeneficiary(self.ticket_id).call().await?._0)
    }

    /// Extend the ticket by one lifetime period, returns the new timeout
    pub async fn keep_alive(&self, cancel: Option<&CancelToken>) -> Result<u64, BridgeError> {
        self.ensure_redeemable().await?;
        let signer = self.child.signer_address()?;
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.child.provider());

        let pending = precompile.keepalive(self.ticket_id).from(signer).send().await?;
        let receipt = self.wait_for_receipt(*pending.tx_hash(), cancel).await?;
        if !receipt.status() {
            return Err(BridgeError::TransactionReverted(receipt.transaction_hash));
        }

        let timeout = self.timeout().await?;
        info!(ticket_id = %self.ticket_id, new_timeout = timeout, "Ticket lifetime extended");
        Ok(timeout)
    }

    /// Cancel the ticket; only the beneficiary may do this
    pub async fn cancel(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        self.ensure_redeemable().await?;
        let signer = self.child.signer_address()?;
        let precompile = ArbRetryableTx::new(ARB_RETRYABLE_TX_ADDRESS, self.child.provider());

        let pending = precompile.cancel(self.ticket_id).from(signer).send().await?;
        let receipt = self.wait_for_receipt(*pending.tx_hash(), cancel).await?;
        if !receipt.status() {
            return Err(BridgeError::TransactionReverted(receipt.transaction_hash));
        }
        info!(ticket_id = %self.ticket_id, tx_hash = %receipt.transaction_hash, "Ticket cancelled");
        Ok(receipt)
    }

    /// Calldata of `ArbRetryableTx.redeem` for this ticket
    pub fn redeem_calldata(&self) -> Bytes {
        redeem_calldata(self.ticket_id)
    }

    /// Calldata of the `createRetryableTicket` call that created this ticket
    pub fn inbox_calldata(&self) -> Option<Bytes> {
        self.params.as_ref().map(|p| p.inbox_calldata())
    }
}

/// Calldata of `ArbRetryableTx.redeem(ticket_id)`
pub fn redeem_calldata(ticket_id: B256) -> Bytes {
    ArbRetryableTx::redeemCall { ticketId: ticket_id }
        .abi_encode()
        .into()
}

/// Whether a ticket in `state` can still be redeemed
pub fn redeemable(ticket_id: B256, state: &TicketState) -> Result<(), BridgeError> {
    match state {
        TicketState::FundsDeposited { .. } => Ok(()),
        TicketState::Redeemed { .. } => Err(BridgeError::AlreadyRedeemed(ticket_id)),
        TicketState::Expired { .. } => Err(BridgeError::Expired(ticket_id)),
        TicketState::NotYetCreated | TicketState::CreationFailed { .. } => {
            Err(BridgeError::TicketNotRedeemable {
                ticket_id,
                status: state.status(),
            })
        }
    }
}

/// A mined redeem transaction
pub struct RedeemHandle<CP> {
    ticket_id: B256,
    receipt: TransactionReceipt,
    child: ChainClient<CP>,
    poll: PollConfig,
    timeout: Duration,
}

impl<CP: ChainProvider> RedeemHandle<CP> {
    pub fn ticket_id(&self) -> B256 {
        self.ticket_id
    }

    /// Receipt of the `redeem` transaction itself
    pub fn receipt(&self) -> &TransactionReceipt {
        &self.receipt
    }

    /// Hash of the retry transaction the redeem scheduled
    pub fn retry_tx_hash(&self) -> Result<B256, BridgeError> {
        redeem_scheduled(&self.receipt)
            .into_iter()
            .find(|event| event.ticketId == self.ticket_id)
            .map(|event| event.retryTxHash)
            .ok_or(BridgeError::NoRedeemScheduled(self.receipt.transaction_hash))
    }

    /// Receipt of the retry transaction, successful or not
    pub async fn wait_for_redeem(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        let retry_tx = self.retry_tx_hash()?;
        debug!(ticket_id = %self.ticket_id, retry_tx = %retry_tx, "Waiting for retry receipt");

        let receipt = self
            .child
            .wait_for_receipt(retry_tx, &self.poll, self.timeout, cancel)
            .await?;
        info!(
            ticket_id = %self.ticket_id,
            retry_tx = %retry_tx,
            success = receipt.status(),
            "Retry transaction executed"
        );
        Ok(receipt)
    }
}
