//! Delayed inbox access
//!
//! Retryable tickets can be created directly through the inbox, bypassing the
//! gateways. If the sequencer ignores delayed messages for longer than the
//! sequencer inbox's `maxTimeVariation`, anyone can force them into the
//! sequenced stream.

use std::sync::Arc;
use std::time::Duration;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::{Filter, TransactionReceipt, TransactionRequest},
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bridger::{check_receipt, ensure_covers};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::{Bridge, SequencerInbox};
use crate::evm::events::block_chunks;
use crate::message::parent_receipt::{ParentToChildMessage, ParentTransactionReceipt};
use crate::message::retryable_data::RetryableTicketParams;
use crate::networks::NetworkPair;
use crate::poll::{CancelToken, PollConfig};
use crate::types::BridgeTransactionPair;

/// How far back from the force-inclusion cutoff to look for messages
pub const DEFAULT_FORCE_INCLUDE_SEARCH_BLOCKS: u64 = 3 * 6545;

/// Send `createRetryableTicket` to the inbox with the ticket's full deposit
///
/// Shared by every path that creates a ticket directly. Returns the parent
/// transaction hash; callers wait for the receipt under their own timeout.
pub async fn send_retryable<PP: ChainProvider>(
    parent: &ChainClient<PP>,
    inbox: Address,
    params: &RetryableTicketParams,
) -> Result<B256, BridgeError> {
    let signer = parent.signer_address()?;
    let tx = TransactionRequest::default()
        .with_from(signer)
        .with_to(inbox)
        .with_input(params.inbox_calldata())
        .with_value(params.l1_value);

    let pending = parent.provider().send_transaction(tx).await?;
    debug!(tx_hash = %pending.tx_hash(), "createRetryableTicket sent");
    Ok(*pending.tx_hash())
}

/// A delayed message old enough to be force-included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceIncludableMessage {
    pub message_index: U256,
    pub kind: u8,
    pub block_number: u64,
    pub timestamp: u64,
    pub base_fee_l1: U256,
    pub sender: Address,
    pub message_data_hash: B256,
}

/// A ticket created directly through the inbox
#[derive(Debug, Clone)]
pub struct ForcedRetryable {
    pub transaction: BridgeTransactionPair,
    pub message: ParentToChildMessage,
}

/// Pick the newest message that has not been read by the sequencer yet
///
/// Force-including it also includes every older unread message.
pub fn select_force_includable(
    delivered: &[(u64, Bridge::MessageDelivered)],
    total_delayed_read: U256,
) -> Option<ForceIncludableMessage> {
    delivered
        .iter()
        .filter(|(_, event)| event.messageIndex >= total_delayed_read)
        .max_by_key(|(_, event)| event.messageIndex)
        .map(|(block_number, event)| ForceIncludableMessage {
            message_index: event.messageIndex,
            kind: event.kind,
            block_number: *block_number,
            timestamp: event.timestamp,
            base_fee_l1: event.baseFeeL1,
            sender: event.sender,
            message_data_hash: event.messageDataHash,
        })
}

/// Direct inbox operations on the parent chain
#[derive(Debug, Clone)]
pub struct InboxForcer<PP> {
    parent: ChainClient<PP>,
    network: Arc<NetworkPair>,
    max_block_range: u64,
    search_blocks: u64,
    poll: PollConfig,
    receipt_timeout: Duration,
}

impl<PP: ChainProvider> InboxForcer<PP> {
    pub fn new(parent: ChainClient<PP>, network: Arc<NetworkPair>, config: &BridgeConfig) -> Self {
        Self {
            parent,
            network,
            max_block_range: config.max_block_range,
            search_blocks: DEFAULT_FORCE_INCLUDE_SEARCH_BLOCKS,
            poll: PollConfig::from_bridge_config(config),
            receipt_timeout: Duration::from_millis(config.receipt_timeout_ms),
        }
    }

    async fn confirm(
        &self,
        tx_hash: B256,
        what: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        let receipt = self
            .parent
            .wait_for_receipt(tx_hash, &self.poll, self.receipt_timeout, cancel)
            .await?;
        check_receipt(receipt, what)
    }

    pub fn with_search_blocks(mut self, search_blocks: u64) -> Self {
        self.search_blocks = search_blocks;
        self
    }

    /// Create a retryable ticket straight through the inbox
    ///
    /// The submission cost is checked against the current base fee before
    /// anything is sent.
    pub async fn force_inclusion(
        &self,
        params: &RetryableTicketParams,
        cancel: Option<&CancelToken>,
    ) -> Result<ForcedRetryable, BridgeError> {
        let base_fee = self.parent.base_fee().await?;
        params.check_submission_fee(base_fee)?;

        let signer = self.parent.signer_address()?;
        let balance = self.parent.balance(signer).await?;
        ensure_covers(params.l1_value, balance)?;

        let tx_hash = send_retryable(&self.parent, self.network.eth_bridge().inbox, params).await?;
        let receipt = self.confirm(tx_hash, "createRetryableTicket", cancel).await?;
        let parent_receipt = ParentTransactionReceipt::new(receipt);
        let message = parent_receipt
            .parent_to_child_messages(&self.network)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(parent_receipt.tx_hash()))?;

        info!(
            tx_hash = %parent_receipt.tx_hash(),
            ticket_id = %message.ticket_id,
            "Retryable ticket submitted through the inbox"
        );

        Ok(ForcedRetryable {
            transaction: parent_receipt.to_transaction_pair(&self.network),
            message,
        })
    }

    /// The newest delayed message the sequencer has been sitting on for too long
    pub async fn find_force_includable_message(
        &self,
    ) -> Result<Option<ForceIncludableMessage>, BridgeError> {
        let eth_bridge = self.network.eth_bridge();
        let bridge = Bridge::new(eth_bridge.bridge, self.parent.provider());
        let sequencer_inbox = SequencerInbox::new(eth_bridge.sequencer_inbox, self.parent.provider());

        let (total_read, message_count, variation, current_block) = tokio::try_join!(
            async {
                Ok::<_, BridgeError>(sequencer_inbox.totalDelayedMessagesRead().call().await?._0)
            },
            async { Ok::<_, BridgeError>(bridge.delayedMessageCount().call().await?._0) },
            async { Ok::<_, BridgeError>(sequencer_inbox.maxTimeVariation().call().await?) },
            self.parent.block_number(),
        )?;

        if message_count <= total_read {
            debug!(total_read = %total_read, "No unread delayed messages");
            return Ok(None);
        }

        let delay_blocks: u64 = variation.delayBlocks.saturating_to();
        let Some(cutoff) = current_block.checked_sub(delay_blocks) else {
            return Ok(None);
        };
        let from = cutoff.saturating_sub(self.search_blocks);

        let mut delivered = Vec::new();
        for (start, end) in block_chunks(from, cutoff, self.max_block_range) {
            let filter = Filter::new()
                .address(eth_bridge.bridge)
                .event_signature(Bridge::MessageDelivered::SIGNATURE_HASH)
                .from_block(start)
                .to_block(end);
            for log in self.parent.logs(&filter).await? {
                let block_number = log.block_number.unwrap_or_default();
                match log.log_decode::<Bridge::MessageDelivered>() {
                    Ok(decoded) => delivered.push((block_number, decoded.inner.data)),
                    Err(e) => warn!(error = %e, "Failed to decode MessageDelivered"),
                }
            }
        }

        Ok(select_force_includable(&delivered, total_read))
    }

    /// Force-include `message`, or the newest eligible message when `None`
    ///
    /// Returns `None` when nothing is eligible.
    pub async fn force_include(
        &self,
        message: Option<ForceIncludableMessage>,
        cancel: Option<&CancelToken>,
    ) -> Result<Option<TransactionReceipt>, BridgeError> {
        let message = match message {
            Some(message) => message,
            None => match self.find_force_includable_message().await? {
                Some(message) => message,
                None => return Ok(None),
            },
        };

        let signer = self.parent.signer_address()?;
        let sequencer_inbox =
            SequencerInbox::new(self.network.eth_bridge().sequencer_inbox, self.parent.provider());
        let pending = sequencer_inbox
            .forceInclusion(
                message.message_index + U256::from(1u64),
                message.kind,
                [message.block_number, message.timestamp],
                message.base_fee_l1,
                message.sender,
                message.message_data_hash,
            )
            .from(signer)
            .send()
            .await?;
        let receipt = self
            .confirm(*pending.tx_hash(), "forceInclusion", cancel)
            .await?;

        info!(message_index = %message.message_index, "Forced delayed message inclusion");
        Ok(Some(receipt))
    }
}
