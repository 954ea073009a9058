//! Message discovery from parent-chain receipts
//!
//! A mined parent-chain transaction that touched the inbox carries one
//! `MessageDelivered` log from the bridge and one `InboxMessageDelivered` log
//! from the inbox per delayed message. Joining them gives everything needed
//! to derive the child-chain transaction ids.

use alloy::{primitives::B256, rpc::types::TransactionReceipt};
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::evm::events::{delivered_messages, DeliveredMessage};
use crate::message::eth_deposit::{parse_eth_deposit_data, EthDepositMessage};
use crate::message::retryable_data::RetryableTicketParams;
use crate::message::status::TicketState;
use crate::networks::NetworkPair;
use crate::types::{
    BridgeTransactionPair, MessageKind, RetryableTicketRecord, SubmittedMessage,
};

/// A submit-retryable message and the ticket it will create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentToChildMessage {
    pub message: SubmittedMessage,
    pub params: RetryableTicketParams,
    pub ticket_id: B256,
}

impl ParentToChildMessage {
    /// Snapshot of the ticket in a given state
    pub fn record(&self, state: TicketState) -> RetryableTicketRecord {
        RetryableTicketRecord {
            ticket_id: self.ticket_id,
            dest_address: self.params.to,
            l2_call_value: self.params.l2_call_value,
            l1_value: self.params.l1_value,
            max_submission_cost: self.params.max_submission_fee,
            excess_fee_refund_address: self.params.excess_fee_refund_address,
            call_value_refund_address: self.params.call_value_refund_address,
            gas_limit: self.params.gas_limit,
            max_fee_per_gas: self.params.max_fee_per_gas,
            data: self.params.data.clone(),
            call_data_hash: self.params.call_data_hash(),
            // Both knobs must be non-zero for the creation to try an auto-redeem
            auto_redeem_attempted: !self.params.gas_limit.is_zero()
                && !self.params.max_fee_per_gas.is_zero(),
            state,
        }
    }
}

/// Wrapper around a mined parent-chain receipt
#[derive(Debug, Clone)]
pub struct ParentTransactionReceipt {
    receipt: TransactionReceipt,
}

impl From<TransactionReceipt> for ParentTransactionReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self { receipt }
    }
}

impl ParentTransactionReceipt {
    pub fn new(receipt: TransactionReceipt) -> Self {
        Self { receipt }
    }

    pub fn receipt(&self) -> &TransactionReceipt {
        &self.receipt
    }

    pub fn into_receipt(self) -> TransactionReceipt {
        self.receipt
    }

    pub fn tx_hash(&self) -> B256 {
        self.receipt.transaction_hash
    }

    fn delivered(&self, pair: &NetworkPair) -> Vec<DeliveredMessage> {
        let eth_bridge = pair.eth_bridge();
        delivered_messages(&self.receipt, eth_bridge.bridge, eth_bridge.inbox)
    }

    fn submitted(&self, pair: &NetworkPair, delivered: &DeliveredMessage) -> SubmittedMessage {
        SubmittedMessage {
            source_tx_hash: self.receipt.transaction_hash,
            source_block_hash: self.receipt.block_hash.unwrap_or_default(),
            source_block_number: self.receipt.block_number.unwrap_or_default(),
            message_number: delivered.message_number,
            sender: delivered.sender,
            kind: delivered.kind,
            dest_chain_id: pair.child.chain_id,
            base_fee_l1: delivered.base_fee_l1,
            timestamp: delivered.timestamp,
        }
    }

    /// Every delayed message created by this transaction, whatever its kind
    pub fn submitted_messages(&self, pair: &NetworkPair) -> Vec<SubmittedMessage> {
        self.delivered(pair)
            .iter()
            .map(|d| self.submitted(pair, d))
            .collect()
    }

    /// The retryable tickets created by this transaction
    ///
    /// Fails with [`BridgeError::NoMessageFound`] when there are none.
    pub fn parent_to_child_messages(
        &self,
        pair: &NetworkPair,
    ) -> Result<Vec<ParentToChildMessage>, BridgeError> {
        let mut messages = Vec::new();
        for delivered in self.delivered(pair) {
            if delivered.kind != MessageKind::SubmitRetryable {
                continue;
            }
            let params = RetryableTicketParams::from_inbox_data(&delivered.data)?;
            let ticket_id = params.ticket_id(
                pair.child.chain_id,
                delivered.message_number,
                delivered.sender,
                delivered.base_fee_l1,
            );
            debug!(
                message_number = %delivered.message_number,
                ticket_id = %ticket_id,
                "Discovered retryable ticket"
            );
            messages.push(ParentToChildMessage {
                message: self.submitted(pair, &delivered),
                params,
                ticket_id,
            });
        }

        if messages.is_empty() {
            return Err(BridgeError::NoMessageFound(self.tx_hash()));
        }

        info!(
            tx_hash = %self.tx_hash(),
            count = messages.len(),
            "Found parent-to-child messages"
        );
        Ok(messages)
    }

    /// The ETH deposits created by this transaction
    pub fn eth_deposits(&self, pair: &NetworkPair) -> Result<Vec<EthDepositMessage>, BridgeError> {
        let mut deposits = Vec::new();
        for delivered in self.delivered(pair) {
            if delivered.kind != MessageKind::EthDeposit {
                continue;
            }
            let (to, value) = parse_eth_deposit_data(&delivered.data)?;
            deposits.push(EthDepositMessage::new(
                self.submitted(pair, &delivered),
                to,
                value,
            ));
        }

        if deposits.is_empty() {
            return Err(BridgeError::NoMessageFound(self.tx_hash()));
        }
        Ok(deposits)
    }

    /// Pair the receipt with the first message it produced, if any
    pub fn to_transaction_pair(&self, pair: &NetworkPair) -> BridgeTransactionPair {
        BridgeTransactionPair {
            source_tx: self.receipt.clone(),
            dest_message: self.submitted_messages(pair).into_iter().next(),
        }
    }
}
