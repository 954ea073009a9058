//! Child-to-parent withdrawal messages
//!
//! A withdrawal emits `ArbSys.L2ToL1Tx` on the child chain. The message can
//! be executed on the parent chain through the outbox once its assertion is
//! confirmed, roughly `confirm_period_blocks` parent blocks later.

use alloy::{primitives::U256, rpc::types::TransactionReceipt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::Outbox;
use crate::evm::events::withdrawal_records;
use crate::networks::NetworkPair;
use crate::types::WithdrawalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    /// Not executed yet; still inside the challenge window
    Unconfirmed,
    /// Past the challenge window, waiting for someone to execute it
    Confirmed,
    /// Executed through the outbox
    Executed,
}

/// Withdrawals emitted by a child-chain transaction
///
/// Fails with [`BridgeError::NoMessageFound`] when the receipt has none.
pub fn child_to_parent_messages(
    receipt: &TransactionReceipt,
) -> Result<Vec<WithdrawalMessage>, BridgeError> {
    let records = withdrawal_records(receipt);
    if records.is_empty() {
        return Err(BridgeError::NoMessageFound(receipt.transaction_hash));
    }
    Ok(records.into_iter().map(WithdrawalMessage::new).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalMessage {
    pub record: WithdrawalRecord,
}

impl WithdrawalMessage {
    pub fn new(record: WithdrawalRecord) -> Self {
        Self { record }
    }

    /// First parent block at which the message can be confirmed
    pub fn claimable_after_block(&self, confirm_period_blocks: u64) -> U256 {
        self.record
            .eth_block_num
            .saturating_add(U256::from(confirm_period_blocks))
    }

    /// Whether the outbox has already executed this message
    pub async fn is_executed<PP: ChainProvider>(
        &self,
        parent: &ChainClient<PP>,
        pair: &NetworkPair,
    ) -> Result<bool, BridgeError> {
        let outbox = Outbox::new(pair.eth_bridge().outbox, parent.provider());
        Ok(outbox.isSpent(self.record.position).call().await?._0)
    }

    /// Execution status judged from the outbox and the parent block height
    pub async fn status<PP: ChainProvider>(
        &self,
        parent: &ChainClient<PP>,
        pair: &NetworkPair,
    ) -> Result<WithdrawalStatus, BridgeError> {
        if self.is_executed(parent, pair).await? {
            return Ok(WithdrawalStatus::Executed);
        }
        let current = U256::from(parent.block_number().await?);
        let claimable = self.claimable_after_block(pair.child.confirm_period_blocks);
        debug!(
            position = %self.record.position,
            current_block = %current,
            claimable_block = %claimable,
            "Withdrawal not executed"
        );
        Ok(if current >= claimable {
            WithdrawalStatus::Confirmed
        } else {
            WithdrawalStatus::Unconfirmed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::contracts::{ArbSys, ARB_SYS_ADDRESS};
    use crate::evm::events::tests::{make_log, make_receipt};
    use alloy::primitives::{Address, Bytes, B256};

    fn l2_to_l1(position: u64) -> ArbSys::L2ToL1Tx {
        ArbSys::L2ToL1Tx {
            caller: Address::repeat_byte(1),
            destination: Address::repeat_byte(2),
            hash: U256::from(99u64),
            position: U256::from(position),
            arbBlockNum: U256::from(500u64),
            ethBlockNum: U256::from(100u64),
            timestamp: U256::from(1_700_000_000u64),
            callvalue: U256::from(10u64),
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_messages_from_receipt() {
        let receipt = make_receipt(
            B256::repeat_byte(7),
            3,
            true,
            vec![make_log(ARB_SYS_ADDRESS, &l2_to_l1(5))],
        );
        let messages = child_to_parent_messages(&receipt).unwrap();
        assert_eq!(messages.len(), 1);
        let record = &messages[0].record;
        assert_eq!(record.child_tx_hash, B256::repeat_byte(7));
        assert_eq!(record.position, U256::from(5u64));
        assert_eq!(record.callvalue, U256::from(10u64));
        assert_eq!(messages[0].claimable_after_block(20), U256::from(120u64));
    }

    #[test]
    fn test_no_withdrawal_in_receipt() {
        // Same event from the wrong emitter does not count
        let receipt = make_receipt(
            B256::repeat_byte(7),
            3,
            true,
            vec![make_log(Address::repeat_byte(0x64), &l2_to_l1(5))],
        );
        assert!(matches!(
            child_to_parent_messages(&receipt),
            Err(BridgeError::NoMessageFound(_))
        ));
    }
}
