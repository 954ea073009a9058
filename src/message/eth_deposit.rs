//! Plain ETH deposits
//!
//! `Inbox.depositEth` does not create a retryable ticket. The child chain
//! mints the value to the destination in a deposit transaction whose hash is
//! derivable from the message.

use std::time::Duration;

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::TransactionReceipt,
};
use tracing::info;

use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::hash::compute_eth_deposit_id;
use crate::poll::{CancelToken, PollConfig};
use crate::types::{EthDepositRecord, SubmittedMessage};

const DEPOSIT_DATA_LEN: usize = 20 + 32;

/// ETH deposit payload: 20-byte destination then 32-byte value
pub fn parse_eth_deposit_data(data: &[u8]) -> Result<(Address, U256), BridgeError> {
    if data.len() != DEPOSIT_DATA_LEN {
        return Err(BridgeError::Decode(format!(
            "eth deposit message: expected {} bytes, got {}",
            DEPOSIT_DATA_LEN,
            data.len()
        )));
    }
    Ok((
        Address::from_slice(&data[..20]),
        U256::from_be_slice(&data[20..]),
    ))
}

/// A plain ETH deposit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthDepositMessage {
    pub message: SubmittedMessage,
    pub record: EthDepositRecord,
}

impl EthDepositMessage {
    pub fn new(message: SubmittedMessage, to: Address, value: U256) -> Self {
        let deposit_tx_id = compute_eth_deposit_id(
            message.dest_chain_id,
            message.message_number,
            message.sender,
            to,
            value,
        );
        Self {
            message,
            record: EthDepositRecord {
                to,
                value,
                deposit_tx_id,
            },
        }
    }

    pub fn deposit_tx_id(&self) -> B256 {
        self.record.deposit_tx_id
    }

    /// Child-chain receipt of the deposit, if it has been executed
    pub async fn child_receipt<CP: ChainProvider>(
        &self,
        child: &ChainClient<CP>,
    ) -> Result<Option<TransactionReceipt>, BridgeError> {
        child.receipt(self.record.deposit_tx_id).await
    }

    /// Poll until the deposit lands on the child chain
    pub async fn wait_for_deposit<CP: ChainProvider>(
        &self,
        child: &ChainClient<CP>,
        poll: &PollConfig,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        let receipt = child
            .wait_for_receipt(self.record.deposit_tx_id, poll, timeout, cancel)
            .await?;
        info!(
            deposit_tx = %self.record.deposit_tx_id,
            to = %self.record.to,
            value = %self.record.value,
            "ETH deposit executed on child chain"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    #[test]
    fn test_parse_eth_deposit_data() {
        let to = Address::repeat_byte(0x66);
        let mut data = to.to_vec();
        data.extend_from_slice(&U256::from(123u64).to_be_bytes::<32>());
        let (parsed_to, value) = parse_eth_deposit_data(&data).unwrap();
        assert_eq!(parsed_to, to);
        assert_eq!(value, U256::from(123u64));

        assert!(parse_eth_deposit_data(&data[..51]).is_err());
        assert!(parse_eth_deposit_data(&[]).is_err());
    }

    #[test]
    fn test_deposit_id_matches_hash_module() {
        let message = SubmittedMessage {
            source_tx_hash: B256::ZERO,
            source_block_hash: B256::ZERO,
            source_block_number: 1,
            message_number: U256::from(4u64),
            sender: Address::repeat_byte(1),
            kind: MessageKind::EthDeposit,
            dest_chain_id: 412346,
            base_fee_l1: U256::ZERO,
            timestamp: 0,
        };
        let deposit = EthDepositMessage::new(message, Address::repeat_byte(2), U256::from(10u64));
        assert_eq!(
            deposit.deposit_tx_id(),
            compute_eth_deposit_id(
                412346,
                U256::from(4u64),
                Address::repeat_byte(1),
                Address::repeat_byte(2),
                U256::from(10u64)
            )
        );
    }
}
