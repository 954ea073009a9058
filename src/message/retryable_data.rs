//! Retryable ticket parameters and their inbox encoding
//!
//! The inbox records a submit-retryable message as nine 32-byte words followed
//! by the call data:
//!
//! ```text
//! to | l2CallValue | l1Value | maxSubmissionFee | excessFeeRefundAddress |
//! callValueRefundAddress | gasLimit | maxFeePerGas | dataLength | data
//! ```
//!
//! The same encoder builds the `createRetryableTicket` calldata for both the
//! bridgers and the inbox forcer.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol_types::SolCall,
};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::evm::contracts::Inbox;
use crate::gas::submission_fee;
use crate::hash::{address_to_bytes32, bytes32_to_address, compute_retryable_ticket_id, keccak256};

const WORD: usize = 32;
const HEADER_WORDS: usize = 9;

/// The fields of a retryable ticket as submitted to the inbox
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryableTicketParams {
    /// Destination of the child-chain call (zero for contract creation)
    pub to: Address,
    /// Value forwarded to `to` on the child chain
    pub l2_call_value: U256,
    /// Total value deposited with the message
    pub l1_value: U256,
    pub max_submission_fee: U256,
    pub excess_fee_refund_address: Address,
    pub call_value_refund_address: Address,
    pub gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub data: Bytes,
}

fn word_u256(data: &[u8], index: usize) -> U256 {
    U256::from_be_slice(&data[index * WORD..(index + 1) * WORD])
}

fn word_address(data: &[u8], index: usize) -> Address {
    bytes32_to_address(&data[index * WORD..(index + 1) * WORD])
}

impl RetryableTicketParams {
    /// Decode the data of an `InboxMessageDelivered` event
    pub fn from_inbox_data(data: &[u8]) -> Result<Self, BridgeError> {
        let header_len = HEADER_WORDS * WORD;
        if data.len() < header_len {
            return Err(BridgeError::Decode(format!(
                "retryable message: {} bytes, need at least {}",
                data.len(),
                header_len
            )));
        }

        let data_length = word_u256(data, 8);
        let expected = U256::from(data.len() - header_len);
        if data_length != expected {
            return Err(BridgeError::Decode(format!(
                "retryable message: declared data length {} but {} bytes follow",
                data_length, expected
            )));
        }

        Ok(Self {
            to: word_address(data, 0),
            l2_call_value: word_u256(data, 1),
            l1_value: word_u256(data, 2),
            max_submission_fee: word_u256(data, 3),
            excess_fee_refund_address: word_address(data, 4),
            call_value_refund_address: word_address(data, 5),
            gas_limit: word_u256(data, 6),
            max_fee_per_gas: word_u256(data, 7),
            data: Bytes::copy_from_slice(&data[header_len..]),
        })
    }

    /// Encode in the layout the inbox records
    pub fn to_inbox_data(&self) -> Bytes {
        let mut out = Vec::with_capacity(HEADER_WORDS * WORD + self.data.len());
        out.extend_from_slice(address_to_bytes32(&self.to).as_slice());
        out.extend_from_slice(&self.l2_call_value.to_be_bytes::<32>());
        out.extend_from_slice(&self.l1_value.to_be_bytes::<32>());
        out.extend_from_slice(&self.max_submission_fee.to_be_bytes::<32>());
        out.extend_from_slice(address_to_bytes32(&self.excess_fee_refund_address).as_slice());
        out.extend_from_slice(address_to_bytes32(&self.call_value_refund_address).as_slice());
        out.extend_from_slice(&self.gas_limit.to_be_bytes::<32>());
        out.extend_from_slice(&self.max_fee_per_gas.to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(self.data.len()).to_be_bytes::<32>());
        out.extend_from_slice(&self.data);
        Bytes::from(out)
    }

    /// Hash of the call data, as reported in ticket records
    pub fn call_data_hash(&self) -> B256 {
        B256::from(keccak256(&self.data))
    }

    /// Value the parent-chain call must carry for the ticket to auto-redeem
    pub fn required_deposit(&self) -> U256 {
        self.gas_limit
            .saturating_mul(self.max_fee_per_gas)
            .saturating_add(self.max_submission_fee)
            .saturating_add(self.l2_call_value)
    }

    /// Verify the submission fee covers the inbox minimum at `l1_base_fee`
    pub fn check_submission_fee(&self, l1_base_fee: U256) -> Result<(), BridgeError> {
        let required = submission_fee(self.data.len(), l1_base_fee);
        if self.max_submission_fee < required {
            return Err(BridgeError::InsufficientSubmissionCost {
                required,
                supplied: self.max_submission_fee,
            });
        }
        Ok(())
    }

    /// Child-chain id of the ticket created from this message
    pub fn ticket_id(
        &self,
        child_chain_id: u64,
        message_number: U256,
        sender: Address,
        l1_base_fee: U256,
    ) -> B256 {
        compute_retryable_ticket_id(child_chain_id, message_number, sender, l1_base_fee, self)
    }

    /// Typed `Inbox.createRetryableTicket` call for these parameters
    pub fn create_retryable_ticket_call(&self) -> Inbox::createRetryableTicketCall {
        Inbox::createRetryableTicketCall {
            to: self.to,
            l2CallValue: self.l2_call_value,
            maxSubmissionCost: self.max_submission_fee,
            excessFeeRefundAddress: self.excess_fee_refund_address,
            callValueRefundAddress: self.call_value_refund_address,
            gasLimit: self.gas_limit,
            maxFeePerGas: self.max_fee_per_gas,
            data: self.data.clone(),
        }
    }

    /// ABI-encoded `createRetryableTicket` calldata
    pub fn inbox_calldata(&self) -> Bytes {
        Bytes::from(self.create_retryable_ticket_call().abi_encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RetryableTicketParams {
        RetryableTicketParams {
            to: Address::repeat_byte(0x0a),
            l2_call_value: U256::from(5u64),
            l1_value: U256::from(1_000u64),
            max_submission_fee: U256::from(200u64),
            excess_fee_refund_address: Address::repeat_byte(0x0b),
            call_value_refund_address: Address::repeat_byte(0x0c),
            gas_limit: U256::from(21_000u64),
            max_fee_per_gas: U256::from(3u64),
            data: Bytes::from(vec![1, 2, 3]),
        }
    }

    #[test]
    fn test_decode_inbox_data() {
        let p = params();
        let encoded = p.to_inbox_data();
        assert_eq!(encoded.len(), 9 * 32 + 3);
        // dataLength word
        assert_eq!(encoded[8 * 32 + 31], 3);

        let decoded = RetryableTicketParams::from_inbox_data(&encoded).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        let err = RetryableTicketParams::from_inbox_data(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let mut encoded = params().to_inbox_data().to_vec();
        encoded.push(0xff);
        assert!(RetryableTicketParams::from_inbox_data(&encoded).is_err());
    }

    #[test]
    fn test_required_deposit() {
        // 21000 * 3 + 200 + 5
        assert_eq!(params().required_deposit(), U256::from(63_205u64));
    }

    #[test]
    fn test_check_submission_fee() {
        let p = params();
        // (1400 + 6 * 3) * 1 = 1418 > 200
        let err = p.check_submission_fee(U256::from(1u64)).unwrap_err();
        match err {
            BridgeError::InsufficientSubmissionCost { required, supplied } => {
                assert_eq!(required, U256::from(1418u64));
                assert_eq!(supplied, U256::from(200u64));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(p.check_submission_fee(U256::ZERO).is_ok());
    }

    #[test]
    fn test_inbox_calldata_selector() {
        let calldata = params().inbox_calldata();
        assert_eq!(&calldata[..4], Inbox::createRetryableTicketCall::SELECTOR.as_slice());
    }
}
