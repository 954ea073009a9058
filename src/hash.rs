//! Hash computation for cross-chain message identities
//!
//! The child chain derives the hash of every transaction it creates from a
//! delayed message deterministically, so the ids can be computed client-side
//! from the parent-chain events alone.
//!
//! ## Formats
//!
//! - Retryable ticket: `keccak256(0x69 ‖ rlp([chainId, pad32(msgNum), sender,
//!   l1BaseFee, l1Value, maxFeePerGas, gasLimit, dest, l2CallValue,
//!   callValueRefund, maxSubmissionFee, excessFeeRefund, data]))`
//! - ETH deposit: `keccak256(0x64 ‖ rlp([chainId, pad32(msgNum), from, to, value]))`
//!
//! Integers are RLP-encoded with leading zeros stripped, the message number is
//! the exception and is always a 32-byte string.

use alloy::{
    primitives::{aliases::U160, Address, Bytes, B256, U256},
    rlp::{Encodable, Header},
};
use tiny_keccak::{Hasher, Keccak};

use crate::message::retryable_data::RetryableTicketParams;

/// Typed-transaction prefix of a submit-retryable transaction
pub const SUBMIT_RETRYABLE_TX_TYPE: u8 = 0x69;

/// Typed-transaction prefix of an ETH deposit transaction
pub const DEPOSIT_TX_TYPE: u8 = 0x64;

/// Offset added to contract senders when their messages cross to the child chain
pub const ADDRESS_ALIAS_OFFSET: Address =
    alloy::primitives::address!("1111000000000000000000000000000000001111");

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Encode a list of pre-encoded RLP items and hash it behind a type prefix
fn typed_rlp_hash(tx_type: u8, fields: &[&dyn Encodable]) -> B256 {
    let payload_length: usize = fields.iter().map(|f| f.length()).sum();

    let mut out = Vec::with_capacity(1 + payload_length + 9);
    out.push(tx_type);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }

    B256::from(keccak256(&out))
}

/// Message numbers are hashed as 32-byte strings, not as integers
fn pad32(message_number: U256) -> B256 {
    B256::from(message_number.to_be_bytes::<32>())
}

/// Compute the child-chain id of a retryable ticket
///
/// `sender` is the sender recorded by the bridge (already aliased for
/// contracts), `l1_base_fee` the parent base fee recorded with the message.
pub fn compute_retryable_ticket_id(
    child_chain_id: u64,
    message_number: U256,
    sender: Address,
    l1_base_fee: U256,
    params: &RetryableTicketParams,
) -> B256 {
    let chain_id = U256::from(child_chain_id);
    let msg_num = pad32(message_number);
    // A zero destination is a contract creation and hashes as the empty string
    let dest: Bytes = if params.to.is_zero() {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(params.to.as_slice())
    };

    typed_rlp_hash(
        SUBMIT_RETRYABLE_TX_TYPE,
        &[
            &chain_id,
            &msg_num,
            &sender,
            &l1_base_fee,
            &params.l1_value,
            &params.max_fee_per_gas,
            &params.gas_limit,
            &dest,
            &params.l2_call_value,
            &params.call_value_refund_address,
            &params.max_submission_fee,
            &params.excess_fee_refund_address,
            &params.data,
        ],
    )
}

/// Compute the child-chain hash of an ETH deposit transaction
pub fn compute_eth_deposit_id(
    child_chain_id: u64,
    message_number: U256,
    from: Address,
    to: Address,
    value: U256,
) -> B256 {
    let chain_id = U256::from(child_chain_id);
    let msg_num = pad32(message_number);
    typed_rlp_hash(DEPOSIT_TX_TYPE, &[&chain_id, &msg_num, &from, &to, &value])
}

fn address_to_u160(addr: Address) -> U160 {
    U160::from_be_slice(addr.as_slice())
}

fn u160_to_address(value: U160) -> Address {
    Address::from(value.to_be_bytes::<20>())
}

/// Alias a parent-chain contract address the way the inbox does
pub fn apply_alias(addr: Address) -> Address {
    u160_to_address(address_to_u160(addr).wrapping_add(address_to_u160(ADDRESS_ALIAS_OFFSET)))
}

/// Recover the parent-chain address from an aliased child-chain sender
pub fn undo_alias(addr: Address) -> Address {
    u160_to_address(address_to_u160(addr).wrapping_sub(address_to_u160(ADDRESS_ALIAS_OFFSET)))
}

/// Convert an EVM address to bytes32 (left-padded with zeros)
pub fn address_to_bytes32(addr: &Address) -> B256 {
    let mut result = [0u8; 32];
    result[12..32].copy_from_slice(addr.as_slice());
    B256::from(result)
}

/// Extract the address from the low 20 bytes of a 32-byte word
pub fn bytes32_to_address(bytes: &[u8]) -> Address {
    Address::from_slice(&bytes[12..32])
}
