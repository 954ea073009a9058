//! Event parsing
//!
//! Decodes the bridge, inbox and precompile events out of receipts and log
//! batches, and joins the two halves of a delayed message.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    rpc::types::{Log, TransactionReceipt},
    sol_types::SolEvent,
};
use tracing::warn;

use crate::evm::contracts::{ArbRetryableTx, ArbSys, Bridge, Inbox, ARB_RETRYABLE_TX_ADDRESS, ARB_SYS_ADDRESS};
use crate::types::{MessageKind, WithdrawalRecord};

/// Decode every log of type `E`, optionally restricted to one emitter
///
/// Logs that match the signature but fail to decode are skipped with a warning.
pub fn decode_logs<E: SolEvent>(logs: &[Log], emitter: Option<Address>) -> Vec<E> {
    logs.iter()
        .filter(|log| emitter.map_or(true, |addr| log.address() == addr))
        .filter(|log| log.topics().first() == Some(&E::SIGNATURE_HASH))
        .filter_map(|log| match log.log_decode::<E>() {
            Ok(decoded) => Some(decoded.inner.data),
            Err(e) => {
                warn!(event = E::SIGNATURE, error = %e, "Failed to decode log");
                None
            }
        })
        .collect()
}

/// Decode the logs of type `E` in a receipt
pub fn decode_receipt_logs<E: SolEvent>(
    receipt: &TransactionReceipt,
    emitter: Option<Address>,
) -> Vec<E> {
    decode_logs(receipt.inner.logs(), emitter)
}

/// A delayed message with both its bridge record and its inbox payload
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub message_number: U256,
    pub kind: MessageKind,
    pub sender: Address,
    pub message_data_hash: B256,
    pub base_fee_l1: U256,
    pub timestamp: u64,
    pub data: Bytes,
}

/// Join `Bridge.MessageDelivered` and `Inbox.InboxMessageDelivered` by message number
///
/// Bridge records without inbox data are dropped; a message is only usable
/// when its payload is known.
pub fn delivered_messages(
    receipt: &TransactionReceipt,
    bridge: Address,
    inbox: Address,
) -> Vec<DeliveredMessage> {
    let delivered: Vec<Bridge::MessageDelivered> = decode_receipt_logs(receipt, Some(bridge));
    let inbox_logs: Vec<Inbox::InboxMessageDelivered> = decode_receipt_logs(receipt, Some(inbox));

    delivered
        .into_iter()
        .filter_map(|event| {
            let payload = inbox_logs
                .iter()
                .find(|m| m.messageNum == event.messageIndex);
            match payload {
                Some(payload) => Some(DeliveredMessage {
                    message_number: event.messageIndex,
                    kind: MessageKind::from_u8(event.kind),
                    sender: event.sender,
                    message_data_hash: event.messageDataHash,
                    base_fee_l1: event.baseFeeL1,
                    timestamp: event.timestamp,
                    data: payload.data.clone(),
                }),
                None => {
                    warn!(
                        message_number = %event.messageIndex,
                        "MessageDelivered without matching inbox data"
                    );
                    None
                }
            }
        })
        .collect()
}

/// `RedeemScheduled` events emitted by the retryable precompile in a receipt
pub fn redeem_scheduled(receipt: &TransactionReceipt) -> Vec<ArbRetryableTx::RedeemScheduled> {
    decode_receipt_logs(receipt, Some(ARB_RETRYABLE_TX_ADDRESS))
}

/// Withdrawal records from `ArbSys.L2ToL1Tx` events in a child-chain receipt
pub fn withdrawal_records(receipt: &TransactionReceipt) -> Vec<WithdrawalRecord> {
    let events: Vec<ArbSys::L2ToL1Tx> = decode_receipt_logs(receipt, Some(ARB_SYS_ADDRESS));
    events
        .into_iter()
        .map(|e| WithdrawalRecord {
            child_tx_hash: receipt.transaction_hash,
            caller: e.caller,
            destination: e.destination,
            hash: e.hash,
            position: e.position,
            arb_block_num: e.arbBlockNum,
            eth_block_num: e.ethBlockNum,
            timestamp: e.timestamp,
            callvalue: e.callvalue,
            data: e.data,
        })
        .collect()
}

/// Split `[from, to]` into inclusive ranges of at most `max_range` blocks
pub fn block_chunks(from: u64, to: u64, max_range: u64) -> Vec<(u64, u64)> {
    let step = max_range.max(1);
    let mut chunks = Vec::new();
    let mut current = from;
    while current <= to {
        let end = current.saturating_add(step - 1).min(to);
        chunks.push((current, end));
        if end == u64::MAX {
            break;
        }
        current = end + 1;
    }
    chunks
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::{FixedBytes, LogData};

    pub(crate) fn make_log<E: SolEvent>(emitter: Address, event: &E) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: emitter,
                data: event.encode_log_data(),
            },
            ..Default::default()
        }
    }

    /// A mined receipt carrying `logs`, built through the JSON-RPC shape
    pub(crate) fn make_receipt(tx_hash: B256, block_number: u64, success: bool, logs: Vec<Log>) -> TransactionReceipt {
        serde_json::from_value(serde_json::json!({
            "type": "0x2",
            "status": if success { "0x1" } else { "0x0" },
            "cumulativeGasUsed": "0x0",
            "logs": logs,
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": tx_hash,
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(0xbb),
            "blockNumber": format!("{:#x}", block_number),
            "gasUsed": "0x0",
            "effectiveGasPrice": "0x0",
            "from": Address::repeat_byte(0x01),
            "to": null,
            "contractAddress": null
        }))
        .expect("valid receipt json")
    }

    fn delivered(index: u64, kind: u8) -> Bridge::MessageDelivered {
        Bridge::MessageDelivered {
            messageIndex: U256::from(index),
            beforeInboxAcc: FixedBytes::ZERO,
            inbox: Address::repeat_byte(2),
            kind,
            sender: Address::repeat_byte(3),
            messageDataHash: FixedBytes::repeat_byte(4),
            baseFeeL1: U256::from(100u64),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_decode_logs_filters_emitter() {
        let bridge = Address::repeat_byte(1);
        let logs = vec![
            make_log(bridge, &delivered(1, 9)),
            make_log(Address::repeat_byte(9), &delivered(2, 9)),
        ];
        let all: Vec<Bridge::MessageDelivered> = decode_logs(&logs, None);
        assert_eq!(all.len(), 2);
        let filtered: Vec<Bridge::MessageDelivered> = decode_logs(&logs, Some(bridge));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].messageIndex, U256::from(1u64));
    }

    #[test]
    fn test_decode_logs_skips_other_events() {
        let log = Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: LogData::new_unchecked(vec![B256::repeat_byte(0xee)], Bytes::new()),
            },
            ..Default::default()
        };
        let decoded: Vec<Bridge::MessageDelivered> = decode_logs(&[log], None);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_redeem_scheduled_from_receipt() {
        let event = ArbRetryableTx::RedeemScheduled {
            ticketId: B256::repeat_byte(1),
            retryTxHash: B256::repeat_byte(2),
            sequenceNum: 0,
            donatedGas: 100_000,
            gasDonor: Address::repeat_byte(3),
            maxRefund: U256::ZERO,
            submissionFeeRefund: U256::ZERO,
        };
        let receipt = make_receipt(
            B256::repeat_byte(1),
            7,
            true,
            vec![
                make_log(ARB_RETRYABLE_TX_ADDRESS, &event),
                make_log(Address::repeat_byte(9), &event),
            ],
        );
        let found = redeem_scheduled(&receipt);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].retryTxHash, B256::repeat_byte(2));
    }

    #[test]
    fn test_block_chunks() {
        assert_eq!(block_chunks(0, 9, 5), vec![(0, 4), (5, 9)]);
        assert_eq!(block_chunks(10, 12, 100), vec![(10, 12)]);
        assert_eq!(block_chunks(5, 4, 10), Vec::<(u64, u64)>::new());
        assert_eq!(block_chunks(1, 3, 0), vec![(1, 1), (2, 2), (3, 3)]);
    }
}
