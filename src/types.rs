//! Common types for parent/child cross-chain operations
//!
//! These are the values that flow between the gateway resolver, the bridgers,
//! the message tracker and the retryable ticket handle.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    rpc::types::TransactionReceipt,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::status::TicketState;

// ============================================================================
// Message status
// ============================================================================

/// Lifecycle status of a retryable ticket on the child chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// The parent-chain message exists but the ticket is not on the child chain yet
    NotYetCreated,
    /// The ticket creation transaction reverted on the child chain
    CreationFailed,
    /// The ticket exists and holds funds but has not been executed
    FundsDepositedOnL2,
    /// A redemption (auto or manual) executed the ticket successfully
    Redeemed,
    /// The ticket lifetime elapsed without a successful redemption
    Expired,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::NotYetCreated => "NOT_YET_CREATED",
            MessageStatus::CreationFailed => "CREATION_FAILED",
            MessageStatus::FundsDepositedOnL2 => "FUNDS_DEPOSITED_ON_L2",
            MessageStatus::Redeemed => "REDEEMED",
            MessageStatus::Expired => "EXPIRED",
        }
    }

    /// Terminal statuses never change once observed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageStatus::CreationFailed | MessageStatus::Redeemed | MessageStatus::Expired
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Inbox message kinds
// ============================================================================

/// Kind byte recorded by the bridge for each delayed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// `L1MessageType_submitRetryableTx`
    SubmitRetryable,
    /// `L1MessageType_ethDeposit`
    EthDeposit,
    /// `L2MessageType` batch/signed tx or anything else
    Other(u8),
}

impl MessageKind {
    pub const SUBMIT_RETRYABLE: u8 = 9;
    pub const ETH_DEPOSIT: u8 = 12;

    pub fn from_u8(kind: u8) -> Self {
        match kind {
            Self::SUBMIT_RETRYABLE => MessageKind::SubmitRetryable,
            Self::ETH_DEPOSIT => MessageKind::EthDeposit,
            other => MessageKind::Other(other),
        }
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            MessageKind::SubmitRetryable => Self::SUBMIT_RETRYABLE,
            MessageKind::EthDeposit => Self::ETH_DEPOSIT,
            MessageKind::Other(k) => *k,
        }
    }
}

// ============================================================================
// Gateway routing
// ============================================================================

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Parent chain to child chain
    Deposit,
    /// Child chain to parent chain
    Withdraw,
}

/// Which gateway class governs a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayKind {
    /// Default ERC20 gateway, child token deployed by the gateway on first deposit
    Standard,
    /// Token registered against a custom gateway with its own child token
    Custom,
    /// Wrapped native currency, unwrapped and re-wrapped across the bridge
    WrappedNative,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Standard => "standard",
            GatewayKind::Custom => "custom",
            GatewayKind::WrappedNative => "wrapped_native",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved route for a token in one direction
///
/// Recomputed per call; two resolutions for the same token and chain pair
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatewayRoute {
    pub direction: Direction,
    pub kind: GatewayKind,
    /// Gateway on the chain the transfer starts from
    pub source_gateway: Address,
    /// Counterpart gateway on the chain the transfer lands on
    pub dest_gateway: Address,
    /// Token address on the parent chain
    pub parent_token: Address,
    /// Deterministic counterpart token address on the child chain
    pub child_token: Address,
}

impl GatewayRoute {
    /// Gateway on the parent chain, whatever the direction
    pub fn parent_gateway(&self) -> Address {
        match self.direction {
            Direction::Deposit => self.source_gateway,
            Direction::Withdraw => self.dest_gateway,
        }
    }

    /// Gateway on the child chain, whatever the direction
    pub fn child_gateway(&self) -> Address {
        match self.direction {
            Direction::Deposit => self.dest_gateway,
            Direction::Withdraw => self.source_gateway,
        }
    }

    /// The same route travelled the other way
    pub fn reversed(&self) -> Self {
        Self {
            direction: match self.direction {
                Direction::Deposit => Direction::Withdraw,
                Direction::Withdraw => Direction::Deposit,
            },
            source_gateway: self.dest_gateway,
            dest_gateway: self.source_gateway,
            ..*self
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// A delayed message created by a mined parent-chain transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedMessage {
    pub source_tx_hash: B256,
    pub source_block_hash: B256,
    pub source_block_number: u64,
    /// Monotonic sequence number assigned by the bridge
    pub message_number: U256,
    /// Sender as recorded by the bridge (aliased for contract senders)
    pub sender: Address,
    pub kind: MessageKind,
    pub dest_chain_id: u64,
    /// Parent-chain base fee recorded with the message
    pub base_fee_l1: U256,
    pub timestamp: u64,
}

/// Everything known about a retryable ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableTicketRecord {
    pub ticket_id: B256,
    pub dest_address: Address,
    pub l2_call_value: U256,
    /// Total value sent with the parent-chain message
    pub l1_value: U256,
    pub max_submission_cost: U256,
    pub excess_fee_refund_address: Address,
    pub call_value_refund_address: Address,
    pub gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub data: Bytes,
    pub call_data_hash: B256,
    pub auto_redeem_attempted: bool,
    pub state: TicketState,
}

/// A plain ETH deposit message (no ticket, no redemption)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthDepositRecord {
    pub to: Address,
    pub value: U256,
    /// Hash of the deposit transaction the child chain will include
    pub deposit_tx_id: B256,
}

/// Source-chain transaction and the message it produced (if any)
#[derive(Debug, Clone)]
pub struct BridgeTransactionPair {
    pub source_tx: TransactionReceipt,
    pub dest_message: Option<SubmittedMessage>,
}

/// A child-to-parent message emitted by `ArbSys` during a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub child_tx_hash: B256,
    pub caller: Address,
    pub destination: Address,
    pub hash: U256,
    /// Position in the send merkle tree, used as the outbox index
    pub position: U256,
    pub arb_block_num: U256,
    pub eth_block_num: U256,
    pub timestamp: U256,
    pub callvalue: U256,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_as_str() {
        assert_eq!(MessageStatus::NotYetCreated.as_str(), "NOT_YET_CREATED");
        assert_eq!(MessageStatus::CreationFailed.as_str(), "CREATION_FAILED");
        assert_eq!(
            MessageStatus::FundsDepositedOnL2.as_str(),
            "FUNDS_DEPOSITED_ON_L2"
        );
        assert_eq!(MessageStatus::Redeemed.as_str(), "REDEEMED");
        assert_eq!(MessageStatus::Expired.as_str(), "EXPIRED");
    }

    #[test]
    fn test_message_status_terminal() {
        assert!(!MessageStatus::NotYetCreated.is_terminal());
        assert!(!MessageStatus::FundsDepositedOnL2.is_terminal());
        assert!(MessageStatus::CreationFailed.is_terminal());
        assert!(MessageStatus::Redeemed.is_terminal());
        assert!(MessageStatus::Expired.is_terminal());
    }

    #[test]
    fn test_message_status_serde() {
        let json = serde_json::to_string(&MessageStatus::FundsDepositedOnL2).unwrap();
        assert_eq!(json, "\"FUNDS_DEPOSITED_ON_L2\"");
    }

    #[test]
    fn test_message_kind_from_u8() {
        assert_eq!(MessageKind::from_u8(9), MessageKind::SubmitRetryable);
        assert_eq!(MessageKind::from_u8(12), MessageKind::EthDeposit);
        assert_eq!(MessageKind::from_u8(3), MessageKind::Other(3));
        assert_eq!(MessageKind::Other(3).to_u8(), 3);
    }

    #[test]
    fn test_route_reversed() {
        let route = GatewayRoute {
            direction: Direction::Deposit,
            kind: GatewayKind::Standard,
            source_gateway: Address::repeat_byte(1),
            dest_gateway: Address::repeat_byte(2),
            parent_token: Address::repeat_byte(3),
            child_token: Address::repeat_byte(4),
        };
        let back = route.reversed();
        assert_eq!(back.direction, Direction::Withdraw);
        assert_eq!(back.parent_gateway(), route.parent_gateway());
        assert_eq!(back.child_gateway(), route.child_gateway());
        assert_eq!(back.reversed(), route);
    }
}
