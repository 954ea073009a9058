//! Bridge error taxonomy
//!
//! Every fallible operation in the crate returns [`BridgeError`]. Each variant
//! belongs to one [`ErrorClass`], which tells the caller whether the failure is a
//! configuration problem, a transient chain problem worth retrying, or a
//! protocol-state answer about the ticket/registration it asked about.

use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use crate::types::MessageStatus;

/// Coarse classification used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Unregistered/mismatched networks, unsupported gateways. Never retried.
    Configuration,
    /// RPC timeouts, not-yet-mined transactions. Retried inside polling loops.
    Transient,
    /// The ticket or registration is in a state that forbids the call.
    ProtocolState,
    /// Bad input or insufficient balance on the caller's side.
    Caller,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------
    #[error("Unrecognized network {0}")]
    UnknownNetwork(u64),

    #[error("Network {child} declares partner {declared_parent}, but that parent does not list it")]
    ChainPairMismatch { child: u64, declared_parent: u64 },

    #[error("Network {0} already included")]
    NetworkAlreadyRegistered(u64),

    #[error("Custom network {0} must have is_custom set to true")]
    NotCustomNetwork(u64),

    #[error("Token {0} has no registered gateway route")]
    TokenNotBridgeable(Address),

    #[error("Gateway {gateway} for token {token} is not a supported gateway")]
    UnsupportedGateway { token: Address, gateway: Address },

    #[error("Operation requires a signer but the client is read-only")]
    MissingSigner,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Max submission cost {supplied} is below the required {required}")]
    InsufficientSubmissionCost { required: U256, supplied: U256 },

    // ------------------------------------------------------------------
    // Transient
    // ------------------------------------------------------------------
    #[error("RPC error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    #[error("Contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("Pending transaction failed: {0}")]
    PendingTx(#[from] alloy::providers::PendingTransactionError),

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    MessageTimeout { what: String, timeout_ms: u64 },

    // ------------------------------------------------------------------
    // Protocol state
    // ------------------------------------------------------------------
    #[error("Retryable ticket {0} was already redeemed")]
    AlreadyRedeemed(B256),

    #[error("Retryable ticket {0} has expired")]
    Expired(B256),

    #[error("Token {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("Retryable ticket {ticket_id} cannot be redeemed while {status}")]
    TicketNotRedeemable { ticket_id: B256, status: MessageStatus },

    #[error("Invalid ticket transition from {from} to {to}")]
    InvalidTransition { from: MessageStatus, to: MessageStatus },

    // ------------------------------------------------------------------
    // Caller-side
    // ------------------------------------------------------------------
    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: U256, available: U256 },

    #[error("Insufficient allowance for {spender}: need {required}, have {available}")]
    InsufficientAllowance {
        spender: Address,
        required: U256,
        available: U256,
    },

    #[error("No cross-chain message found in transaction {0}")]
    NoMessageFound(B256),

    #[error("Redeem transaction {0} did not schedule a retry")]
    NoRedeemScheduled(B256),

    #[error("Transaction {0} reverted")]
    TransactionReverted(B256),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to decode {0}")]
    Decode(String),
}

impl BridgeError {
    /// The class this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::UnknownNetwork(_)
            | BridgeError::ChainPairMismatch { .. }
            | BridgeError::NetworkAlreadyRegistered(_)
            | BridgeError::NotCustomNetwork(_)
            | BridgeError::TokenNotBridgeable(_)
            | BridgeError::UnsupportedGateway { .. }
            | BridgeError::MissingSigner
            | BridgeError::InvalidConfig(_)
            | BridgeError::InsufficientSubmissionCost { .. } => ErrorClass::Configuration,

            BridgeError::Rpc(e) => classify_error(&e.to_string()),
            BridgeError::Contract(e) => classify_error(&e.to_string()),
            BridgeError::PendingTx(e) => classify_error(&e.to_string()),
            BridgeError::MessageTimeout { .. } => ErrorClass::Transient,

            BridgeError::AlreadyRedeemed(_)
            | BridgeError::Expired(_)
            | BridgeError::AlreadyRegistered(_)
            | BridgeError::TicketNotRedeemable { .. }
            | BridgeError::InvalidTransition { .. } => ErrorClass::ProtocolState,

            BridgeError::InsufficientFunds { .. }
            | BridgeError::InsufficientAllowance { .. }
            | BridgeError::NoMessageFound(_)
            | BridgeError::NoRedeemScheduled(_)
            | BridgeError::TransactionReverted(_)
            | BridgeError::Cancelled
            | BridgeError::Decode(_) => ErrorClass::Caller,
        }
    }

    /// Whether a polling loop should swallow this error and try again
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Whether the error is an EVM revert of a read-only call
    ///
    /// Used to tell "the precompile says no such ticket" apart from a dead RPC.
    pub fn is_revert(&self) -> bool {
        let msg = self.to_string().to_lowercase();
        msg.contains("revert")
    }

    /// Whether a call came back with no data, as calls to non-contracts do
    pub fn is_empty_return(&self) -> bool {
        self.to_string().contains("returned no data")
    }
}

/// Classify a chain error message for retry decisions
///
/// Reverts and bad input are permanent. Everything else (timeouts, rate
/// limits, nonce races, unknown messages) is transient so that polling keeps
/// going until the caller's time budget runs out.
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("reverted")
        || error_lower.contains("invalid signature")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("invalid parameters")
        || error_lower.contains("abi decode")
    {
        return ErrorClass::Caller;
    }

    ErrorClass::Transient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transient_errors() {
        assert_eq!(classify_error("connection refused"), ErrorClass::Transient);
        assert_eq!(classify_error("request timed out"), ErrorClass::Transient);
        assert_eq!(classify_error("HTTP 503"), ErrorClass::Transient);
        assert_eq!(classify_error("Too Many Requests"), ErrorClass::Transient);
    }

    #[test]
    fn test_classify_permanent_errors() {
        assert_eq!(classify_error("execution reverted: NoTicketWithID"), ErrorClass::Caller);
        assert_eq!(
            classify_error("insufficient funds for gas * price + value"),
            ErrorClass::Caller
        );
    }

    #[test]
    fn test_unknown_errors_are_retried() {
        assert_eq!(classify_error("something odd happened"), ErrorClass::Transient);
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            BridgeError::UnknownNetwork(1).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            BridgeError::AlreadyRedeemed(B256::ZERO).class(),
            ErrorClass::ProtocolState
        );
        assert_eq!(
            BridgeError::AlreadyRegistered(Address::ZERO).class(),
            ErrorClass::ProtocolState
        );
        assert!(BridgeError::MessageTimeout {
            what: "ticket".into(),
            timeout_ms: 10
        }
        .is_transient());
        assert!(!BridgeError::Cancelled.is_transient());
    }

    #[test]
    fn test_is_revert() {
        let err = BridgeError::Decode("execution reverted".into());
        assert!(err.is_revert());
        assert!(!BridgeError::Cancelled.is_revert());
    }

    #[test]
    fn test_is_empty_return() {
        let err = BridgeError::Decode("call to `counterpartGateway` returned no data (\"0x\")".into());
        assert!(err.is_empty_return());
        assert!(!BridgeError::Decode("bytes32".into()).is_empty_return());
    }
}
