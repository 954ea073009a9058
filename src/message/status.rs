//! Retryable ticket lifecycle
//!
//! ```text
//! NOT_YET_CREATED ──► CREATION_FAILED
//!        │
//!        ├──────────► FUNDS_DEPOSITED_ON_L2 ──► REDEEMED
//!        │                   │
//!        │                   └──────────────► EXPIRED
//!        └──────────► REDEEMED   (auto-redeem in the creation tx)
//! ```
//!
//! Each state carries the evidence it was derived from, so a redeemed ticket
//! always knows the transaction that redeemed it.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::types::MessageStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketState {
    NotYetCreated,
    CreationFailed {
        /// Child-chain hash of the reverted ticket creation
        creation_tx: B256,
    },
    #[serde(rename = "FUNDS_DEPOSITED_ON_L2")]
    FundsDeposited {
        creation_tx: B256,
        /// Unix timestamp after which the ticket expires
        timeout: u64,
    },
    Redeemed {
        creation_tx: B256,
        /// The retry transaction that executed successfully
        redeem_tx: B256,
    },
    Expired {
        creation_tx: B256,
    },
}

impl TicketState {
    pub fn status(&self) -> MessageStatus {
        match self {
            TicketState::NotYetCreated => MessageStatus::NotYetCreated,
            TicketState::CreationFailed { .. } => MessageStatus::CreationFailed,
            TicketState::FundsDeposited { .. } => MessageStatus::FundsDepositedOnL2,
            TicketState::Redeemed { .. } => MessageStatus::Redeemed,
            TicketState::Expired { .. } => MessageStatus::Expired,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn creation_tx(&self) -> Option<B256> {
        match self {
            TicketState::NotYetCreated => None,
            TicketState::CreationFailed { creation_tx }
            | TicketState::FundsDeposited { creation_tx, .. }
            | TicketState::Redeemed { creation_tx, .. }
            | TicketState::Expired { creation_tx } => Some(*creation_tx),
        }
    }

    pub fn redeem_tx(&self) -> Option<B256> {
        match self {
            TicketState::Redeemed { redeem_tx, .. } => Some(*redeem_tx),
            _ => None,
        }
    }

    /// Validate and apply an observed state
    ///
    /// Self-loops are always allowed (the same status observed twice, possibly
    /// with a refreshed timeout after a keepalive).
    pub fn transition(&self, next: TicketState) -> Result<TicketState, BridgeError> {
        if can_transition(self.status(), next.status()) {
            Ok(next)
        } else {
            Err(BridgeError::InvalidTransition {
                from: self.status(),
                to: next.status(),
            })
        }
    }
}

/// Whether the lifecycle allows moving from `from` to `to`
pub fn can_transition(from: MessageStatus, to: MessageStatus) -> bool {
    use MessageStatus::*;

    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (NotYetCreated, CreationFailed)
            | (NotYetCreated, FundsDepositedOnL2)
            | (NotYetCreated, Redeemed)
            | (FundsDepositedOnL2, Redeemed)
            | (FundsDepositedOnL2, Expired)
    )
}
