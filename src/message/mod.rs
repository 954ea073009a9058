//! Cross-chain messages
//!
//! Discovery of messages in parent-chain receipts, the retryable ticket
//! lifecycle and the handles used to act on tickets, ETH deposits and
//! withdrawals.

pub mod eth_deposit;
pub mod parent_receipt;
pub mod retryable_data;
pub mod status;
pub mod ticket;
pub mod tracker;
pub mod withdrawal;

pub use eth_deposit::EthDepositMessage;
pub use parent_receipt::{ParentToChildMessage, ParentTransactionReceipt};
pub use retryable_data::RetryableTicketParams;
pub use status::TicketState;
pub use ticket::{RedeemHandle, RedeemOverrides, RetryableTicket};
pub use tracker::{
    ChainStatusSource, CreationReceipt, MessageStatusTracker, StatusSource, TicketReader,
};
pub use withdrawal::{WithdrawalMessage, WithdrawalStatus};
