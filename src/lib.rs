//! Rollup-Bridge-RS: Parent/Child Rollup Bridge Client
//!
//! Client library for moving assets between a parent chain (L1) and an
//! optimistic rollup child chain (L2) through retryable tickets:
//!
//! - **Networks** - Registry of parent/child pairs and their contract addresses
//! - **Hash Computation** - Client-side retryable ticket and deposit ids
//! - **Gas** - Submission fee, gas limit and max fee estimation with overrides
//! - **Messages** - Ticket discovery, status tracking, redemption, withdrawals
//! - **Bridgers** - ETH, ERC20 and custom-token admin flows over the gateway router
//! - **Inbox** - Direct retryable submission and force inclusion of delayed messages
//! - **Testing Module** - Helpers for integration tests against a live pair
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! rollup-bridge-rs = { path = "../rollup-bridge-rs" }
//! ```
//!
//! ## Feature Flags
//!
//! - `testing` - Enable testing utilities for integration tests

// Core modules
pub mod config;
pub mod error;
pub mod gas;
pub mod hash;
pub mod networks;
pub mod poll;
pub mod types;

// Chain access and bridge flows
pub mod bridger;
pub mod evm;
pub mod inbox;
pub mod message;

// Testing utilities (feature-gated)
#[cfg(feature = "testing")]
pub mod testing;

// Re-export commonly used items at the crate root
pub use bridger::{
    AdminErc20Bridger, BridgeContext, Erc20Bridger, EthBridger, GatewayResolver, KnownGateway,
};
pub use config::{BridgeConfig, ConnectionConfig};
pub use error::{BridgeError, ErrorClass};
pub use gas::{GasEstimator, GasOverrides, RetryableGasParams};
pub use hash::{apply_alias, compute_eth_deposit_id, compute_retryable_ticket_id, undo_alias};
pub use inbox::{ForceIncludableMessage, InboxForcer};
pub use message::{
    MessageStatusTracker, ParentToChildMessage, ParentTransactionReceipt, RedeemOverrides,
    RetryableTicket, RetryableTicketParams, TicketState, WithdrawalMessage,
};
pub use networks::{ChainPair, L1Network, L2Network, NetworkPair, NetworkRegistry};
pub use poll::{CancelToken, PollConfig};
pub use types::{Direction, GatewayKind, GatewayRoute, MessageKind, MessageStatus};
