//! EVM Chain Support Module
//!
//! Everything that talks to a parent or child chain node directly.
//!
//! ## Submodules
//!
//! - `client` - RPC client wrapper bound to a chain id and optional signer
//! - `contracts` - Bridge, gateway and precompile bindings using alloy sol! macro
//! - `events` - Event parsing for delayed messages, redeems and withdrawals
//! - `tokens` - ERC20 balance/allowance/approve helpers

pub mod client;
pub mod contracts;
pub mod events;
pub mod tokens;

// Re-export commonly used items
pub use client::{
    connect_read_only, connect_with_signer, BlockSummary, ChainClient, ChainProvider,
    ReadOnlyProvider,
};
pub use contracts::{ArbRetryableTx, ArbSys, Bridge, Inbox, ERC20};
pub use events::{block_chunks, decode_logs, delivered_messages, DeliveredMessage};
pub use tokens::{approve, token_allowance, token_balance, token_info, TokenInfo};
