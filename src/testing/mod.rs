//! Testing Utilities Module
//!
//! Helpers for integration tests that run against a live parent/child pair,
//! usually the Nitro local dev node.
//!
//! ## Submodules
//!
//! - `setup` - Build every bridger from environment variables
//! - `assertions` - Common test assertions

pub mod assertions;
pub mod setup;

// Re-export commonly used items
pub use assertions::*;
pub use setup::*;
