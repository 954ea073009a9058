//! Common Test Assertions
//!
//! Assertion helpers for integration tests against live parent/child chains.

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::TransactionReceipt,
};
use eyre::{eyre, Result};

use crate::message::status::TicketState;
use crate::types::MessageStatus;

/// Assert that a ticket reached the expected status
pub fn assert_status_eq(actual: &TicketState, expected: MessageStatus) -> Result<()> {
    if actual.status() != expected {
        return Err(eyre!(
            "Ticket status mismatch: expected {}, got {} ({:?})",
            expected,
            actual.status(),
            actual
        ));
    }
    Ok(())
}

/// Assert that a retry receipt ran in the redeem's block, against `to`, with the given outcome
pub fn assert_retry_receipt(
    retry: &TransactionReceipt,
    redeem_block_hash: Option<B256>,
    expected_to: Address,
    expected_success: bool,
) -> Result<()> {
    if retry.block_hash != redeem_block_hash {
        return Err(eyre!(
            "Retry executed in block {:?}, redeem mined in {:?}",
            retry.block_hash,
            redeem_block_hash
        ));
    }
    if retry.to != Some(expected_to) {
        return Err(eyre!(
            "Retry target mismatch: expected {}, got {:?}",
            expected_to,
            retry.to
        ));
    }
    if retry.status() != expected_success {
        return Err(eyre!(
            "Retry outcome mismatch: expected success={}, got success={}",
            expected_success,
            retry.status()
        ));
    }
    Ok(())
}

/// Assert that a balance increased by exactly `expected_increase`
pub fn assert_balance_increased(
    balance_before: U256,
    balance_after: U256,
    expected_increase: U256,
) -> Result<()> {
    let actual_increase = balance_after.saturating_sub(balance_before);
    if actual_increase != expected_increase {
        return Err(eyre!(
            "Balance increase mismatch: expected {}, got {} (before: {}, after: {})",
            expected_increase,
            actual_increase,
            balance_before,
            balance_after
        ));
    }
    Ok(())
}

/// Assert that a balance decreased by `expected_decrease`, allowing for fees
pub fn assert_balance_decreased(
    balance_before: U256,
    balance_after: U256,
    expected_decrease: U256,
    fee_tolerance: U256,
) -> Result<()> {
    let actual_decrease = balance_before.saturating_sub(balance_after);
    let max_decrease = expected_decrease.saturating_add(fee_tolerance);

    if actual_decrease < expected_decrease || actual_decrease > max_decrease {
        return Err(eyre!(
            "Balance decrease mismatch: expected {} + up to {}, got {} (before: {}, after: {})",
            expected_decrease,
            fee_tolerance,
            actual_decrease,
            balance_before,
            balance_after
        ));
    }
    Ok(())
}

/// Wait for a condition to be true, with timeout and polling
pub async fn wait_for_condition<F, Fut>(
    condition_name: &str,
    check_fn: F,
    timeout_secs: u64,
    poll_interval_ms: u64,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);
    let poll_interval = std::time::Duration::from_millis(poll_interval_ms);

    loop {
        match check_fn().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Error checking condition {}", condition_name);
            }
        }

        if start.elapsed() >= timeout {
            return Err(eyre!(
                "Timeout waiting for condition '{}' after {}s",
                condition_name,
                timeout_secs
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
