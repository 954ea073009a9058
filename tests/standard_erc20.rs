//! Standard ERC20 Integration Test
//!
//! Deposits, manual redeems and a withdrawal of a standard-gateway token
//! against a running parent/child pair.
//!
//! ## Setup
//!
//! Requires a Nitro local dev node (or any registered pair) with a test token
//! deployed on the parent chain and minted to the signer. Set:
//!
//! - `PARENT_RPC_URL`, `CHILD_RPC_URL`, `CHILD_CHAIN_ID`
//! - `PARENT_PRIVATE_KEY`, `CHILD_PRIVATE_KEY` (funded on both chains)
//! - `TEST_TOKEN_ADDRESS` - parent token, at least 500 units held by the signer
//! - `CUSTOM_TOKEN_ADDRESS`, `CUSTOM_CHILD_TOKEN_ADDRESS` - optional, an
//!   already registered custom token pair
//!
//! ## Running
//!
//! ```bash
//! cargo test --features testing --test standard_erc20 -- --ignored --nocapture --test-threads=1
//! ```

use std::str::FromStr;

use alloy::primitives::{Address, U256};
use rollup_bridge_rs::bridger::{Erc20DepositParams, Erc20WithdrawParams};
use rollup_bridge_rs::error::BridgeError;
use rollup_bridge_rs::evm::client::ChainProvider;
use rollup_bridge_rs::gas::{GasLimitOverride, GasOverrides, PercentIncrease};
use rollup_bridge_rs::message::{RedeemOverrides, RetryableTicket, WithdrawalStatus};
use rollup_bridge_rs::testing::{
    assert_balance_increased, assert_retry_receipt, assert_status_eq, instantiate_bridge,
    TestBridge,
};
use rollup_bridge_rs::types::{GatewayKind, MessageStatus};

const DEPOSIT_AMOUNT: u64 = 100;
const WITHDRAWAL_AMOUNT: u64 = 10;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollup_bridge_rs=info".into()),
        )
        .with_test_writer()
        .try_init();
}

fn env_address(key: &str) -> Option<Address> {
    std::env::var(key)
        .ok()
        .and_then(|value| Address::from_str(value.trim()).ok())
}

fn test_token() -> Address {
    env_address("TEST_TOKEN_ADDRESS").expect("TEST_TOKEN_ADDRESS must be set")
}

/// Auto-redeem gas based on `gas_limit` and `max_fee_per_gas` with the usual margins
fn low_gas(gas_limit: u64, max_fee_per_gas: u64) -> GasOverrides {
    GasOverrides {
        gas_limit: GasLimitOverride {
            limit: PercentIncrease::with_base(U256::from(gas_limit)),
            min: None,
        },
        max_fee_per_gas: PercentIncrease::with_base(U256::from(max_fee_per_gas)),
        ..Default::default()
    }
}

/// Approve, deposit and wait for the ticket to reach `expected`
async fn deposit_token<PP: ChainProvider, CP: ChainProvider>(
    bridge: &TestBridge<PP, CP>,
    token: Address,
    overrides: GasOverrides,
    expected: MessageStatus,
) -> RetryableTicket<CP> {
    let erc20 = &bridge.erc20_bridger;
    let signer = bridge.context.parent.signer_address().unwrap();
    let amount = U256::from(DEPOSIT_AMOUNT);

    erc20.approve_token(token, None, None).await.unwrap();
    let parent_before = erc20.parent_token_balance(token, signer).await.unwrap();

    let params = Erc20DepositParams {
        parent_token: token,
        amount,
        destination: None,
        overrides,
    };
    let result = erc20.deposit(params, None).await.unwrap();
    assert_eq!(result.route.kind, GatewayKind::Standard);

    let parent_after = erc20.parent_token_balance(token, signer).await.unwrap();
    assert_eq!(parent_before - parent_after, amount);

    let ticket = bridge.context.ticket_for(&result.message);
    let state = ticket
        .wait_for_status(&[expected], None, None)
        .await
        .unwrap();
    assert_status_eq(&state, expected).unwrap();
    ticket
}

/// Redeem manually and check the retry ran in the same block against the child gateway
async fn redeem_and_check<CP: ChainProvider>(
    ticket: &RetryableTicket<CP>,
    child_gateway: Address,
    gas_limit: Option<u64>,
    expected_success: bool,
) {
    let overrides = RedeemOverrides {
        gas_limit,
        ..Default::default()
    };
    let handle = ticket.redeem(overrides, None).await.unwrap();
    let retry = handle.wait_for_redeem(None).await.unwrap();
    assert_retry_receipt(
        &retry,
        handle.receipt().block_hash,
        child_gateway,
        expected_success,
    )
    .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_deposit_auto_redeemed() {
    init_tracing();
    let bridge = instantiate_bridge().unwrap();
    let token = test_token();
    let signer = bridge.context.child.signer_address().unwrap();

    let child_before = bridge
        .erc20_bridger
        .child_token_balance(token, signer)
        .await
        .unwrap_or(U256::ZERO);

    deposit_token(&bridge, token, GasOverrides::default(), MessageStatus::Redeemed).await;

    let child_after = bridge
        .erc20_bridger
        .child_token_balance(token, signer)
        .await
        .unwrap();
    assert_balance_increased(child_before, child_after, U256::from(DEPOSIT_AMOUNT)).unwrap();
}

#[tokio::test]
#[ignore]
async fn test_deposit_no_funds_manual_redeem() {
    init_tracing();
    let bridge = instantiate_bridge().unwrap();
    let gateway = bridge.network.token_bridge().l2_erc20_gateway;

    let ticket = deposit_token(
        &bridge,
        test_token(),
        GasOverrides::skip_auto_redeem(),
        MessageStatus::FundsDepositedOnL2,
    )
    .await;

    redeem_and_check(&ticket, gateway, None, true).await;
    assert_status_eq(&ticket.status().await.unwrap(), MessageStatus::Redeemed).unwrap();
}

#[tokio::test]
#[ignore]
async fn test_deposit_low_funds_manual_redeem() {
    init_tracing();
    let bridge = instantiate_bridge().unwrap();
    let gateway = bridge.network.token_bridge().l2_erc20_gateway;

    let ticket = deposit_token(
        &bridge,
        test_token(),
        low_gas(5, 5),
        MessageStatus::FundsDepositedOnL2,
    )
    .await;

    redeem_and_check(&ticket, gateway, None, true).await;
}

#[tokio::test]
#[ignore]
async fn test_deposit_low_funds_failed_redeem_then_success() {
    init_tracing();
    let bridge = instantiate_bridge().unwrap();
    let gateway = bridge.network.token_bridge().l2_erc20_gateway;

    let ticket = deposit_token(
        &bridge,
        test_token(),
        low_gas(5, 5),
        MessageStatus::FundsDepositedOnL2,
    )
    .await;

    // Not enough gas for the retry
    redeem_and_check(&ticket, gateway, Some(130_000), false).await;
    assert_status_eq(
        &ticket.status().await.unwrap(),
        MessageStatus::FundsDepositedOnL2,
    )
    .unwrap();

    redeem_and_check(&ticket, gateway, None, true).await;

    let again = ticket.redeem(RedeemOverrides::default(), None).await;
    assert!(matches!(again, Err(BridgeError::AlreadyRedeemed(_))));
}

#[tokio::test]
#[ignore]
async fn test_withdraw_erc20() {
    init_tracing();
    let bridge = instantiate_bridge().unwrap();
    let token = test_token();
    let signer = bridge.context.child.signer_address().unwrap();
    let amount = U256::from(WITHDRAWAL_AMOUNT);

    let child_before = bridge
        .erc20_bridger
        .child_token_balance(token, signer)
        .await
        .unwrap();
    assert!(child_before >= amount, "deposit before withdrawing");

    let params = Erc20WithdrawParams {
        parent_token: token,
        amount,
        destination: None,
    };
    let result = bridge.erc20_bridger.withdraw(params, None).await.unwrap();
    assert_eq!(result.route.kind, GatewayKind::Standard);
    assert_eq!(result.withdrawal.record.destination, result.route.parent_gateway());

    let child_after = bridge
        .erc20_bridger
        .child_token_balance(token, signer)
        .await
        .unwrap();
    assert_eq!(child_before - child_after, amount);

    let status = result
        .withdrawal
        .status(&bridge.context.parent, &bridge.network)
        .await
        .unwrap();
    assert_eq!(status, WithdrawalStatus::Unconfirmed);
}

#[tokio::test]
#[ignore]
async fn test_register_custom_token_twice() {
    init_tracing();
    let (Some(parent_token), Some(child_token)) = (
        env_address("CUSTOM_TOKEN_ADDRESS"),
        env_address("CUSTOM_CHILD_TOKEN_ADDRESS"),
    ) else {
        eprintln!("CUSTOM_TOKEN_ADDRESS / CUSTOM_CHILD_TOKEN_ADDRESS not set, skipping");
        return;
    };
    let bridge = instantiate_bridge().unwrap();
    let admin = &bridge.admin_erc20_bridger;

    if !admin.is_registered(parent_token).await.unwrap() {
        let result = admin
            .register_custom_token(
                parent_token,
                child_token,
                GasOverrides::default(),
                GasOverrides::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.messages.len(), 2);
        for message in &result.messages {
            let ticket = bridge.context.ticket_for(message);
            let state = ticket
                .wait_for_status(&[MessageStatus::Redeemed], None, None)
                .await
                .unwrap();
            assert_status_eq(&state, MessageStatus::Redeemed).unwrap();
        }
    }

    let second = admin
        .register_custom_token(
            parent_token,
            child_token,
            GasOverrides::default(),
            GasOverrides::default(),
            None,
        )
        .await;
    assert!(matches!(second, Err(BridgeError::AlreadyRegistered(t)) if t == parent_token));
}
