//! Custom token registration and router administration
//!
//! Registering a custom token creates two retryable tickets in one parent
//! transaction: one telling the child custom gateway about the token pair and
//! one telling the child router which gateway handles the token.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use tracing::{debug, info};

use crate::bridger::erc20::Erc20Bridger;
use crate::bridger::BridgeContext;
use crate::error::BridgeError;
use crate::evm::client::ChainProvider;
use crate::evm::contracts::{
    ArbToken, CustomToken, L1CustomGateway, L1GatewayRouter, L1TokenGateway, L2CustomGateway,
    L2GatewayRouter, ARBITRUM_ENABLED, DISABLED_GATEWAY,
};
use crate::gas::{required_deposit, GasOverrides, RetryableGasParams, RetryableRequest};
use crate::message::parent_receipt::{ParentToChildMessage, ParentTransactionReceipt};
use crate::poll::CancelToken;
use crate::types::BridgeTransactionPair;

#[derive(Debug, Clone)]
pub struct RegisterCustomTokenResult {
    pub transaction: BridgeTransactionPair,
    /// Custom gateway ticket first, router ticket second
    pub messages: Vec<ParentToChildMessage>,
    pub gateway_gas: RetryableGasParams,
    pub router_gas: RetryableGasParams,
}

#[derive(Debug, Clone)]
pub struct SetGatewaysResult {
    pub transaction: BridgeTransactionPair,
    pub message: ParentToChildMessage,
    pub gas: RetryableGasParams,
}

/// Calldata the custom gateway sends to its child counterpart
pub fn register_token_from_l1_calldata(parent_token: Address, child_token: Address) -> Bytes {
    L2CustomGateway::registerTokenFromL1Call {
        l1Address: vec![parent_token],
        l2Address: vec![child_token],
    }
    .abi_encode()
    .into()
}

/// Calldata the parent router sends to the child router
pub fn set_gateway_calldata(tokens: Vec<Address>, child_gateways: Vec<Address>) -> Bytes {
    L2GatewayRouter::setGatewayCall {
        _l1Token: tokens,
        _gateway: child_gateways,
    }
    .abi_encode()
    .into()
}

/// Fail with [`BridgeError::AlreadyRegistered`] once either side maps the token
pub fn ensure_unregistered(
    parent_token: Address,
    custom_gateway_token: Address,
    router_gateway: Address,
) -> Result<(), BridgeError> {
    if !custom_gateway_token.is_zero() || !router_gateway.is_zero() {
        return Err(BridgeError::AlreadyRegistered(parent_token));
    }
    Ok(())
}

/// Reprice a ticket so it pays `max_fee_per_gas` per unit of gas
fn with_gas_price(gas: RetryableGasParams, max_fee_per_gas: U256) -> RetryableGasParams {
    RetryableGasParams {
        max_fee_per_gas,
        deposit: required_deposit(gas.gas_limit, max_fee_per_gas, gas.max_submission_cost, U256::ZERO),
        ..gas
    }
}

pub struct AdminErc20Bridger<PP, CP> {
    erc20: Erc20Bridger<PP, CP>,
}

impl<PP: ChainProvider, CP: ChainProvider> AdminErc20Bridger<PP, CP> {
    pub fn new(ctx: BridgeContext<PP, CP>) -> Self {
        Self {
            erc20: Erc20Bridger::new(ctx),
        }
    }

    /// The regular token operations
    pub fn erc20(&self) -> &Erc20Bridger<PP, CP> {
        &self.erc20
    }

    fn ctx(&self) -> &BridgeContext<PP, CP> {
        self.erc20.context()
    }

    /// Token the custom gateway maps `parent_token` to, and the router's gateway for it
    async fn registration_state(
        &self,
        parent_token: Address,
    ) -> Result<(Address, Address), BridgeError> {
        let ctx = self.ctx();
        let bridge = ctx.network.token_bridge();
        let custom_gateway = L1CustomGateway::new(bridge.l1_custom_gateway, ctx.parent.provider());
        let router = L1GatewayRouter::new(bridge.l1_gateway_router, ctx.parent.provider());

        let (mapped_token, gateway) = tokio::try_join!(
            async { Ok::<_, BridgeError>(custom_gateway.l1ToL2Token(parent_token).call().await?._0) },
            async { Ok::<_, BridgeError>(router.l1TokenToGateway(parent_token).call().await?._0) },
        )?;
        debug!(
            token = %parent_token,
            custom_gateway_token = %mapped_token,
            router_gateway = %gateway,
            "Registration state"
        );
        Ok((mapped_token, gateway))
    }

    /// Whether the custom gateway or the router already maps `parent_token`
    pub async fn is_registered(&self, parent_token: Address) -> Result<bool, BridgeError> {
        let (mapped_token, gateway) = self.registration_state(parent_token).await?;
        Ok(ensure_unregistered(parent_token, mapped_token, gateway).is_err())
    }

    /// Register a custom child token for `parent_token`
    ///
    /// Must be sent by the parent token itself calling into the gateways, so
    /// the signer drives `registerTokenOnL2` on the token contract.
    pub async fn register_custom_token(
        &self,
        parent_token: Address,
        child_token: Address,
        gateway_overrides: GasOverrides,
        router_overrides: GasOverrides,
        cancel: Option<&CancelToken>,
    ) -> Result<RegisterCustomTokenResult, BridgeError> {
        let ctx = self.ctx();
        let signer = ctx.parent.signer_address()?;
        let bridge = ctx.network.token_bridge();

        let (mapped_token, gateway) = self.registration_state(parent_token).await?;
        ensure_unregistered(parent_token, mapped_token, gateway)?;

        let enabled = CustomToken::new(parent_token, ctx.parent.provider())
            .isArbitrumEnabled()
            .call()
            .await?
            ._0;
        if enabled != ARBITRUM_ENABLED {
            return Err(BridgeError::InvalidConfig(format!(
                "token {} is not enabled for custom bridging (isArbitrumEnabled = {:#x})",
                parent_token, enabled
            )));
        }

        let child_l1_address = ArbToken::new(child_token, ctx.child.provider())
            .l1Address()
            .call()
            .await?
            ._0;
        if child_l1_address != parent_token {
            return Err(BridgeError::InvalidConfig(format!(
                "child token {} points at {}, expected {}",
                child_token, child_l1_address, parent_token
            )));
        }

        let gateway_request = RetryableRequest {
            from: bridge.l1_custom_gateway,
            to: bridge.l2_custom_gateway,
            l2_call_value: U256::ZERO,
            excess_fee_refund_address: signer,
            call_value_refund_address: signer,
            data: register_token_from_l1_calldata(parent_token, child_token),
        };
        let router_request = RetryableRequest {
            from: bridge.l1_gateway_router,
            to: bridge.l2_gateway_router,
            l2_call_value: U256::ZERO,
            excess_fee_refund_address: signer,
            call_value_refund_address: signer,
            data: set_gateway_calldata(vec![parent_token], vec![bridge.l2_custom_gateway]),
        };

        let inbox = ctx.network.eth_bridge().inbox;
        let (gateway_gas, router_gas) = tokio::try_join!(
            ctx.gas
                .estimate_all(&ctx.parent, &ctx.child, inbox, &gateway_request, &gateway_overrides),
            ctx.gas
                .estimate_all(&ctx.parent, &ctx.child, inbox, &router_request, &router_overrides),
        )?;

        // Both tickets share one gas price bid
        let gas_price_bid = gateway_gas.max_fee_per_gas.max(router_gas.max_fee_per_gas);
        let gateway_gas = with_gas_price(gateway_gas, gas_price_bid);
        let router_gas = with_gas_price(router_gas, gas_price_bid);
        let total = gateway_gas.deposit.saturating_add(router_gas.deposit);
        ctx.ensure_parent_funds(total).await?;

        let pending = CustomToken::new(parent_token, ctx.parent.provider())
            .registerTokenOnL2(
                child_token,
                gateway_gas.max_submission_cost,
                router_gas.max_submission_cost,
                gateway_gas.gas_limit,
                router_gas.gas_limit,
                gas_price_bid,
                gateway_gas.deposit,
                router_gas.deposit,
                signer,
            )
            .value(total)
            .from(signer)
            .send()
            .await?;
        let receipt = ctx
            .confirm_parent(*pending.tx_hash(), "registerTokenOnL2", cancel)
            .await?;
        let receipt = ParentTransactionReceipt::new(receipt);
        let messages = receipt.parent_to_child_messages(&ctx.network)?;

        info!(
            parent_token = %parent_token,
            child_token = %child_token,
            tickets = messages.len(),
            "Custom token registration submitted"
        );

        Ok(RegisterCustomTokenResult {
            transaction: receipt.to_transaction_pair(&ctx.network),
            messages,
            gateway_gas,
            router_gas,
        })
    }

    /// Point the router at new gateways for `tokens` (router owner only)
    pub async fn set_gateways(
        &self,
        tokens: Vec<Address>,
        gateways: Vec<Address>,
        overrides: GasOverrides,
        cancel: Option<&CancelToken>,
    ) -> Result<SetGatewaysResult, BridgeError> {
        let ctx = self.ctx();
        let signer = ctx.parent.signer_address()?;
        let bridge = ctx.network.token_bridge();

        if tokens.len() != gateways.len() {
            return Err(BridgeError::InvalidConfig(format!(
                "{} tokens but {} gateways",
                tokens.len(),
                gateways.len()
            )));
        }

        let router = L1GatewayRouter::new(bridge.l1_gateway_router, ctx.parent.provider());
        let owner = router.owner().call().await?._0;
        if owner != signer {
            return Err(BridgeError::InvalidConfig(format!(
                "signer {} is not the router owner {}",
                signer, owner
            )));
        }

        let mut child_gateways = Vec::with_capacity(gateways.len());
        for gateway in &gateways {
            let child_gateway = if gateway.is_zero() || *gateway == DISABLED_GATEWAY {
                *gateway
            } else {
                L1TokenGateway::new(*gateway, ctx.parent.provider())
                    .counterpartGateway()
                    .call()
                    .await?
                    ._0
            };
            child_gateways.push(child_gateway);
        }

        let request = RetryableRequest {
            from: bridge.l1_gateway_router,
            to: bridge.l2_gateway_router,
            l2_call_value: U256::ZERO,
            excess_fee_refund_address: signer,
            call_value_refund_address: signer,
            data: set_gateway_calldata(tokens.clone(), child_gateways),
        };
        let gas = ctx
            .gas
            .estimate_all(&ctx.parent, &ctx.child, ctx.network.eth_bridge().inbox, &request, &overrides)
            .await?;
        ctx.ensure_parent_funds(gas.deposit).await?;

        let pending = router
            .setGateways(
                tokens,
                gateways,
                gas.gas_limit,
                gas.max_fee_per_gas,
                gas.max_submission_cost,
            )
            .value(gas.deposit)
            .from(signer)
            .send()
            .await?;
        let receipt = ctx
            .confirm_parent(*pending.tx_hash(), "setGateways", cancel)
            .await?;
        let receipt = ParentTransactionReceipt::new(receipt);
        let message = receipt
            .parent_to_child_messages(&ctx.network)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(receipt.tx_hash()))?;

        info!(ticket_id = %message.ticket_id, "Router gateways update submitted");

        Ok(SetGatewaysResult {
            transaction: receipt.to_transaction_pair(&ctx.network),
            message,
            gas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_register_token_calldata() {
        let data = register_token_from_l1_calldata(Address::repeat_byte(1), Address::repeat_byte(2));
        assert_eq!(&data[..4], L2CustomGateway::registerTokenFromL1Call::SELECTOR.as_slice());
        let decoded = L2CustomGateway::registerTokenFromL1Call::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.l1Address, vec![Address::repeat_byte(1)]);
        assert_eq!(decoded.l2Address, vec![Address::repeat_byte(2)]);
    }

    #[test]
    fn test_set_gateway_calldata() {
        let data = set_gateway_calldata(vec![Address::repeat_byte(1)], vec![Address::repeat_byte(3)]);
        let decoded = L2GatewayRouter::setGatewayCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded._l1Token, vec![Address::repeat_byte(1)]);
        assert_eq!(decoded._gateway, vec![Address::repeat_byte(3)]);
    }

    #[test]
    fn test_registration_guard() {
        let token = Address::repeat_byte(1);
        assert_ok!(ensure_unregistered(token, Address::ZERO, Address::ZERO));

        // Gateway mapping written by the first registration ticket
        let err = assert_err!(ensure_unregistered(token, Address::repeat_byte(2), Address::ZERO));
        assert!(matches!(err, BridgeError::AlreadyRegistered(t) if t == token));

        // Router entry alone is enough
        let err = assert_err!(ensure_unregistered(token, Address::ZERO, Address::repeat_byte(3)));
        assert!(matches!(err, BridgeError::AlreadyRegistered(_)));
        assert_eq!(err.class(), crate::error::ErrorClass::ProtocolState);
    }

    #[test]
    fn test_shared_gas_price() {
        let gas = RetryableGasParams {
            gas_limit: U256::from(100u64),
            max_fee_per_gas: U256::from(1u64),
            max_submission_cost: U256::from(50u64),
            deposit: U256::from(150u64),
        };
        let repriced = with_gas_price(gas, U256::from(3u64));
        assert_eq!(repriced.max_fee_per_gas, U256::from(3u64));
        assert_eq!(repriced.deposit, U256::from(350u64));
        assert_eq!(repriced.gas_limit, gas.gas_limit);
    }
}
