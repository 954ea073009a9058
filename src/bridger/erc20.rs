//! ERC20 bridging through the gateway routers
//!
//! ## Deposit flow
//!
//! 1. Resolve the gateway route for the token
//! 2. Check token balance and the allowance granted to the parent gateway
//! 3. Ask the gateway for the exact calldata its retryable will carry
//! 4. Estimate the retryable fees for that calldata
//! 5. `L1GatewayRouter.outboundTransfer` with the fees as value
//! 6. Discover the created ticket in the receipt

use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionReceipt,
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bridger::gateway::GatewayResolver;
use crate::bridger::BridgeContext;
use crate::error::BridgeError;
use crate::evm::client::ChainProvider;
use crate::evm::contracts::{L1GatewayRouter, L1TokenGateway, L2GatewayRouter};
use crate::evm::tokens::{approve, token_allowance, token_balance};
use crate::gas::{required_deposit, GasOverrides, RetryableGasParams, RetryableRequest};
use crate::message::parent_receipt::{ParentToChildMessage, ParentTransactionReceipt};
use crate::message::withdrawal::{child_to_parent_messages, WithdrawalMessage};
use crate::poll::CancelToken;
use crate::types::{BridgeTransactionPair, Direction, GatewayKind, GatewayRoute};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Erc20DepositParams {
    pub parent_token: Address,
    pub amount: U256,
    /// Child-chain recipient, defaults to the signer
    pub destination: Option<Address>,
    pub overrides: GasOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Erc20WithdrawParams {
    pub parent_token: Address,
    pub amount: U256,
    /// Parent-chain recipient, defaults to the signer
    pub destination: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct Erc20DepositResult {
    pub route: GatewayRoute,
    pub transaction: BridgeTransactionPair,
    pub message: ParentToChildMessage,
    pub gas: RetryableGasParams,
}

#[derive(Debug, Clone)]
pub struct Erc20WithdrawResult {
    pub route: GatewayRoute,
    pub receipt: TransactionReceipt,
    pub withdrawal: WithdrawalMessage,
}

/// Extra data for `L1GatewayRouter.outboundTransfer`: `abi.encode(maxSubmissionCost, "")`
pub fn outbound_transfer_data(max_submission_cost: U256) -> Bytes {
    (max_submission_cost, Bytes::new()).abi_encode_params().into()
}

/// Value forwarded to the child gateway by the retryable
///
/// The WETH gateway unwraps on the parent side and forwards the ETH.
pub fn l2_call_value(kind: GatewayKind, amount: U256) -> U256 {
    match kind {
        GatewayKind::WrappedNative => amount,
        GatewayKind::Standard | GatewayKind::Custom => U256::ZERO,
    }
}

pub struct Erc20Bridger<PP, CP> {
    ctx: BridgeContext<PP, CP>,
    resolver: GatewayResolver<PP, CP>,
}

impl<PP: ChainProvider, CP: ChainProvider> Erc20Bridger<PP, CP> {
    pub fn new(ctx: BridgeContext<PP, CP>) -> Self {
        let resolver = GatewayResolver::new(
            ctx.parent.clone(),
            ctx.child.clone(),
            ctx.network.token_bridge().clone(),
        );
        Self { ctx, resolver }
    }

    pub fn context(&self) -> &BridgeContext<PP, CP> {
        &self.ctx
    }

    pub fn resolver(&self) -> &GatewayResolver<PP, CP> {
        &self.resolver
    }

    pub async fn child_token_address(&self, parent_token: Address) -> Result<Address, BridgeError> {
        self.resolver.child_token_address(parent_token).await
    }

    pub async fn parent_token_address(&self, child_token: Address) -> Result<Address, BridgeError> {
        self.resolver.parent_token_address(child_token).await
    }

    /// Balance of `parent_token` held by `owner` on the parent chain
    pub async fn parent_token_balance(
        &self,
        parent_token: Address,
        owner: Address,
    ) -> Result<U256, BridgeError> {
        token_balance(&self.ctx.parent, parent_token, owner).await
    }

    /// Balance of the child counterpart of `parent_token` held by `owner`
    pub async fn child_token_balance(
        &self,
        parent_token: Address,
        owner: Address,
    ) -> Result<U256, BridgeError> {
        let child_token = self.child_token_address(parent_token).await?;
        token_balance(&self.ctx.child, child_token, owner).await
    }

    /// Allowance `owner` granted to the token's parent gateway
    pub async fn allowance(&self, parent_token: Address, owner: Address) -> Result<U256, BridgeError> {
        let route = self.resolver.resolve_gateway(parent_token, Direction::Deposit).await?;
        token_allowance(&self.ctx.parent, parent_token, owner, route.parent_gateway()).await
    }

    /// Let the token's parent gateway pull `amount` (unlimited when `None`)
    pub async fn approve_token(
        &self,
        parent_token: Address,
        amount: Option<U256>,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        let route = self.resolver.resolve_gateway(parent_token, Direction::Deposit).await?;
        approve(
            &self.ctx.parent,
            parent_token,
            route.parent_gateway(),
            amount.unwrap_or(U256::MAX),
            &self.ctx.poll,
            self.ctx.receipt_timeout(),
            cancel,
        )
        .await
    }

    /// Deposit tokens to the child chain
    pub async fn deposit(
        &self,
        params: Erc20DepositParams,
        cancel: Option<&CancelToken>,
    ) -> Result<Erc20DepositResult, BridgeError> {
        let signer = self.ctx.parent.signer_address()?;
        let destination = params.destination.unwrap_or(signer);
        let route = self
            .resolver
            .resolve_gateway(params.parent_token, Direction::Deposit)
            .await?;
        let gateway = route.parent_gateway();

        let (balance, allowance) = tokio::try_join!(
            token_balance(&self.ctx.parent, params.parent_token, signer),
            token_allowance(&self.ctx.parent, params.parent_token, signer, gateway),
        )?;
        if balance < params.amount {
            return Err(BridgeError::InsufficientFunds {
                required: params.amount,
                available: balance,
            });
        }
        if allowance < params.amount {
            return Err(BridgeError::InsufficientAllowance {
                spender: gateway,
                required: params.amount,
                available: allowance,
            });
        }

        let outbound_calldata = L1TokenGateway::new(gateway, self.ctx.parent.provider())
            .getOutboundCalldata(params.parent_token, signer, destination, params.amount, Bytes::new())
            .call()
            .await?
            .outboundCalldata;

        let request = RetryableRequest {
            from: gateway,
            to: route.child_gateway(),
            l2_call_value: l2_call_value(route.kind, params.amount),
            excess_fee_refund_address: signer,
            call_value_refund_address: signer,
            data: outbound_calldata,
        };
        let inbox = self.ctx.network.eth_bridge().inbox;
        let gas = self
            .ctx
            .gas
            .estimate_all(&self.ctx.parent, &self.ctx.child, inbox, &request, &params.overrides)
            .await?;
        gas.to_ticket_params(&request)
            .check_submission_fee(self.ctx.parent.base_fee().await?)?;

        // The forwarded WETH amount is pulled as tokens, not sent as value
        let value = params.overrides.deposit.unwrap_or_else(|| {
            required_deposit(gas.gas_limit, gas.max_fee_per_gas, gas.max_submission_cost, U256::ZERO)
        });
        self.ctx.ensure_parent_funds(value).await?;

        let router = L1GatewayRouter::new(
            self.ctx.network.token_bridge().l1_gateway_router,
            self.ctx.parent.provider(),
        );
        let pending = router
            .outboundTransfer(
                params.parent_token,
                destination,
                params.amount,
                gas.gas_limit,
                gas.max_fee_per_gas,
                outbound_transfer_data(gas.max_submission_cost),
            )
            .value(value)
            .from(signer)
            .send()
            .await?;
        let receipt = self
            .ctx
            .confirm_parent(*pending.tx_hash(), "outboundTransfer", cancel)
            .await?;
        let receipt = ParentTransactionReceipt::new(receipt);

        let message = receipt
            .parent_to_child_messages(&self.ctx.network)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(receipt.tx_hash()))?;

        info!(
            token = %params.parent_token,
            amount = %params.amount,
            gateway = %route.kind,
            ticket_id = %message.ticket_id,
            "Token deposit submitted"
        );

        Ok(Erc20DepositResult {
            route,
            transaction: receipt.to_transaction_pair(&self.ctx.network),
            message,
            gas,
        })
    }

    /// Withdraw tokens to the parent chain
    pub async fn withdraw(
        &self,
        params: Erc20WithdrawParams,
        cancel: Option<&CancelToken>,
    ) -> Result<Erc20WithdrawResult, BridgeError> {
        let signer = self.ctx.child.signer_address()?;
        let destination = params.destination.unwrap_or(signer);
        let route = self
            .resolver
            .resolve_gateway(params.parent_token, Direction::Withdraw)
            .await?;

        let balance = token_balance(&self.ctx.child, route.child_token, signer).await?;
        if balance < params.amount {
            return Err(BridgeError::InsufficientFunds {
                required: params.amount,
                available: balance,
            });
        }

        let router = L2GatewayRouter::new(
            self.ctx.network.token_bridge().l2_gateway_router,
            self.ctx.child.provider(),
        );
        let pending = router
            .outboundTransfer(params.parent_token, destination, params.amount, Bytes::new())
            .from(signer)
            .send()
            .await?;
        let receipt = self
            .ctx
            .confirm_child(*pending.tx_hash(), "child outboundTransfer", cancel)
            .await?;

        let withdrawal = child_to_parent_messages(&receipt)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(receipt.transaction_hash))?;

        info!(
            token = %params.parent_token,
            amount = %params.amount,
            destination = %withdrawal.record.destination,
            "Token withdrawal submitted"
        );

        Ok(Erc20WithdrawResult {
            route,
            receipt,
            withdrawal,
        })
    }
}
