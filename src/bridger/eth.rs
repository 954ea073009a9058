//! Native currency bridging
//!
//! Deposits go through `Inbox.depositEth` (no ticket) or, for a different
//! child-chain recipient, through a retryable ticket carrying the value.
//! Withdrawals call `ArbSys.withdrawEth` on the child chain.

use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionReceipt,
};
use tracing::info;

use crate::bridger::BridgeContext;
use crate::error::BridgeError;
use crate::evm::client::ChainProvider;
use crate::evm::contracts::{ArbSys, Inbox, ARB_SYS_ADDRESS};
use crate::gas::{GasOverrides, RetryableGasParams, RetryableRequest};
use crate::inbox::send_retryable;
use crate::message::eth_deposit::EthDepositMessage;
use crate::message::parent_receipt::{ParentToChildMessage, ParentTransactionReceipt};
use crate::message::withdrawal::{child_to_parent_messages, WithdrawalMessage};
use crate::poll::CancelToken;
use crate::types::BridgeTransactionPair;

#[derive(Debug, Clone)]
pub struct EthDepositResult {
    pub transaction: BridgeTransactionPair,
    pub deposit: EthDepositMessage,
}

/// ETH sent to another address through a retryable ticket
#[derive(Debug, Clone)]
pub struct EthDepositToResult {
    pub transaction: BridgeTransactionPair,
    pub message: ParentToChildMessage,
    pub gas: RetryableGasParams,
}

#[derive(Debug, Clone)]
pub struct EthWithdrawResult {
    pub receipt: TransactionReceipt,
    pub withdrawal: WithdrawalMessage,
}

pub struct EthBridger<PP, CP> {
    ctx: BridgeContext<PP, CP>,
}

impl<PP: ChainProvider, CP: ChainProvider> EthBridger<PP, CP> {
    pub fn new(ctx: BridgeContext<PP, CP>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BridgeContext<PP, CP> {
        &self.ctx
    }

    /// Deposit `amount` to the signer's own address on the child chain
    pub async fn deposit(
        &self,
        amount: U256,
        cancel: Option<&CancelToken>,
    ) -> Result<EthDepositResult, BridgeError> {
        let signer = self.ctx.parent.signer_address()?;
        self.ctx.ensure_parent_funds(amount).await?;

        let inbox = Inbox::new(self.ctx.network.eth_bridge().inbox, self.ctx.parent.provider());
        let pending = inbox.depositEth().value(amount).from(signer).send().await?;
        let receipt = self
            .ctx
            .confirm_parent(*pending.tx_hash(), "depositEth", cancel)
            .await?;
        let receipt = ParentTransactionReceipt::new(receipt);

        let deposit = receipt
            .eth_deposits(&self.ctx.network)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(receipt.tx_hash()))?;

        info!(
            amount = %amount,
            deposit_tx = %deposit.deposit_tx_id(),
            "ETH deposit submitted"
        );

        Ok(EthDepositResult {
            transaction: receipt.to_transaction_pair(&self.ctx.network),
            deposit,
        })
    }

    /// Deposit `amount` to `destination` on the child chain via a retryable ticket
    pub async fn deposit_to(
        &self,
        amount: U256,
        destination: Address,
        overrides: GasOverrides,
        cancel: Option<&CancelToken>,
    ) -> Result<EthDepositToResult, BridgeError> {
        let signer = self.ctx.parent.signer_address()?;
        let request = RetryableRequest {
            from: signer,
            to: destination,
            l2_call_value: amount,
            excess_fee_refund_address: signer,
            call_value_refund_address: destination,
            data: Bytes::new(),
        };

        let gas = self
            .ctx
            .gas
            .estimate_all(
                &self.ctx.parent,
                &self.ctx.child,
                self.ctx.network.eth_bridge().inbox,
                &request,
                &overrides,
            )
            .await?;
        let params = gas.to_ticket_params(&request);
        params.check_submission_fee(self.ctx.parent.base_fee().await?)?;
        self.ctx.ensure_parent_funds(params.l1_value).await?;

        let tx_hash =
            send_retryable(&self.ctx.parent, self.ctx.network.eth_bridge().inbox, &params).await?;
        let receipt = self
            .ctx
            .confirm_parent(tx_hash, "createRetryableTicket", cancel)
            .await?;
        let receipt = ParentTransactionReceipt::new(receipt);
        let message = receipt
            .parent_to_child_messages(&self.ctx.network)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(receipt.tx_hash()))?;

        info!(
            amount = %amount,
            destination = %destination,
            ticket_id = %message.ticket_id,
            "ETH deposit ticket submitted"
        );

        Ok(EthDepositToResult {
            transaction: receipt.to_transaction_pair(&self.ctx.network),
            message,
            gas,
        })
    }

    /// Wait for a plain deposit to be executed on the child chain
    pub async fn wait_for_deposit(
        &self,
        deposit: &EthDepositMessage,
        cancel: Option<&CancelToken>,
    ) -> Result<TransactionReceipt, BridgeError> {
        deposit
            .wait_for_deposit(&self.ctx.child, &self.ctx.poll, self.ctx.deposit_timeout(), cancel)
            .await
    }

    /// Withdraw `amount` from the child chain to `destination` on the parent chain
    pub async fn withdraw(
        &self,
        amount: U256,
        destination: Address,
        cancel: Option<&CancelToken>,
    ) -> Result<EthWithdrawResult, BridgeError> {
        let signer = self.ctx.child.signer_address()?;
        self.ctx.ensure_child_funds(amount).await?;

        let arb_sys = ArbSys::new(ARB_SYS_ADDRESS, self.ctx.child.provider());
        let pending = arb_sys
            .withdrawEth(destination)
            .value(amount)
            .from(signer)
            .send()
            .await?;
        let receipt = self
            .ctx
            .confirm_child(*pending.tx_hash(), "withdrawEth", cancel)
            .await?;

        let withdrawal = child_to_parent_messages(&receipt)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoMessageFound(receipt.transaction_hash))?;

        info!(
            amount = %amount,
            destination = %destination,
            position = %withdrawal.record.position,
            "ETH withdrawal submitted"
        );

        Ok(EthWithdrawResult {
            receipt,
            withdrawal,
        })
    }
}
