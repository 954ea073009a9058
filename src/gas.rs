//! Retryable ticket gas and fee estimation
//!
//! A retryable ticket auto-redeems only when the parent-chain call deposits
//! enough for three independent costs:
//!
//! - the submission fee, charged for storing the ticket
//!   (`(1400 + 6 * dataLength) * l1BaseFee`)
//! - the child gas limit of the auto-redeem
//! - the child max fee per gas of the auto-redeem
//!
//! Estimates are padded by configurable percentages, and every value can be
//! overridden by the caller. Setting the gas limit or max fee per gas to zero
//! deliberately skips the auto-redeem and leaves the ticket funded for a
//! manual redemption.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::evm::client::{ChainClient, ChainProvider};
use crate::evm::contracts::{Inbox, NodeInterface, NODE_INTERFACE_ADDRESS};
use crate::message::retryable_data::RetryableTicketParams;

/// Fixed byte overhead charged for every ticket
pub const SUBMISSION_FEE_BASE_BYTES: u64 = 1400;
/// Multiplier applied to the call data length
pub const SUBMISSION_FEE_PER_DATA_BYTE: u64 = 6;

const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Minimum submission fee the inbox accepts for `data_length` bytes of call data
pub fn submission_fee(data_length: usize, l1_base_fee: U256) -> U256 {
    let bytes = U256::from(SUBMISSION_FEE_BASE_BYTES)
        + U256::from(SUBMISSION_FEE_PER_DATA_BYTE) * U256::from(data_length);
    bytes.saturating_mul(l1_base_fee)
}

/// Apply a percentage margin: `value + value * percent / 100`
pub fn percent_increase(value: U256, percent: U256) -> U256 {
    value.saturating_add(value.saturating_mul(percent) / U256::from(100u64))
}

/// An optional base value and an optional margin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentIncrease {
    /// Use this instead of the on-chain estimate
    pub base: Option<U256>,
    /// Use this instead of the configured default margin
    pub percent_increase: Option<U256>,
}

impl PercentIncrease {
    /// Replace the estimate with `value`, keeping the default margin
    pub fn with_base(value: U256) -> Self {
        Self {
            base: Some(value),
            percent_increase: None,
        }
    }

    /// Exactly `value`, no margin
    pub fn fixed(value: U256) -> Self {
        Self {
            base: Some(value),
            percent_increase: Some(U256::ZERO),
        }
    }

    fn resolve(&self, estimated: U256, default_percent: u64) -> U256 {
        let base = self.base.unwrap_or(estimated);
        let percent = self
            .percent_increase
            .unwrap_or(U256::from(default_percent));
        percent_increase(base, percent)
    }
}

/// Gas limit override with a floor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasLimitOverride {
    #[serde(flatten)]
    pub limit: PercentIncrease,
    /// Never return less than this, unless the base was pinned to zero
    pub min: Option<U256>,
}

/// Caller overrides for every estimated value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasOverrides {
    pub gas_limit: GasLimitOverride,
    pub max_submission_fee: PercentIncrease,
    pub max_fee_per_gas: PercentIncrease,
    /// Total value to deposit; computed from the other values when unset
    pub deposit: Option<U256>,
}

impl GasOverrides {
    /// Pin the auto-redeem gas to zero so the ticket waits for a manual redeem
    pub fn skip_auto_redeem() -> Self {
        Self {
            gas_limit: GasLimitOverride {
                limit: PercentIncrease::fixed(U256::ZERO),
                min: None,
            },
            max_fee_per_gas: PercentIncrease::fixed(U256::ZERO),
            ..Default::default()
        }
    }
}

/// The call a retryable ticket will make on the child chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryableRequest {
    /// Parent-chain sender (the node aliases it when it is a contract)
    pub from: Address,
    pub to: Address,
    pub l2_call_value: U256,
    pub excess_fee_refund_address: Address,
    pub call_value_refund_address: Address,
    pub data: Bytes,
}

/// Fully resolved fee parameters for one ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryableGasParams {
    pub gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub max_submission_cost: U256,
    /// Value the parent-chain call must carry for the retryable
    pub deposit: U256,
}

impl RetryableGasParams {
    /// Combine fees with the request into inbox parameters
    pub fn to_ticket_params(&self, request: &RetryableRequest) -> RetryableTicketParams {
        RetryableTicketParams {
            to: request.to,
            l2_call_value: request.l2_call_value,
            l1_value: self.deposit,
            max_submission_fee: self.max_submission_cost,
            excess_fee_refund_address: request.excess_fee_refund_address,
            call_value_refund_address: request.call_value_refund_address,
            gas_limit: self.gas_limit,
            max_fee_per_gas: self.max_fee_per_gas,
            data: request.data.clone(),
        }
    }
}

/// Deposit needed to cover all fees and the forwarded value
pub fn required_deposit(
    gas_limit: U256,
    max_fee_per_gas: U256,
    max_submission_cost: U256,
    l2_call_value: U256,
) -> U256 {
    gas_limit
        .saturating_mul(max_fee_per_gas)
        .saturating_add(max_submission_cost)
        .saturating_add(l2_call_value)
}

/// Estimates retryable parameters from a parent and a child client
#[derive(Debug, Clone)]
pub struct GasEstimator {
    submission_fee_percent: u64,
    max_fee_per_gas_percent: u64,
    gas_limit_percent: u64,
    min_gas_limit: u64,
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(&BridgeConfig::default())
    }
}

impl GasEstimator {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            submission_fee_percent: config.submission_fee_percent_increase,
            max_fee_per_gas_percent: config.max_fee_per_gas_percent_increase,
            gas_limit_percent: config.gas_limit_percent_increase,
            min_gas_limit: config.min_gas_limit,
        }
    }

    /// Submission fee for `data_length` bytes, as quoted by the inbox
    pub async fn estimate_submission_fee<PP: ChainProvider>(
        &self,
        parent: &ChainClient<PP>,
        inbox: Address,
        data_length: usize,
        overrides: &PercentIncrease,
    ) -> Result<U256, BridgeError> {
        let estimated = match overrides.base {
            Some(base) => base,
            None => {
                let base_fee = parent.base_fee().await?;
                let contract = Inbox::new(inbox, parent.provider());
                contract
                    .calculateRetryableSubmissionFee(U256::from(data_length), base_fee)
                    .call()
                    .await?
                    ._0
            }
        };
        Ok(overrides.resolve(estimated, self.submission_fee_percent))
    }

    /// Max fee per gas for the auto-redeem, from the child gas price
    pub async fn estimate_max_fee_per_gas<CP: ChainProvider>(
        &self,
        child: &ChainClient<CP>,
        overrides: &PercentIncrease,
    ) -> Result<U256, BridgeError> {
        let estimated = match overrides.base {
            Some(base) => base,
            None => child.gas_price().await?,
        };
        Ok(overrides.resolve(estimated, self.max_fee_per_gas_percent))
    }

    /// Child gas needed to execute the retryable call
    pub async fn estimate_gas_limit<CP: ChainProvider>(
        &self,
        child: &ChainClient<CP>,
        request: &RetryableRequest,
        overrides: &GasLimitOverride,
    ) -> Result<U256, BridgeError> {
        let estimated = match overrides.limit.base {
            Some(base) => base,
            None => {
                // The node needs a deposit large enough to cover the simulated call
                let deposit = U256::from(ONE_ETHER) + request.l2_call_value;
                let node = NodeInterface::new(NODE_INTERFACE_ADDRESS, child.provider());
                let gas = node
                    .estimateRetryableTicket(
                        request.from,
                        deposit,
                        request.to,
                        request.l2_call_value,
                        request.excess_fee_refund_address,
                        request.call_value_refund_address,
                        request.data.clone(),
                    )
                    .from(request.from)
                    .estimate_gas()
                    .await?;
                U256::from(gas)
            }
        };

        let limit = overrides.limit.resolve(estimated, self.gas_limit_percent);
        if overrides.limit.base == Some(U256::ZERO) {
            return Ok(U256::ZERO);
        }
        let min = overrides.min.unwrap_or(U256::from(self.min_gas_limit));
        Ok(limit.max(min))
    }

    /// Estimate all fee parameters for a retryable request
    pub async fn estimate_all<PP: ChainProvider, CP: ChainProvider>(
        &self,
        parent: &ChainClient<PP>,
        child: &ChainClient<CP>,
        inbox: Address,
        request: &RetryableRequest,
        overrides: &GasOverrides,
    ) -> Result<RetryableGasParams, BridgeError> {
        let (max_submission_cost, max_fee_per_gas, gas_limit) = tokio::try_join!(
            self.estimate_submission_fee(
                parent,
                inbox,
                request.data.len(),
                &overrides.max_submission_fee
            ),
            self.estimate_max_fee_per_gas(child, &overrides.max_fee_per_gas),
            self.estimate_gas_limit(child, request, &overrides.gas_limit),
        )?;

        let deposit = overrides.deposit.unwrap_or_else(|| {
            required_deposit(gas_limit, max_fee_per_gas, max_submission_cost, request.l2_call_value)
        });

        debug!(
            gas_limit = %gas_limit,
            max_fee_per_gas = %max_fee_per_gas,
            max_submission_cost = %max_submission_cost,
            deposit = %deposit,
            "Estimated retryable parameters"
        );

        Ok(RetryableGasParams {
            gas_limit,
            max_fee_per_gas,
            max_submission_cost,
            deposit,
        })
    }
}
