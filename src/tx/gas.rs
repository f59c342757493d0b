//! EIP-1559 fee resolution and gas-limit estimation
//!
//! Pricing failures are recovered locally with documented fallbacks and never
//! surfaced; the strict `max_fee > priority_fee` check is the contract the
//! node enforces, so it is re-established after every computation.

use crate::chain::ChainRpc;
use crate::config::{ChainConfig, SubmitterConfig};
use crate::game::GameOp;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;
use tracing::{debug, warn};

const GWEI: u64 = 1_000_000_000;

/// EIP-1559 fee pair. Invariant: `max_fee_per_gas > max_priority_fee_per_gas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl GasFees {
    /// Check the EIP-1559 validity constraint
    pub fn is_valid(&self) -> bool {
        self.max_fee_per_gas > self.max_priority_fee_per_gas
    }
}

/// Fully-resolved gas parameters for one transaction
#[derive(Debug, Clone, Copy)]
pub struct GasPlan {
    pub gas_limit: U256,
    pub fees: GasFees,
}

impl GasPlan {
    /// Worst-case cost in wei, used for the optimistic balance deduction
    pub fn max_cost(&self) -> U256 {
        self.gas_limit * self.fees.max_fee_per_gas
    }
}

/// Gas estimator for game transactions
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g. 25 = 25% buffer)
    gas_limit_buffer_percent: u64,
    priority_fee: U256,
    fallback_base_fee: U256,
    max_fee_cap: U256,
}

impl GasEstimator {
    /// Create a new gas estimator from configuration
    pub fn new(submitter: &SubmitterConfig, chain: &ChainConfig) -> Self {
        Self {
            gas_limit_buffer_percent: submitter.gas_limit_buffer_percent,
            priority_fee: U256::from(chain.priority_fee_gwei) * GWEI,
            fallback_base_fee: U256::from(chain.fallback_base_fee_gwei) * GWEI,
            max_fee_cap: U256::from(chain.max_gas_price_gwei) * GWEI,
        }
    }

    /// Resolve the EIP-1559 fee pair from network state.
    ///
    /// Falls back to the configured base-fee default when the latest block is
    /// unavailable or pre-1559, and skips the gas-price term when that lookup
    /// fails. Never errors.
    pub async fn resolve_pricing(&self, rpc: &dyn ChainRpc) -> GasFees {
        let base_fee = match rpc.latest_base_fee().await {
            Ok(Some(fee)) => fee,
            Ok(None) => {
                warn!(
                    "Latest block carries no base fee, using fallback {}",
                    self.fallback_base_fee
                );
                self.fallback_base_fee
            }
            Err(e) => {
                warn!("Base fee lookup failed ({}), using fallback", e);
                self.fallback_base_fee
            }
        };

        let gas_price = match rpc.gas_price().await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("Gas price lookup failed ({}), skipping that term", e);
                None
            }
        };

        let fees = Self::compute_fees(base_fee, gas_price, self.priority_fee, self.max_fee_cap);
        debug!(
            "Resolved fees: max={} priority={}",
            fees.max_fee_per_gas, fees.max_priority_fee_per_gas
        );
        fees
    }

    /// Pure fee computation: `max_fee = max(base * 2 + tip, gas_price + tip)`,
    /// capped, then forced valid (`tip * 3`) if the cap or inputs broke the
    /// constraint. Fee validity takes precedence over the cap.
    fn compute_fees(
        base_fee: U256,
        gas_price: Option<U256>,
        priority_fee: U256,
        max_fee_cap: U256,
    ) -> GasFees {
        let tip = priority_fee.max(U256::one());

        let mut max_fee = base_fee * 2u64 + tip;
        if let Some(price) = gas_price {
            max_fee = max_fee.max(price + tip);
        }
        max_fee = max_fee.min(max_fee_cap);

        if max_fee <= tip {
            max_fee = tip * 3;
        }

        GasFees {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: tip,
        }
    }

    /// Estimate the gas limit for a candidate transaction, with a safety
    /// buffer. On estimation failure returns the conservative per-operation
    /// fallback instead of surfacing the error.
    pub async fn estimate_limit(
        &self,
        rpc: &dyn ChainRpc,
        tx: TypedTransaction,
        op: GameOp,
    ) -> U256 {
        match rpc.estimate_gas(tx).await {
            Ok(estimate) => {
                let buffered = estimate * (100 + self.gas_limit_buffer_percent) / 100;
                debug!("Gas estimate for {}: {} (buffered {})", op, estimate, buffered);
                buffered
            }
            Err(e) => {
                warn!(
                    "Gas estimation failed for {} ({}), using fallback {}",
                    op,
                    e,
                    op.fallback_gas_limit()
                );
                op.fallback_gas_limit()
            }
        }
    }
}
