//! Fee provision for dispatched calls

use std::collections::HashMap;
use std::fmt::Debug;

use ethers::types::U256;
use ethers::utils::parse_units;

use bindery_core::{Error, FeeConfig, FeeMode, Result};

/// Gas settings for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fees {
    /// Fixed gas price
    Legacy { gas_price: U256, gas_limit: Option<U256> },
    /// EIP-1559 fee caps
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
        gas_limit: Option<U256>,
    },
    /// Leave prices (and the limit, when absent) to the node
    Estimate { gas_limit: Option<U256> },
}

impl Default for Fees {
    fn default() -> Self {
        Fees::Estimate { gas_limit: None }
    }
}

impl Fees {
    /// Build fees from configuration, converting gwei to wei.
    pub fn from_config(config: &FeeConfig) -> Result<Self> {
        let gas_limit = config.gas_limit.map(U256::from);
        match config.mode {
            FeeMode::Legacy => Ok(Fees::Legacy {
                gas_price: gwei(config.gas_price_gwei, "gas_price_gwei")?,
                gas_limit,
            }),
            FeeMode::Eip1559 => Ok(Fees::Eip1559 {
                max_fee_per_gas: gwei(config.max_fee_gwei, "max_fee_gwei")?,
                max_priority_fee_per_gas: gwei(config.max_priority_fee_gwei, "max_priority_fee_gwei")?,
                gas_limit,
            }),
            FeeMode::Estimate => Ok(Fees::Estimate { gas_limit }),
        }
    }

    pub fn gas_limit(&self) -> Option<U256> {
        match self {
            Fees::Legacy { gas_limit, .. } | Fees::Eip1559 { gas_limit, .. } | Fees::Estimate { gas_limit } => *gas_limit,
        }
    }
}

fn gwei(value: Option<f64>, field: &str) -> Result<U256> {
    let value = value.ok_or_else(|| Error::config(format!("missing fee field '{}'", field)))?;
    parse_units(value, "gwei")
        .map(Into::into)
        .map_err(|e| Error::config(format!("invalid fee value for '{}': {}", field, e)))
}

/// Supplies fees per function. The dispatcher never picks fees itself.
pub trait FeePolicy: Send + Sync + Debug {
    fn fees_for(&self, function: &str) -> Fees;
}

/// Same fees for every function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticFeePolicy(pub Fees);

impl FeePolicy for StaticFeePolicy {
    fn fees_for(&self, _function: &str) -> Fees {
        self.0
    }
}

/// Default fees with per-function overrides, keyed by function name or signature
#[derive(Debug, Clone, Default)]
pub struct PerFunctionFeePolicy {
    default: Fees,
    overrides: HashMap<String, Fees>,
}

impl PerFunctionFeePolicy {
    pub fn new(default: Fees) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, function: impl Into<String>, fees: Fees) -> Self {
        self.overrides.insert(function.into(), fees);
        self
    }
}

impl FeePolicy for PerFunctionFeePolicy {
    /// `function` is the canonical signature; a name-only override applies to every overload.
    fn fees_for(&self, function: &str) -> Fees {
        let name = function.split('(').next().unwrap_or(function);
        self.overrides
            .get(function)
            .or_else(|| self.overrides.get(name))
            .copied()
            .unwrap_or(self.default)
    }
}
