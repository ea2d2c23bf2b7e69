//! Configuration for the binding layer and its RPC collaborators

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderyConfig {
    /// Node connection settings
    pub rpc: RpcConfig,
    /// Fee provision for dispatched calls
    pub fees: FeeConfig,
    /// Defaults for read-only calls
    pub call: CallConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Configuration for the JSON-RPC node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// RPC URL
    pub url: String,

    /// Whether to use a websocket connection
    pub use_websocket: bool,

    /// Chain id used when signing transactions; queried from the node when absent
    pub chain_id: Option<u64>,

    /// Number of confirmations to wait for after a transaction is mined
    pub confirmations: usize,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
            use_websocket: false,
            chain_id: None,
            confirmations: 1,
            request_timeout_secs: 30,
        }
    }
}

/// How gas is provisioned for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeMode {
    /// Fixed gas price and limit
    Legacy,
    /// EIP-1559 max fee and priority fee
    Eip1559,
    /// Let the node estimate everything
    Estimate,
}

/// Fee provision settings, prices in gwei
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub mode: FeeMode,
    /// Gas price in gwei (legacy mode)
    pub gas_price_gwei: Option<f64>,
    /// Max fee per gas in gwei (eip1559 mode)
    pub max_fee_gwei: Option<f64>,
    /// Max priority fee per gas in gwei (eip1559 mode)
    pub max_priority_fee_gwei: Option<f64>,
    /// Gas limit; estimated by the node when absent
    pub gas_limit: Option<u64>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            mode: FeeMode::Estimate,
            gas_price_gwei: None,
            max_fee_gwei: None,
            max_priority_fee_gwei: None,
            gas_limit: None,
        }
    }
}

/// Defaults for read-only calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Block tag: "latest", "pending", "safe", "finalized", "earliest" or a block number
    pub block: String,
    /// Address used as `from` for simulated calls
    pub caller: Option<String>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            block: "latest".to_string(),
            caller: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. "info" or "bindery_ethereum=debug"
    pub level: String,
    /// Emit JSON formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing RPC URL")]
    MissingRpcUrl,
    #[error("Invalid RPC URL '{url}': expected {expected} scheme")]
    InvalidRpcUrl { url: String, expected: &'static str },
    #[error("Fee mode '{mode}' requires '{field}'")]
    MissingFeeField { mode: &'static str, field: &'static str },
    #[error("Invalid fee value for '{field}': {value}")]
    InvalidFee { field: &'static str, value: f64 },
    #[error("Invalid gas limit: must be greater than 0")]
    InvalidGasLimit,
    #[error("Invalid request timeout: must be greater than 0")]
    InvalidTimeout,
    #[error("Invalid block tag '{0}'")]
    InvalidBlockTag(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl BinderyConfig {
    /// Load configuration from a `.toml` or `.json` file and apply environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read configuration file {}: {}", path.display(), e)))?;

        let mut config: BinderyConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(Error::config(
                    "Unsupported configuration file format. Supported formats: .toml, .json",
                ))
            }
        };

        config.apply_environment_overrides()?;
        config.validate()?;

        tracing::debug!(path = %path.display(), rpc = %config.rpc.url, "Loaded configuration");
        Ok(config)
    }

    /// Save the configuration to a `.toml` or `.json` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::to_string_pretty(self)?,
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => {
                return Err(Error::config(
                    "Unsupported configuration file format. Supported formats: .toml, .json",
                ))
            }
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `BINDERY_*` environment variable overrides
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var("BINDERY_RPC_URL") {
            self.rpc.use_websocket = url.starts_with("ws://") || url.starts_with("wss://");
            self.rpc.url = url;
        }
        if let Ok(confirmations) = env::var("BINDERY_CONFIRMATIONS") {
            self.rpc.confirmations = confirmations
                .parse()
                .map_err(|_| Error::config(format!("Invalid BINDERY_CONFIRMATIONS value: {}", confirmations)))?;
        }
        if let Ok(block) = env::var("BINDERY_BLOCK") {
            self.call.block = block;
        }
        if let Ok(level) = env::var("BINDERY_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.rpc.url.is_empty() {
            return Err(ConfigError::MissingRpcUrl);
        }

        let (schemes, expected): (&[&str], _) = if self.rpc.use_websocket {
            (&["ws://", "wss://"], "ws(s)")
        } else {
            (&["http://", "https://"], "http(s)")
        };
        if !schemes.iter().any(|s| self.rpc.url.starts_with(s)) {
            return Err(ConfigError::InvalidRpcUrl {
                url: self.rpc.url.clone(),
                expected,
            });
        }

        if self.rpc.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        match self.fees.mode {
            FeeMode::Legacy => {
                let price = self.fees.gas_price_gwei.ok_or(ConfigError::MissingFeeField {
                    mode: "legacy",
                    field: "gas_price_gwei",
                })?;
                check_fee("gas_price_gwei", price)?;
            }
            FeeMode::Eip1559 => {
                let max_fee = self.fees.max_fee_gwei.ok_or(ConfigError::MissingFeeField {
                    mode: "eip1559",
                    field: "max_fee_gwei",
                })?;
                let priority = self.fees.max_priority_fee_gwei.ok_or(ConfigError::MissingFeeField {
                    mode: "eip1559",
                    field: "max_priority_fee_gwei",
                })?;
                check_fee("max_fee_gwei", max_fee)?;
                check_fee("max_priority_fee_gwei", priority)?;
            }
            FeeMode::Estimate => {}
        }

        if self.fees.gas_limit == Some(0) {
            return Err(ConfigError::InvalidGasLimit);
        }

        if !is_block_tag(&self.call.block) {
            return Err(ConfigError::InvalidBlockTag(self.call.block.clone()));
        }

        Ok(())
    }
}

fn check_fee(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidFee { field, value })
    }
}

fn is_block_tag(tag: &str) -> bool {
    matches!(tag, "latest" | "pending" | "safe" | "finalized" | "earliest")
        || tag.parse::<u64>().is_ok()
        || tag
            .strip_prefix("0x")
            .map(|hex| !hex.is_empty() && u64::from_str_radix(hex, 16).is_ok())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests;
