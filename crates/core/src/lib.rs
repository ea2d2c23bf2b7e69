/// Core types shared by the binding layer crates
pub mod config;
pub mod error;

pub use config::{BinderyConfig, CallConfig, ConfigError, FeeConfig, FeeMode, LoggingConfig, RpcConfig};
pub use error::{Error, Result};
