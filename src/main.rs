/// Bindery command line entry point
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use ethers::types::{Address, BlockNumber, Bytes, Log, H256, U64};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bindery_core::{BinderyConfig, LoggingConfig};
use bindery_ethereum::abi::{AbiType, AbiValue};
use bindery_ethereum::{
    ContractAbi, ContractBinding, Dispatcher, ErrorDescriptor, EventDescriptor, EthersTransport, Fees,
    FunctionDescriptor, StaticFeePolicy,
};

#[derive(Parser)]
#[command(name = "bindery")]
#[command(author, version, about = "Ethereum ABI and contract call toolkit", long_about = None)]
struct Cli {
    /// Config file path (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 4-byte selector of a function or error signature
    Selector {
        /// e.g. "transfer(address,uint256)" or "error InsufficientBalance(uint256)"
        signature: String,
    },

    /// Print the topic hash of an event signature
    Topic {
        /// e.g. "Transfer(address indexed from, address indexed to, uint256 value)"
        signature: String,
    },

    /// Encode call data for a function
    Encode {
        /// Function signature
        signature: String,

        /// Arguments, as JSON or bare strings
        args: Vec<String>,
    },

    /// Decode return data of a function
    DecodeOutput {
        /// Function signature including its returns clause
        signature: String,

        /// Hex encoded return data
        data: String,
    },

    /// Decode a log entry
    DecodeLog {
        /// Event signature
        #[arg(long, conflicts_with = "abi", required_unless_present = "abi")]
        event: Option<String>,

        /// JSON ABI file to pick the event from
        #[arg(long)]
        abi: Option<PathBuf>,

        /// Log topics in order, hex encoded
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Hex encoded log data
        #[arg(long, default_value = "0x")]
        data: String,
    },

    /// Perform a read-only call against the configured node
    Call {
        /// Contract address
        address: String,

        /// Function signature including its returns clause
        signature: String,

        /// Arguments, as JSON or bare strings
        args: Vec<String>,

        /// Block tag or number, overriding the configured default
        #[arg(long)]
        block: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BinderyConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let mut config = BinderyConfig::default();
            config.apply_environment_overrides()?;
            config
        }
    };

    init_tracing(&config.logging);

    match cli.command {
        Commands::Selector { signature } => {
            let (selector, canonical) = selector_of(&signature)?;
            println!("0x{}  {}", hex::encode(selector), canonical);
        }

        Commands::Topic { signature } => {
            let event = EventDescriptor::parse(&signature)?;
            println!("{:?}  {}", event.topic(), event.signature());
        }

        Commands::Encode { signature, args } => {
            let function = FunctionDescriptor::parse(&signature)?;
            let values = parse_args(&function.input_types(), &args)?;
            let calldata = function.encode_call(&values)?;
            println!("0x{}", hex::encode(calldata));
        }

        Commands::DecodeOutput { signature, data } => {
            let function = FunctionDescriptor::parse(&signature)?;
            let values = function.decode_output(&parse_hex(&data)?)?;
            print_json(&Value::Array(values.iter().map(AbiValue::to_json).collect()))?;
        }

        Commands::DecodeLog {
            event,
            abi,
            topics,
            data,
        } => {
            let log = Log {
                topics: topics
                    .iter()
                    .map(|t| H256::from_str(t).map_err(|e| anyhow!("invalid topic '{}': {}", t, e)))
                    .collect::<Result<Vec<_>>>()?,
                data: Bytes::from(parse_hex(&data)?),
                ..Default::default()
            };

            let decoded = match (event, abi) {
                (Some(signature), _) => EventDescriptor::parse(&signature)?.decode(&log)?,
                (None, Some(path)) => ContractAbi::from_file(path)?.decode_log(&log)?,
                (None, None) => bail!("either --event or --abi is required"),
            };
            print_json(&decoded.to_json())?;
        }

        Commands::Call {
            address,
            signature,
            args,
            block,
        } => {
            let address = Address::from_str(&address).map_err(|e| anyhow!("invalid address '{}': {}", address, e))?;
            let function = FunctionDescriptor::parse(&signature)?;
            let values = parse_args(&function.input_types(), &args)?;
            let block = parse_block(block.as_deref().unwrap_or(&config.call.block))?;

            let transport = EthersTransport::connect(&config.rpc).await?;
            let fees = Fees::from_config(&config.fees)?;
            let mut dispatcher =
                Dispatcher::new(Arc::new(transport), Arc::new(StaticFeePolicy(fees))).with_block(block);
            if let Some(caller) = &config.call.caller {
                let caller = Address::from_str(caller).map_err(|e| anyhow!("invalid caller '{}': {}", caller, e))?;
                dispatcher = dispatcher.with_caller(caller);
            }

            let name = function.name().to_string();
            let mut abi = ContractAbi::new();
            abi.add_function(function);
            let binding = ContractBinding::with_dispatcher(address, Arc::new(abi), dispatcher);

            info!(address = ?address, function = %signature, block = ?block, "Calling contract");
            let handle = binding.call(&name, &values)?;
            let output = handle.await?;
            print_json(&Value::Array(output.iter().map(AbiValue::to_json).collect()))?;
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Each argument is read as JSON first; anything that is not valid JSON
/// (addresses, hex, plain text) is taken as a string.
fn parse_args(types: &[AbiType], args: &[String]) -> Result<Vec<AbiValue>> {
    if types.len() != args.len() {
        bail!("expected {} arguments but got {}", types.len(), args.len());
    }
    types
        .iter()
        .zip(args)
        .map(|(ty, raw)| {
            // A string parameter always takes the argument verbatim
            let json = match ty {
                AbiType::String => Value::String(raw.clone()),
                _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
            };
            debug!(kind = %ty, value = %json, "Parsed argument");
            AbiValue::from_json(ty, &json).with_context(|| format!("argument '{}' for type {}", raw, ty))
        })
        .collect()
}

/// Selector and canonical signature of a function or `error` declaration
fn selector_of(signature: &str) -> Result<([u8; 4], String)> {
    let is_error = signature.trim_start().strip_prefix("error").map_or(false, |rest| {
        rest.starts_with(|c: char| c.is_whitespace())
    });
    if is_error {
        let error = ErrorDescriptor::parse(signature)?;
        Ok((error.selector(), error.signature().to_string()))
    } else {
        let function = FunctionDescriptor::parse(signature)?;
        Ok((function.selector(), function.signature().to_string()))
    }
}

fn parse_hex(data: &str) -> Result<Vec<u8>> {
    hex::decode(data.trim_start_matches("0x")).with_context(|| format!("invalid hex data '{}'", data))
}

fn parse_block(tag: &str) -> Result<BlockNumber> {
    Ok(match tag {
        "latest" => BlockNumber::Latest,
        "pending" => BlockNumber::Pending,
        "safe" => BlockNumber::Safe,
        "finalized" => BlockNumber::Finalized,
        "earliest" => BlockNumber::Earliest,
        _ => {
            let number = match tag.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => tag.parse::<u64>(),
            }
            .map_err(|_| anyhow!("invalid block tag '{}'", tag))?;
            BlockNumber::Number(U64::from(number))
        }
    })
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
