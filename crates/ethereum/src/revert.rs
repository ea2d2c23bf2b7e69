//! Custom error descriptors and revert data decoding

use ethers::types::U256;

use bindery_core::{Error, Result};

use crate::abi::parser::{check_identifier, parse_param_list, split_signature};
use crate::abi::{self, AbiType, AbiValue};
use crate::function::{display_params, to_params, Param};

/// Selector of `Error(string)`
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// A Solidity custom error
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorDescriptor {
    name: String,
    inputs: Vec<Param>,
    signature: String,
    selector: [u8; 4],
}

impl ErrorDescriptor {
    pub fn new(name: impl Into<String>, inputs: Vec<Param>) -> Result<Self> {
        let name = name.into();
        check_identifier(&name)?;
        for param in &inputs {
            param.kind.validate()?;
        }
        let signature = abi::signature(&name, inputs.iter().map(|p| &p.kind));
        let selector = abi::selector(&signature);
        Ok(Self {
            name,
            inputs,
            signature,
            selector,
        })
    }

    /// Parse `error Name(type [name], ...)`.
    pub fn parse(signature: &str) -> Result<Self> {
        let parts = split_signature(signature, "error")?;
        if !parts.rest.is_empty() {
            return Err(Error::descriptor(format!("unexpected '{}' in '{}'", parts.rest, signature)));
        }
        Self::new(parts.name, to_params(parse_param_list(parts.params)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Decode revert data raised with this error.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<AbiValue>> {
        if data.len() < 4 || data[..4] != self.selector {
            return Err(Error::decode(format!("revert data is not a {} error", self.signature)));
        }
        let types: Vec<AbiType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        abi::decode(&types, &data[4..])
    }

    /// Encode revert data for this error, as a contract would.
    pub fn encode(&self, args: &[AbiValue]) -> Result<Vec<u8>> {
        let types: Vec<AbiType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        let mut data = self.selector.to_vec();
        data.extend(abi::encode_params(&types, args)?);
        Ok(data)
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {}({})", self.name, display_params(&self.inputs))
    }
}

/// Turn raw revert data into a human-readable reason.
///
/// Understands `Error(string)`, `Panic(uint256)` and the given custom errors;
/// anything else is reported as hex.
pub fn decode_revert_reason(data: &[u8], errors: &[ErrorDescriptor]) -> String {
    if data.is_empty() {
        return "execution reverted without a reason".to_string();
    }
    if data.len() < 4 {
        return format!("unrecognized revert data 0x{}", hex::encode(data));
    }

    let selector = &data[..4];
    if selector == ERROR_STRING_SELECTOR {
        if let Ok(AbiValue::String(reason)) = abi::decode_single(&AbiType::String, &data[4..]) {
            return reason;
        }
    } else if selector == PANIC_SELECTOR {
        if let Ok(AbiValue::Uint(code, _)) = abi::decode_single(&AbiType::Uint(256), &data[4..]) {
            return panic_reason(code);
        }
    } else if let Some(error) = errors.iter().find(|e| e.selector() == selector) {
        if let Ok(values) = error.decode(data) {
            let args: Vec<String> = values.iter().map(ToString::to_string).collect();
            return format!("{}({})", error.name(), args.join(", "));
        }
    }

    format!("unrecognized revert data 0x{}", hex::encode(data))
}

/// Describe a Solidity panic code
pub fn panic_reason(code: U256) -> String {
    if code > U256::from(u64::MAX) {
        return format!("panic 0x{:x}: unknown panic code", code);
    }
    let code = code.low_u64();
    let description = match code {
        0x00 => "generic compiler panic",
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x22 => "incorrectly encoded storage byte array",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to uninitialized internal function",
        _ => "unknown panic code",
    };
    format!("panic 0x{:02x}: {}", code, description)
}
