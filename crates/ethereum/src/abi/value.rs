//! Typed ABI values and their JSON representation

use std::fmt;
use std::str::FromStr;

use ethers::types::{Address, Sign, I256, U256};
use serde_json::Value;

use bindery_core::{Error, Result};

use super::types::AbiType;

/// A value tagged with its ABI type.
///
/// Integers keep their declared bit width so the value alone determines its
/// type, and arrays carry their element type so empty arrays stay typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiValue {
    Address(Address),
    Uint(U256, usize),
    Int(I256, usize),
    Bool(bool),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    String(String),
    Array(AbiType, Vec<AbiValue>),
    FixedArray(AbiType, Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// `uint256` value
    pub fn uint256<T: Into<U256>>(value: T) -> Self {
        AbiValue::Uint(value.into(), 256)
    }

    /// `int256` value
    pub fn int256<T: Into<I256>>(value: T) -> Self {
        AbiValue::Int(value.into(), 256)
    }

    /// The ABI type this value encodes as.
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::Address(_) => AbiType::Address,
            AbiValue::Uint(_, bits) => AbiType::Uint(*bits),
            AbiValue::Int(_, bits) => AbiType::Int(*bits),
            AbiValue::Bool(_) => AbiType::Bool,
            AbiValue::Bytes(_) => AbiType::Bytes,
            AbiValue::FixedBytes(bytes) => AbiType::FixedBytes(bytes.len()),
            AbiValue::String(_) => AbiType::String,
            AbiValue::Array(elem, _) => AbiType::Array(Box::new(elem.clone())),
            AbiValue::FixedArray(elem, values) => AbiType::FixedArray(Box::new(elem.clone()), values.len()),
            AbiValue::Tuple(values) => AbiType::Tuple(values.iter().map(AbiValue::abi_type).collect()),
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(address) => Some(*address),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<I256> {
        match self {
            AbiValue::Int(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Raw bytes of a `bytes` or `bytesN` value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Members of an array, fixed array or tuple
    pub fn as_slice(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Array(_, values) | AbiValue::FixedArray(_, values) | AbiValue::Tuple(values) => Some(values),
            _ => None,
        }
    }

    /// Build a value of type `ty` from its JSON form.
    ///
    /// Integers accept JSON numbers, decimal strings and `0x` hex strings;
    /// addresses and byte strings are `0x` hex; arrays and tuples are JSON arrays.
    pub fn from_json(ty: &AbiType, json: &Value) -> Result<Self> {
        let mismatch = || Error::encode(format!("expected {} but got JSON {}", ty, json));

        match ty {
            AbiType::Address => {
                let s = json.as_str().ok_or_else(mismatch)?;
                Address::from_str(s)
                    .map(AbiValue::Address)
                    .map_err(|e| Error::encode(format!("invalid address '{}': {}", s, e)))
            }
            AbiType::Uint(bits) => {
                let value = match json {
                    Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(mismatch)?,
                    Value::String(s) => parse_u256(s)?,
                    _ => return Err(mismatch()),
                };
                Ok(AbiValue::Uint(value, *bits))
            }
            AbiType::Int(bits) => {
                let value = match json {
                    Value::Number(n) => n.as_i64().map(I256::from).ok_or_else(mismatch)?,
                    Value::String(s) => parse_i256(s)?,
                    _ => return Err(mismatch()),
                };
                Ok(AbiValue::Int(value, *bits))
            }
            AbiType::Bool => json.as_bool().map(AbiValue::Bool).ok_or_else(mismatch),
            AbiType::String => json
                .as_str()
                .map(|s| AbiValue::String(s.to_string()))
                .ok_or_else(mismatch),
            AbiType::Bytes => Ok(AbiValue::Bytes(parse_hex(json.as_str().ok_or_else(mismatch)?)?)),
            AbiType::FixedBytes(size) => {
                let bytes = parse_hex(json.as_str().ok_or_else(mismatch)?)?;
                if bytes.len() != *size {
                    return Err(Error::encode(format!(
                        "expected {} bytes for {} but got {}",
                        size,
                        ty,
                        bytes.len()
                    )));
                }
                Ok(AbiValue::FixedBytes(bytes))
            }
            AbiType::Array(elem) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                let values = items
                    .iter()
                    .map(|item| AbiValue::from_json(elem, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(AbiValue::Array((**elem).clone(), values))
            }
            AbiType::FixedArray(elem, len) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                if items.len() != *len {
                    return Err(Error::encode(format!(
                        "expected {} elements for {} but got {}",
                        len,
                        ty,
                        items.len()
                    )));
                }
                let values = items
                    .iter()
                    .map(|item| AbiValue::from_json(elem, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(AbiValue::FixedArray((**elem).clone(), values))
            }
            AbiType::Tuple(fields) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                if items.len() != fields.len() {
                    return Err(Error::encode(format!(
                        "expected {} components for {} but got {}",
                        fields.len(),
                        ty,
                        items.len()
                    )));
                }
                let values = fields
                    .iter()
                    .zip(items)
                    .map(|(field, item)| AbiValue::from_json(field, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(AbiValue::Tuple(values))
            }
        }
    }

    /// JSON form of this value; integers are rendered as decimal strings.
    pub fn to_json(&self) -> Value {
        match self {
            AbiValue::Address(address) => Value::String(format!("{:?}", address)),
            AbiValue::Uint(value, _) => Value::String(value.to_string()),
            AbiValue::Int(value, _) => Value::String(value.to_string()),
            AbiValue::Bool(value) => Value::Bool(*value),
            AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
            AbiValue::String(value) => Value::String(value.clone()),
            AbiValue::Array(_, values) | AbiValue::FixedArray(_, values) | AbiValue::Tuple(values) => {
                Value::Array(values.iter().map(AbiValue::to_json).collect())
            }
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Address(address) => write!(f, "{:?}", address),
            AbiValue::Uint(value, _) => write!(f, "{}", value),
            AbiValue::Int(value, _) => write!(f, "{}", value),
            AbiValue::Bool(value) => write!(f, "{}", value),
            AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            AbiValue::String(value) => write!(f, "{:?}", value),
            AbiValue::Array(_, values) | AbiValue::FixedArray(_, values) => {
                write!(f, "[")?;
                write_list(f, values)?;
                write!(f, "]")
            }
            AbiValue::Tuple(values) => {
                write!(f, "(")?;
                write_list(f, values)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[AbiValue]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

impl From<Address> for AbiValue {
    fn from(address: Address) -> Self {
        AbiValue::Address(address)
    }
}

impl From<bool> for AbiValue {
    fn from(value: bool) -> Self {
        AbiValue::Bool(value)
    }
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        AbiValue::Uint(value, 256)
    }
}

impl From<I256> for AbiValue {
    fn from(value: I256) -> Self {
        AbiValue::Int(value, 256)
    }
}

impl From<String> for AbiValue {
    fn from(value: String) -> Self {
        AbiValue::String(value)
    }
}

impl From<&str> for AbiValue {
    fn from(value: &str) -> Self {
        AbiValue::String(value.to_string())
    }
}

fn parse_u256(s: &str) -> Result<U256> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None => U256::from_dec_str(s).ok(),
    };
    parsed.ok_or_else(|| Error::encode(format!("invalid unsigned integer '{}'", s)))
}

fn parse_i256(s: &str) -> Result<I256> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = parse_u256(digits)?;
    let sign = if negative { Sign::Negative } else { Sign::Positive };
    I256::checked_from_sign_and_abs(sign, magnitude)
        .ok_or_else(|| Error::encode(format!("signed integer '{}' out of range", s)))
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| Error::encode(format!("invalid hex '{}': {}", s, e)))
}
