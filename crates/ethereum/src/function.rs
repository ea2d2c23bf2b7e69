//! Function and constructor descriptors

use std::fmt;

use bindery_core::{Error, Result};

use crate::abi::parser::{check_identifier, parse_param_list, split_signature};
use crate::abi::{self, AbiType, AbiValue};

/// A named parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub kind: AbiType,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: AbiType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn unnamed(kind: AbiType) -> Self {
        Self::new("", kind)
    }
}

/// How a function interacts with chain state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// `view` or `pure`: simulated, never submitted
    Read,
    /// `nonpayable`: submitted as a signed transaction
    Write,
    /// `payable`: like `Write`, may carry native value
    Payable,
}

impl Mutability {
    /// Map a JSON ABI `stateMutability` string.
    pub fn from_state_mutability(s: &str) -> Result<Self> {
        match s {
            "view" | "pure" => Ok(Mutability::Read),
            "nonpayable" => Ok(Mutability::Write),
            "payable" => Ok(Mutability::Payable),
            other => Err(Error::descriptor(format!("unknown state mutability '{}'", other))),
        }
    }

    pub fn is_read(self) -> bool {
        self == Mutability::Read
    }
}

/// One callable contract method.
///
/// The canonical signature and selector are computed at construction and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionDescriptor {
    name: String,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    mutability: Mutability,
    signature: String,
    selector: [u8; 4],
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, inputs: Vec<Param>, outputs: Vec<Param>, mutability: Mutability) -> Result<Self> {
        let name = name.into();
        check_identifier(&name)?;
        for param in inputs.iter().chain(&outputs) {
            param.kind.validate()?;
        }

        let signature = abi::signature(&name, inputs.iter().map(|p| &p.kind));
        let selector = abi::selector(&signature);

        Ok(Self {
            name,
            inputs,
            outputs,
            mutability,
            signature,
            selector,
        })
    }

    /// Parse a human-readable signature:
    /// `[function] name(type [name], ...) [visibility] [view|pure|payable|nonpayable] [returns (type [name], ...)]`
    pub fn parse(signature: &str) -> Result<Self> {
        let parts = split_signature(signature, "function")?;
        let inputs = to_params(parse_param_list(parts.params)?);

        let (modifiers, returns) = match parts.rest.find("returns") {
            Some(at) => (&parts.rest[..at], Some(parts.rest[at + "returns".len()..].trim())),
            None => (parts.rest, None),
        };

        let mut mutability = Mutability::Write;
        for word in modifiers.split_whitespace() {
            match word {
                "view" | "pure" | "nonpayable" | "payable" => mutability = Mutability::from_state_mutability(word)?,
                "external" | "public" | "virtual" | "override" => {}
                other => {
                    return Err(Error::descriptor(format!(
                        "unexpected modifier '{}' in '{}'",
                        other, signature
                    )))
                }
            }
        }

        let outputs = match returns {
            Some(list) => {
                let inner = list
                    .strip_prefix('(')
                    .and_then(|l| l.strip_suffix(')'))
                    .ok_or_else(|| Error::descriptor(format!("malformed returns clause in '{}'", signature)))?;
                to_params(parse_param_list(inner)?)
            }
            None => Vec::new(),
        };

        Self::new(parts.name, inputs, outputs, mutability)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Param] {
        &self.outputs
    }

    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    pub fn input_types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    pub fn output_types(&self) -> Vec<AbiType> {
        self.outputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Call data: selector followed by the encoded arguments.
    pub fn encode_call(&self, args: &[AbiValue]) -> Result<Vec<u8>> {
        let encoded = abi::encode_params(&self.input_types(), args)
            .map_err(|e| Error::encode(format!("{}: {}", self.signature, e)))?;
        let mut data = Vec::with_capacity(4 + encoded.len());
        data.extend_from_slice(&self.selector);
        data.extend(encoded);
        Ok(data)
    }

    /// Decode return data against the declared outputs.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiValue>> {
        abi::decode(&self.output_types(), data)
    }

    /// Decode call data produced for this function, checking the selector.
    pub fn decode_input(&self, calldata: &[u8]) -> Result<Vec<AbiValue>> {
        if calldata.len() < 4 || calldata[..4] != self.selector {
            return Err(Error::decode(format!(
                "call data does not start with the selector 0x{} of {}",
                hex::encode(self.selector),
                self.signature
            )));
        }
        abi::decode(&self.input_types(), &calldata[4..])
    }
}

impl fmt::Display for FunctionDescriptor {
    /// Human-readable form, e.g. `function balanceOf(address account) view returns (uint256)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}({})", self.name, display_params(&self.inputs))?;
        match self.mutability {
            Mutability::Read => write!(f, " view")?,
            Mutability::Payable => write!(f, " payable")?,
            Mutability::Write => {}
        }
        if !self.outputs.is_empty() {
            write!(f, " returns ({})", display_params(&self.outputs))?;
        }
        Ok(())
    }
}

/// Contract constructor: inputs only, no selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConstructorDescriptor {
    inputs: Vec<Param>,
    payable: bool,
}

impl ConstructorDescriptor {
    pub fn new(inputs: Vec<Param>, payable: bool) -> Result<Self> {
        for param in &inputs {
            param.kind.validate()?;
        }
        Ok(Self { inputs, payable })
    }

    /// Parse `constructor(type [name], ...) [payable]`.
    pub fn parse(signature: &str) -> Result<Self> {
        let parts = split_signature(signature, "constructor")?;
        if !parts.name.is_empty() {
            return Err(Error::descriptor(format!("expected a constructor signature, got '{}'", signature)));
        }
        let payable = parts.rest.split_whitespace().any(|word| word == "payable");
        Self::new(to_params(parse_param_list(parts.params)?), payable)
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn is_payable(&self) -> bool {
        self.payable
    }

    pub fn input_types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Creation data: bytecode followed by the encoded arguments, no selector.
    pub fn encode_deploy(&self, bytecode: &[u8], args: &[AbiValue]) -> Result<Vec<u8>> {
        let encoded = abi::encode_params(&self.input_types(), args)
            .map_err(|e| Error::encode(format!("constructor: {}", e)))?;
        let mut data = Vec::with_capacity(bytecode.len() + encoded.len());
        data.extend_from_slice(bytecode);
        data.extend(encoded);
        Ok(data)
    }
}

pub(crate) fn to_params(parsed: Vec<crate::abi::parser::ParsedParam>) -> Vec<Param> {
    parsed.into_iter().map(|p| Param::new(p.name, p.kind)).collect()
}

pub(crate) fn display_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            if p.name.is_empty() {
                p.kind.canonical()
            } else {
                format!("{} {}", p.kind, p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, U256};

    fn transfer() -> FunctionDescriptor {
        FunctionDescriptor::new(
            "transfer",
            vec![Param::new("to", AbiType::Address), Param::new("amount", AbiType::Uint(256))],
            vec![Param::unnamed(AbiType::Bool)],
            Mutability::Write,
        )
        .unwrap()
    }

    #[test]
    fn test_selector_is_deterministic() {
        assert_eq!(transfer().signature(), "transfer(address,uint256)");
        assert_eq!(hex::encode(transfer().selector()), "a9059cbb");
        assert_eq!(transfer().selector(), transfer().selector());

        let changed = FunctionDescriptor::new(
            "transfer",
            vec![Param::unnamed(AbiType::Address), Param::unnamed(AbiType::Uint(128))],
            vec![],
            Mutability::Write,
        )
        .unwrap();
        assert_ne!(changed.selector(), transfer().selector());
    }

    #[test]
    fn test_encode_call_and_decode_input() {
        let to = Address::from_low_u64_be(0xbeef);
        let args = vec![AbiValue::Address(to), AbiValue::uint256(1000u64)];
        let calldata = transfer().encode_call(&args).unwrap();

        assert_eq!(calldata.len(), 4 + 64);
        assert_eq!(&calldata[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(transfer().decode_input(&calldata).unwrap(), args);

        let mut wrong = calldata.clone();
        wrong[0] = 0;
        assert!(matches!(transfer().decode_input(&wrong), Err(Error::Decode(_))));
        assert!(matches!(transfer().decode_input(&[0xa9]), Err(Error::Decode(_))));
    }

    #[test]
    fn test_encode_call_rejects_wrong_arguments() {
        let result = transfer().encode_call(&[AbiValue::uint256(1u64), AbiValue::uint256(2u64)]);
        assert!(matches!(result, Err(Error::Encode(_))));
    }

    #[test]
    fn test_decode_output() {
        let mut word = vec![0u8; 32];
        word[31] = 1;
        assert_eq!(transfer().decode_output(&word).unwrap(), vec![AbiValue::Bool(true)]);
        assert!(transfer().decode_output(&[]).is_err());
    }

    #[test]
    fn test_parse_human_readable() {
        let f = FunctionDescriptor::parse("function balanceOf(address account) external view returns (uint256 balance)").unwrap();
        assert_eq!(f.name(), "balanceOf");
        assert_eq!(f.mutability(), Mutability::Read);
        assert_eq!(f.outputs()[0].name, "balance");
        assert_eq!(f.to_string(), "function balanceOf(address account) view returns (uint256 balance)");

        let f = FunctionDescriptor::parse("deposit() payable").unwrap();
        assert_eq!(f.mutability(), Mutability::Payable);
        assert!(f.outputs().is_empty());

        assert!(FunctionDescriptor::parse("function f() constant").is_err());
        assert!(FunctionDescriptor::parse("function 9f()").is_err());
        assert!(FunctionDescriptor::parse("function f() returns uint256").is_err());
    }

    #[test]
    fn test_constructor_encoding_has_no_selector() {
        let ctor = ConstructorDescriptor::parse("constructor(address owner)").unwrap();
        let owner = Address::from_low_u64_be(0xaa);
        let bytecode = vec![0x60, 0x80, 0x60, 0x40];
        let data = ctor.encode_deploy(&bytecode, &[AbiValue::Address(owner)]).unwrap();

        assert_eq!(&data[..4], bytecode.as_slice());
        assert_eq!(&data[4..], abi::encode(&[AbiValue::Address(owner)]).unwrap().as_slice());
        assert!(ctor.encode_deploy(&bytecode, &[AbiValue::from(U256::one())]).is_err());
    }
}
