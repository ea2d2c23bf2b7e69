//! ABI definition loader
//!
//! Builds a [`ContractAbi`] from standard JSON ABI files (or compiler artifacts
//! carrying an `abi` field) and from human-readable signatures such as
//! `function transfer(address to, uint256 amount) returns (bool)`.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use bindery_core::{Error, Result};

use super::types::{first_token, split_top_level, AbiType};
use crate::contract::ContractAbi;
use crate::event::{EventDescriptor, EventParam};
use crate::function::{ConstructorDescriptor, FunctionDescriptor, Mutability, Param};
use crate::revert::ErrorDescriptor;

/// Ethereum ABI parser
#[derive(Debug, Default, Clone, Copy)]
pub struct AbiParser;

impl AbiParser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Self
    }

    /// Parse an ABI file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ContractAbi> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.parse_content(&content)
    }

    /// Parse an ABI from JSON content
    pub fn parse_content(&self, content: &str) -> Result<ContractAbi> {
        let value: Value = serde_json::from_str(content)?;
        self.parse_abi(&value)
    }

    /// Parse an ABI from a JSON value: either the ABI array itself or an
    /// artifact object with an `abi` field.
    pub fn parse_abi(&self, value: &Value) -> Result<ContractAbi> {
        let items = value
            .as_array()
            .or_else(|| value.get("abi").and_then(Value::as_array))
            .ok_or_else(|| Error::descriptor("ABI must be an array or an object with an 'abi' array"))?;

        let mut abi = ContractAbi::new();

        for item in items {
            let item_type = item.get("type").and_then(Value::as_str).unwrap_or("function");

            match item_type {
                "constructor" => {
                    let inputs = parse_parameters(item.get("inputs"))?;
                    let payable = state_mutability(item)? == Mutability::Payable;
                    abi.set_constructor(ConstructorDescriptor::new(inputs, payable)?);
                }
                "function" => {
                    let name = required_name(item, "Function")?;
                    let inputs = parse_parameters(item.get("inputs"))?;
                    let outputs = parse_parameters(item.get("outputs"))?;
                    let mutability = state_mutability(item)?;
                    abi.add_function(FunctionDescriptor::new(name, inputs, outputs, mutability)?);
                }
                "event" => {
                    let name = required_name(item, "Event")?;
                    let params = parse_event_parameters(item.get("inputs"))?;
                    let anonymous = item.get("anonymous").and_then(Value::as_bool).unwrap_or(false);
                    abi.add_event(EventDescriptor::new(name, params, anonymous)?);
                }
                "error" => {
                    let name = required_name(item, "Error")?;
                    let inputs = parse_parameters(item.get("inputs"))?;
                    abi.add_error(ErrorDescriptor::new(name, inputs)?);
                }
                other => {
                    // fallback and receive have no selector to dispatch on
                    debug!(item_type = other, "Skipping ABI entry");
                }
            }
        }

        Ok(abi)
    }

    /// Build an ABI from human-readable signatures, one per entry.
    ///
    /// Entries start with `function`, `event`, `error` or `constructor`; a bare
    /// `name(...)` is taken as a function.
    pub fn parse_signatures<S: AsRef<str>>(&self, signatures: &[S]) -> Result<ContractAbi> {
        let mut abi = ContractAbi::new();

        for signature in signatures {
            let signature = signature.as_ref().trim();
            if signature.is_empty() {
                continue;
            }

            match signature.split_whitespace().next().map(|w| w.split('(').next().unwrap_or(w)) {
                Some("event") => abi.add_event(EventDescriptor::parse(signature)?),
                Some("error") => abi.add_error(ErrorDescriptor::parse(signature)?),
                Some("constructor") => abi.set_constructor(ConstructorDescriptor::parse(signature)?),
                _ => abi.add_function(FunctionDescriptor::parse(signature)?),
            }
        }

        Ok(abi)
    }
}

fn required_name<'a>(item: &'a Value, kind: &str) -> Result<&'a str> {
    item.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::descriptor(format!("{} must have a name", kind)))
}

fn state_mutability(item: &Value) -> Result<Mutability> {
    match item.get("stateMutability").and_then(Value::as_str) {
        Some(s) => Mutability::from_state_mutability(s),
        // Legacy ABIs only carry the constant/payable flags
        None if item.get("constant").and_then(Value::as_bool).unwrap_or(false) => Ok(Mutability::Read),
        None if item.get("payable").and_then(Value::as_bool).unwrap_or(false) => Ok(Mutability::Payable),
        None => Ok(Mutability::Write),
    }
}

fn parse_parameters(params: Option<&Value>) -> Result<Vec<Param>> {
    let Some(params) = params.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    params
        .iter()
        .map(|param| {
            let name = param.get("name").and_then(Value::as_str).unwrap_or("");
            Ok(Param::new(name, resolve_type(param)?))
        })
        .collect()
}

fn parse_event_parameters(params: Option<&Value>) -> Result<Vec<EventParam>> {
    let Some(params) = params.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    params
        .iter()
        .map(|param| {
            let name = param.get("name").and_then(Value::as_str).unwrap_or("");
            let indexed = param.get("indexed").and_then(Value::as_bool).unwrap_or(false);
            Ok(EventParam::new(name, resolve_type(param)?, indexed))
        })
        .collect()
}

/// Resolve a JSON ABI parameter to its type, expanding `tuple` from its components.
fn resolve_type(param: &Value) -> Result<AbiType> {
    let ty = param
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::descriptor("Parameter must have a type"))?;

    match ty.strip_prefix("tuple") {
        Some(suffix) => {
            let components = param
                .get("components")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::descriptor(format!("Tuple parameter '{}' must have components", ty)))?;
            let fields = components.iter().map(resolve_type).collect::<Result<Vec<_>>>()?;
            format!("{}{}", AbiType::Tuple(fields), suffix).parse()
        }
        None => ty.parse(),
    }
}

/// A human-readable signature split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignatureParts<'a> {
    pub name: &'a str,
    pub params: &'a str,
    pub rest: &'a str,
}

/// Split `[keyword] name(params) rest` into its parts, with `keyword` removed.
pub(crate) fn split_signature<'a>(signature: &'a str, keyword: &str) -> Result<SignatureParts<'a>> {
    let s = signature.trim();
    let s = s
        .strip_prefix(keyword)
        .filter(|rest| rest.starts_with(|c: char| c == '(' || c.is_whitespace()))
        .unwrap_or(s)
        .trim_start();

    let open = s
        .find('(')
        .ok_or_else(|| Error::descriptor(format!("missing parameter list in '{}'", signature)))?;
    let close = matching_paren(s, open)
        .ok_or_else(|| Error::descriptor(format!("unbalanced parentheses in '{}'", signature)))?;

    Ok(SignatureParts {
        name: s[..open].trim(),
        params: &s[open + 1..close],
        rest: s[close + 1..].trim(),
    })
}

/// Index of the `)` closing the `(` at `open`.
pub(crate) fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// One parameter of a human-readable signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedParam {
    pub name: String,
    pub kind: AbiType,
    pub indexed: bool,
}

/// Parse `type [indexed] [location] [name], ...`.
pub(crate) fn parse_param_list(list: &str) -> Result<Vec<ParsedParam>> {
    split_top_level(list.trim())?
        .into_iter()
        .map(|component| {
            let ty = first_token(component);
            let kind: AbiType = ty.parse()?;
            let mut indexed = false;
            let mut name = None;

            for word in component[ty.len()..].split_whitespace() {
                match word {
                    "indexed" => indexed = true,
                    "memory" | "calldata" | "storage" | "payable" => {}
                    word if name.is_none() => name = Some(word.to_string()),
                    _ => {
                        return Err(Error::descriptor(format!(
                            "unexpected token '{}' in parameter '{}'",
                            word, component
                        )))
                    }
                }
            }

            Ok(ParsedParam {
                name: name.unwrap_or_default(),
                kind,
                indexed,
            })
        })
        .collect()
}

/// Check that `name` is a valid Solidity identifier.
pub(crate) fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        Ok(())
    } else {
        Err(Error::descriptor(format!("invalid identifier '{}'", name)))
    }
}
