//! ABI type model and its canonical textual form

use std::fmt;
use std::str::FromStr;

use bindery_core::{Error, Result};

/// Size of one ABI word in bytes
pub const WORD: usize = 32;

/// An ABI parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// 20-byte account address, left padded to one word
    Address,
    /// Unsigned integer of the given bit width
    Uint(usize),
    /// Signed two's complement integer of the given bit width
    Int(usize),
    /// Boolean, encoded as a 0/1 word
    Bool,
    /// Dynamically sized byte string
    Bytes,
    /// Byte string of fixed size (1..=32), right padded to one word
    FixedBytes(usize),
    /// UTF-8 string, encoded like `bytes`
    String,
    /// Array of unknown length
    Array(Box<AbiType>),
    /// Array of fixed length
    FixedArray(Box<AbiType>, usize),
    /// Ordered list of component types (a Solidity struct)
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Check the width and size invariants, recursively.
    pub fn validate(&self) -> Result<()> {
        match self {
            AbiType::Uint(bits) | AbiType::Int(bits) => {
                if *bits == 0 || *bits > 256 || bits % 8 != 0 {
                    return Err(Error::descriptor(format!(
                        "invalid integer width {}: must be a multiple of 8 in [8, 256]",
                        bits
                    )));
                }
            }
            AbiType::FixedBytes(size) => {
                if *size == 0 || *size > WORD {
                    return Err(Error::descriptor(format!(
                        "invalid fixed bytes size {}: must be in [1, 32]",
                        size
                    )));
                }
            }
            AbiType::Array(inner) => inner.validate()?,
            AbiType::FixedArray(inner, len) => {
                if *len == 0 {
                    return Err(Error::descriptor("fixed array length must be at least 1"));
                }
                inner.validate()?;
            }
            AbiType::Tuple(fields) => {
                for field in fields {
                    field.validate()?;
                }
            }
            AbiType::Address | AbiType::Bool | AbiType::Bytes | AbiType::String => {}
        }
        Ok(())
    }

    /// Whether values of this type are encoded out-of-line behind an offset.
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(fields) => fields.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Number of head bytes a value of this type occupies, or `None` when
    /// the declared lengths overflow `usize`.
    ///
    /// Dynamic types occupy a single offset word.
    pub fn head_size(&self) -> Option<usize> {
        if self.is_dynamic() {
            return Some(WORD);
        }
        match self {
            AbiType::FixedArray(inner, len) => inner.head_size()?.checked_mul(*len),
            AbiType::Tuple(fields) => fields
                .iter()
                .try_fold(0usize, |acc, field| acc.checked_add(field.head_size()?)),
            _ => Some(WORD),
        }
    }

    /// Whether an indexed event parameter of this type is stored as a hash.
    pub fn is_hashed_in_topic(&self) -> bool {
        matches!(
            self,
            AbiType::Bytes
                | AbiType::String
                | AbiType::Array(_)
                | AbiType::FixedArray(..)
                | AbiType::Tuple(_)
        )
    }

    /// Canonical form used in signatures, e.g. `(address,uint256)[]`.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Address => write!(f, "address"),
            AbiType::Uint(bits) => write!(f, "uint{}", bits),
            AbiType::Int(bits) => write!(f, "int{}", bits),
            AbiType::Bool => write!(f, "bool"),
            AbiType::Bytes => write!(f, "bytes"),
            AbiType::FixedBytes(size) => write!(f, "bytes{}", size),
            AbiType::String => write!(f, "string"),
            AbiType::Array(inner) => write!(f, "{}[]", inner),
            AbiType::FixedArray(inner, len) => write!(f, "{}[{}]", inner, len),
            AbiType::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl FromStr for AbiType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = parse_type(s.trim())?;
        parsed.validate()?;
        Ok(parsed)
    }
}

fn parse_type(s: &str) -> Result<AbiType> {
    if s.is_empty() {
        return Err(Error::descriptor("empty ABI type"));
    }

    // Array suffixes bind last, so peel them off the end first
    if let Some(body) = s.strip_suffix(']') {
        let open = body
            .rfind('[')
            .ok_or_else(|| Error::descriptor(format!("unbalanced brackets in type '{}'", s)))?;
        let inner = parse_type(body[..open].trim_end())?;
        let dim = body[open + 1..].trim();
        return if dim.is_empty() {
            Ok(AbiType::Array(Box::new(inner)))
        } else {
            let len = dim
                .parse::<usize>()
                .map_err(|_| Error::descriptor(format!("invalid array length '{}' in type '{}'", dim, s)))?;
            Ok(AbiType::FixedArray(Box::new(inner), len))
        };
    }

    let tuple_body = s.strip_prefix("tuple").unwrap_or(s);
    if let Some(inner) = tuple_body.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        let fields = split_top_level(inner)?
            .into_iter()
            .map(|component| {
                // Components may carry names, e.g. "(address to, uint256 amount)"
                let ty = first_token(component);
                parse_type(ty)
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(AbiType::Tuple(fields));
    }

    match s {
        "address" => return Ok(AbiType::Address),
        "bool" => return Ok(AbiType::Bool),
        "string" => return Ok(AbiType::String),
        "bytes" => return Ok(AbiType::Bytes),
        "uint" => return Ok(AbiType::Uint(256)),
        "int" => return Ok(AbiType::Int(256)),
        // External function pointer: address followed by selector
        "function" => return Ok(AbiType::FixedBytes(24)),
        _ => {}
    }

    let sized = |prefix: &str| -> Option<Result<usize>> {
        s.strip_prefix(prefix)
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .map(|rest| {
                rest.parse::<usize>()
                    .map_err(|_| Error::descriptor(format!("invalid size in type '{}'", s)))
            })
    };

    if let Some(bits) = sized("uint") {
        return Ok(AbiType::Uint(bits?));
    }
    if let Some(bits) = sized("int") {
        return Ok(AbiType::Int(bits?));
    }
    if let Some(size) = sized("bytes") {
        return Ok(AbiType::FixedBytes(size?));
    }

    Err(Error::descriptor(format!("unknown ABI type '{}'", s)))
}

/// Split a comma separated list, ignoring commas nested in parentheses or brackets.
pub(crate) fn split_top_level(s: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::descriptor(format!("unbalanced parentheses in '{}'", s)));
                }
            }
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::descriptor(format!("unbalanced parentheses in '{}'", s)));
    }

    let last = s[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::descriptor(format!("empty component in '{}'", s)));
    }
    Ok(parts)
}

/// First whitespace separated token, treating parenthesised groups as one token.
pub(crate) fn first_token(s: &str) -> &str {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => return &s[..i],
            _ => {}
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> AbiType {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_elementary_types() {
        assert_eq!(ty("address"), AbiType::Address);
        assert_eq!(ty("uint8"), AbiType::Uint(8));
        assert_eq!(ty("uint"), AbiType::Uint(256));
        assert_eq!(ty("int"), AbiType::Int(256));
        assert_eq!(ty("int64"), AbiType::Int(64));
        assert_eq!(ty("bytes32"), AbiType::FixedBytes(32));
        assert_eq!(ty("bytes"), AbiType::Bytes);
        assert_eq!(ty("function"), AbiType::FixedBytes(24));
    }

    #[test]
    fn test_parse_nested_arrays_and_tuples() {
        assert_eq!(
            ty("uint256[2][]"),
            AbiType::Array(Box::new(AbiType::FixedArray(Box::new(AbiType::Uint(256)), 2)))
        );
        assert_eq!(
            ty("(address,(bool,string[]))[3]"),
            AbiType::FixedArray(
                Box::new(AbiType::Tuple(vec![
                    AbiType::Address,
                    AbiType::Tuple(vec![AbiType::Bool, AbiType::Array(Box::new(AbiType::String))]),
                ])),
                3
            )
        );
        assert_eq!(ty("tuple(uint8 a, bytes b)"), AbiType::Tuple(vec![AbiType::Uint(8), AbiType::Bytes]));
        assert_eq!(ty("()"), AbiType::Tuple(vec![]));
    }

    #[test]
    fn test_canonical_round_trip() {
        for s in ["uint256", "(address,uint256)[]", "string[3]", "((bytes4,int24)[],bool)", "bytes1[][2]"] {
            assert_eq!(ty(s).canonical(), s);
        }
    }

    #[test]
    fn test_rejects_invalid_widths() {
        for s in ["uint7", "uint264", "int0", "bytes0", "bytes33", "uint256[0]", "uint25x", "foo", "(uint256", "uint256]"] {
            assert!(s.parse::<AbiType>().is_err(), "{} should be rejected", s);
        }
    }

    #[test]
    fn test_dynamic_and_head_size() {
        assert!(!ty("uint256[3]").is_dynamic());
        assert_eq!(ty("uint256[3]").head_size(), Some(96));
        assert_eq!(ty("(address,bool[2])").head_size(), Some(96));
        assert!(ty("string[2]").is_dynamic());
        assert_eq!(ty("string[2]").head_size(), Some(32));
        assert!(ty("(uint256,bytes)").is_dynamic());
        assert_eq!(ty("uint256[576460752303423488]").head_size(), None);
        assert_eq!(ty("(bool,uint256[576460752303423488][2])").head_size(), None);
    }
}
