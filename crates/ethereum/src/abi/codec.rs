//! Head/tail ABI encoding and strict decoding

use ethers::types::{Address, I256, U256};

use bindery_core::{Error, Result};

use super::types::{AbiType, WORD};
use super::value::AbiValue;

/// Encode a list of values as the ABI encoding of a tuple of them.
pub fn encode(values: &[AbiValue]) -> Result<Vec<u8>> {
    for value in values {
        check_value(value)?;
    }
    Ok(encode_sequence(values))
}

/// Encode values against declared parameter types.
///
/// Each value must carry exactly the declared type.
pub fn encode_params(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(Error::encode(format!(
            "expected {} arguments but got {}",
            types.len(),
            values.len()
        )));
    }
    for (i, (ty, value)) in types.iter().zip(values).enumerate() {
        let actual = value.abi_type();
        if actual != *ty {
            return Err(Error::encode(format!(
                "argument {} has type {} but {} was declared",
                i, actual, ty
            )));
        }
    }
    encode(values)
}

/// Encode one value on its own.
pub fn encode_single(value: &AbiValue) -> Result<Vec<u8>> {
    encode(std::slice::from_ref(value))
}

/// Decode `data` as a tuple of `types`.
///
/// All offsets and lengths are taken from the data and bounds checked; any
/// inconsistency is a decode error.
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>> {
    for ty in types {
        ty.validate().map_err(|e| Error::decode(e.to_string()))?;
    }
    decode_sequence(types.iter(), data, 0)
}

/// Decode a single value of type `ty`.
pub fn decode_single(ty: &AbiType, data: &[u8]) -> Result<AbiValue> {
    let mut values = decode(std::slice::from_ref(ty), data)?;
    values.pop().ok_or_else(|| Error::decode("no value decoded"))
}

fn check_value(value: &AbiValue) -> Result<()> {
    match value {
        AbiValue::Uint(v, bits) => {
            check_width(*bits)?;
            if v.bits() > *bits {
                return Err(Error::encode(format!("value {} does not fit in uint{}", v, bits)));
            }
        }
        AbiValue::Int(v, bits) => {
            check_width(*bits)?;
            if !int_fits(*v, *bits) {
                return Err(Error::encode(format!("value {} does not fit in int{}", v, bits)));
            }
        }
        AbiValue::FixedBytes(bytes) => {
            if bytes.is_empty() || bytes.len() > WORD {
                return Err(Error::encode(format!(
                    "fixed bytes value has {} bytes, expected 1 to 32",
                    bytes.len()
                )));
            }
        }
        AbiValue::Array(elem, items) => check_items(elem, items)?,
        AbiValue::FixedArray(elem, items) => {
            if items.is_empty() {
                return Err(Error::encode("fixed array value must have at least one element"));
            }
            check_items(elem, items)?;
        }
        AbiValue::Tuple(items) => {
            for item in items {
                check_value(item)?;
            }
        }
        AbiValue::Address(_) | AbiValue::Bool(_) | AbiValue::Bytes(_) | AbiValue::String(_) => {}
    }
    Ok(())
}

fn check_width(bits: usize) -> Result<()> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(Error::encode(format!("invalid integer width {}", bits)));
    }
    Ok(())
}

fn check_items(elem: &AbiType, items: &[AbiValue]) -> Result<()> {
    elem.validate().map_err(|e| Error::encode(e.to_string()))?;
    for item in items {
        let actual = item.abi_type();
        if actual != *elem {
            return Err(Error::encode(format!(
                "array element of type {} in array of {}",
                actual, elem
            )));
        }
        check_value(item)?;
    }
    Ok(())
}

fn int_fits(value: I256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    let bound = I256::from_raw(U256::one() << (bits - 1));
    value >= -bound && value < bound
}

fn is_dynamic(value: &AbiValue) -> bool {
    match value {
        AbiValue::Bytes(_) | AbiValue::String(_) | AbiValue::Array(..) => true,
        AbiValue::FixedArray(elem, _) => elem.is_dynamic(),
        AbiValue::Tuple(items) => items.iter().any(is_dynamic),
        _ => false,
    }
}

fn encode_sequence(values: &[AbiValue]) -> Vec<u8> {
    let parts: Vec<(bool, Vec<u8>)> = values.iter().map(|v| (is_dynamic(v), encode_value(v))).collect();
    let head_len: usize = parts
        .iter()
        .map(|(dynamic, bytes)| if *dynamic { WORD } else { bytes.len() })
        .sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (dynamic, bytes) in parts {
        if dynamic {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(bytes);
        } else {
            head.extend(bytes);
        }
    }

    head.extend(tail);
    head
}

fn encode_value(value: &AbiValue) -> Vec<u8> {
    match value {
        AbiValue::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word.to_vec()
        }
        AbiValue::Uint(v, _) => u256_word(*v).to_vec(),
        AbiValue::Int(v, _) => u256_word(v.into_raw()).to_vec(),
        AbiValue::Bool(b) => u256_word(U256::from(*b as u8)).to_vec(),
        AbiValue::FixedBytes(bytes) => {
            let mut word = [0u8; WORD];
            word[..bytes.len()].copy_from_slice(bytes);
            word.to_vec()
        }
        AbiValue::Bytes(bytes) => encode_packed_bytes(bytes),
        AbiValue::String(s) => encode_packed_bytes(s.as_bytes()),
        AbiValue::Array(_, items) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(items));
            out
        }
        AbiValue::FixedArray(_, items) | AbiValue::Tuple(items) => encode_sequence(items),
    }
}

fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn u256_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn usize_word(value: usize) -> [u8; WORD] {
    u256_word(U256::from(value))
}

fn decode_sequence<'a, I>(types: I, data: &[u8], base: usize) -> Result<Vec<AbiValue>>
where
    I: IntoIterator<Item = &'a AbiType>,
{
    let mut values = Vec::new();
    let mut head = base;

    for ty in types {
        let value = if ty.is_dynamic() {
            let offset = read_usize(data, head)?;
            let start = base
                .checked_add(offset)
                .filter(|start| *start <= data.len())
                .ok_or_else(|| {
                    Error::decode(format!(
                        "offset {} at byte {} points past the end of {} bytes",
                        offset,
                        head,
                        data.len()
                    ))
                })?;
            decode_value(ty, data, start)?
        } else {
            decode_value(ty, data, head)?
        };
        values.push(value);
        head = ty
            .head_size()
            .and_then(|size| head.checked_add(size))
            .ok_or_else(|| Error::decode(format!("head of {} at byte {} overflows", ty, head)))?;
    }

    Ok(values)
}

fn decode_value(ty: &AbiType, data: &[u8], pos: usize) -> Result<AbiValue> {
    match ty {
        AbiType::Address => {
            let word = read_word(data, pos)?;
            if word[..12].iter().any(|b| *b != 0) {
                return Err(Error::decode(format!("address at byte {} has non-zero padding", pos)));
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiType::Uint(bits) => {
            let value = U256::from_big_endian(read_word(data, pos)?);
            if value.bits() > *bits {
                return Err(Error::decode(format!("value {} at byte {} does not fit in uint{}", value, pos, bits)));
            }
            Ok(AbiValue::Uint(value, *bits))
        }
        AbiType::Int(bits) => {
            let value = I256::from_raw(U256::from_big_endian(read_word(data, pos)?));
            if !int_fits(value, *bits) {
                return Err(Error::decode(format!(
                    "word at byte {} is not a sign-extended int{}",
                    pos, bits
                )));
            }
            Ok(AbiValue::Int(value, *bits))
        }
        AbiType::Bool => {
            let word = read_word(data, pos)?;
            match U256::from_big_endian(word) {
                v if v.is_zero() => Ok(AbiValue::Bool(false)),
                v if v == U256::one() => Ok(AbiValue::Bool(true)),
                v => Err(Error::decode(format!("invalid boolean {} at byte {}", v, pos))),
            }
        }
        AbiType::FixedBytes(size) => {
            let word = read_word(data, pos)?;
            if word[*size..].iter().any(|b| *b != 0) {
                return Err(Error::decode(format!("bytes{} at byte {} has non-zero padding", size, pos)));
            }
            Ok(AbiValue::FixedBytes(word[..*size].to_vec()))
        }
        AbiType::Bytes => Ok(AbiValue::Bytes(read_packed_bytes(data, pos)?.to_vec())),
        AbiType::String => {
            let bytes = read_packed_bytes(data, pos)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| Error::decode(format!("string at byte {} is not valid UTF-8: {}", pos, e)))?;
            Ok(AbiValue::String(s.to_string()))
        }
        AbiType::Array(elem) => {
            let len = read_usize(data, pos)?;
            let start = pos + WORD;
            check_element_count(elem, len, data, start)?;
            let items = decode_sequence(std::iter::repeat(elem.as_ref()).take(len), data, start)?;
            Ok(AbiValue::Array((**elem).clone(), items))
        }
        AbiType::FixedArray(elem, len) => {
            check_element_count(elem, *len, data, pos)?;
            let items = decode_sequence(std::iter::repeat(elem.as_ref()).take(*len), data, pos)?;
            Ok(AbiValue::FixedArray((**elem).clone(), items))
        }
        AbiType::Tuple(fields) => Ok(AbiValue::Tuple(decode_sequence(fields.iter(), data, pos)?)),
    }
}

// Every element needs at least its head, so the count is bounded by the data
fn check_element_count(elem: &AbiType, len: usize, data: &[u8], start: usize) -> Result<()> {
    let end = elem
        .head_size()
        .and_then(|size| len.checked_mul(size.max(1)))
        .and_then(|n| n.checked_add(start));
    match end {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(Error::decode(format!(
            "{} elements of {} at byte {} exceed {} bytes of data",
            len,
            elem,
            start,
            data.len()
        ))),
    }
}

fn read_word(data: &[u8], pos: usize) -> Result<&[u8]> {
    pos.checked_add(WORD)
        .filter(|end| *end <= data.len())
        .map(|end| &data[pos..end])
        .ok_or_else(|| {
            Error::decode(format!(
                "attempted to read word at byte {} past the end of {} bytes",
                pos,
                data.len()
            ))
        })
}

fn read_usize(data: &[u8], pos: usize) -> Result<usize> {
    let value = U256::from_big_endian(read_word(data, pos)?);
    if value > U256::from(usize::MAX) {
        return Err(Error::decode(format!("length or offset {} at byte {} is too large", value, pos)));
    }
    Ok(value.as_usize())
}

fn read_packed_bytes(data: &[u8], pos: usize) -> Result<&[u8]> {
    let len = read_usize(data, pos)?;
    let start = pos + WORD;
    start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .map(|end| &data[start..end])
        .ok_or_else(|| {
            Error::decode(format!(
                "byte string of length {} at byte {} exceeds {} bytes of data",
                len,
                pos,
                data.len()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[&str]) -> Vec<AbiType> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn word(hex_str: &str) -> Vec<u8> {
        let mut out = vec![0u8; WORD];
        let bytes = hex::decode(hex_str).unwrap();
        out[WORD - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    #[test]
    fn test_encode_static_and_dynamic_mix() {
        // f(uint256,uint32[],bytes10,bytes) with (0x123, [0x456, 0x789], "1234567890", "Hello, world!")
        let values = vec![
            AbiValue::uint256(0x123u64),
            AbiValue::Array(AbiType::Uint(32), vec![AbiValue::Uint(U256::from(0x456u64), 32), AbiValue::Uint(U256::from(0x789u64), 32)]),
            AbiValue::FixedBytes(b"1234567890".to_vec()),
            AbiValue::Bytes(b"Hello, world!".to_vec()),
        ];
        let encoded = encode(&values).unwrap();
        let expected = concat!(
            "0000000000000000000000000000000000000000000000000000000000000123",
            "0000000000000000000000000000000000000000000000000000000000000080",
            "3132333435363738393000000000000000000000000000000000000000000000",
            "00000000000000000000000000000000000000000000000000000000000000e0",
            "0000000000000000000000000000000000000000000000000000000000000002",
            "0000000000000000000000000000000000000000000000000000000000000456",
            "0000000000000000000000000000000000000000000000000000000000000789",
            "000000000000000000000000000000000000000000000000000000000000000d",
            "48656c6c6f2c20776f726c642100000000000000000000000000000000000000",
        );
        assert_eq!(hex::encode(&encoded), expected);

        let decoded = decode(&types(&["uint256", "uint32[]", "bytes10", "bytes"]), &encoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_negative_int_is_sign_extended() {
        let encoded = encode_single(&AbiValue::Int(I256::from(-1), 8)).unwrap();
        assert_eq!(encoded, vec![0xff; WORD]);
        assert_eq!(decode_single(&AbiType::Int(8), &encoded).unwrap(), AbiValue::Int(I256::from(-1), 8));

        let int8_min = encode_single(&AbiValue::Int(I256::from(-128), 8)).unwrap();
        assert_eq!(decode_single(&AbiType::Int(8), &int8_min).unwrap(), AbiValue::Int(I256::from(-128), 8));
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(matches!(encode_single(&AbiValue::Uint(U256::from(256), 8)), Err(Error::Encode(_))));
        assert!(matches!(encode_single(&AbiValue::Int(I256::from(128), 8)), Err(Error::Encode(_))));
        assert!(matches!(encode_single(&AbiValue::Int(I256::from(-129), 8)), Err(Error::Encode(_))));
        assert!(matches!(encode_single(&AbiValue::FixedBytes(vec![0; 33])), Err(Error::Encode(_))));
        assert!(matches!(
            encode_single(&AbiValue::Array(AbiType::Bool, vec![AbiValue::uint256(1u64)])),
            Err(Error::Encode(_))
        ));
    }

    #[test]
    fn test_encode_params_checks_declared_types() {
        let declared = types(&["address", "uint256"]);
        let ok = vec![AbiValue::Address(Address::zero()), AbiValue::uint256(1u64)];
        assert!(encode_params(&declared, &ok).is_ok());

        let wrong = vec![AbiValue::Address(Address::zero()), AbiValue::Uint(U256::one(), 128)];
        assert!(matches!(encode_params(&declared, &wrong), Err(Error::Encode(_))));
        assert!(matches!(encode_params(&declared, &ok[..1]), Err(Error::Encode(_))));
    }

    #[test]
    fn test_decode_rejects_values_wider_than_type() {
        assert!(matches!(decode_single(&AbiType::Uint(8), &word("0100")), Err(Error::Decode(_))));
        // 0xff is 255, not a sign extended int8
        assert!(matches!(decode_single(&AbiType::Int(8), &word("ff")), Err(Error::Decode(_))));
        assert!(matches!(decode_single(&AbiType::Bool, &word("02")), Err(Error::Decode(_))));

        let mut address = word("aa");
        address[0] = 1;
        assert!(matches!(decode_single(&AbiType::Address, &address), Err(Error::Decode(_))));

        let mut fixed = vec![0u8; WORD];
        fixed[0] = 0xab;
        fixed[31] = 1;
        assert!(matches!(decode_single(&AbiType::FixedBytes(4), &fixed), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_malformed_offsets_and_lengths() {
        // Short buffer
        assert!(matches!(decode_single(&AbiType::Uint(256), &[0u8; 31]), Err(Error::Decode(_))));

        // Offset past the end
        assert!(matches!(decode_single(&AbiType::String, &word("40")), Err(Error::Decode(_))));

        // Length past the end
        let mut data = word("20");
        data.extend(word("ff"));
        assert!(matches!(decode_single(&AbiType::Bytes, &data), Err(Error::Decode(_))));

        // Huge length that does not fit in usize
        let mut data = word("20");
        data.extend(vec![0xff; WORD]);
        assert!(matches!(decode_single(&AbiType::Bytes, &data), Err(Error::Decode(_))));

        // Element count implying a read past the end
        let mut data = word("20");
        data.extend(word("0100"));
        assert!(matches!(
            decode_single(&"uint256[]".parse().unwrap(), &data),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut data = word("20");
        data.extend(word("02"));
        let mut payload = vec![0xc3, 0x28];
        payload.resize(WORD, 0);
        data.extend(payload);
        assert!(matches!(decode_single(&AbiType::String, &data), Err(Error::Decode(_))));
    }

    #[test]
    fn test_empty_dynamic_values() {
        let values = vec![AbiValue::String(String::new()), AbiValue::Array(AbiType::Address, vec![])];
        let encoded = encode(&values).unwrap();
        assert_eq!(encoded.len(), 4 * WORD);
        assert_eq!(decode(&types(&["string", "address[]"]), &encoded).unwrap(), values);
    }

    #[test]
    fn test_nested_dynamic_tuple() {
        let ty: AbiType = "(string,(uint8,bytes)[])".parse().unwrap();
        let value = AbiValue::Tuple(vec![
            AbiValue::String("nested".to_string()),
            AbiValue::Array(
                "(uint8,bytes)".parse().unwrap(),
                vec![
                    AbiValue::Tuple(vec![AbiValue::Uint(U256::one(), 8), AbiValue::Bytes(vec![1, 2, 3])]),
                    AbiValue::Tuple(vec![AbiValue::Uint(U256::from(2u64), 8), AbiValue::Bytes(vec![])]),
                ],
            ),
        ]);
        let encoded = encode_single(&value).unwrap();
        // Dynamic tuple sits behind an offset to the first tail word
        assert_eq!(&encoded[..WORD], word("20").as_slice());
        assert_eq!(decode_single(&ty, &encoded).unwrap(), value);
    }

    #[test]
    fn test_decode_rejects_oversized_fixed_arrays() {
        // Head of one element overflows usize
        let huge: AbiType = "uint256[576460752303423488][]".parse().unwrap();
        let mut data = word("20");
        data.extend(word("01"));
        assert!(matches!(decode_single(&huge, &data), Err(Error::Decode(_))));

        let static_huge: AbiType = "uint256[576460752303423488]".parse().unwrap();
        assert!(matches!(decode_single(&static_huge, &data), Err(Error::Decode(_))));

        // Fits in usize but not in the data
        let long: AbiType = "bool[1000000]".parse().unwrap();
        assert!(matches!(decode(&[long, AbiType::Bool], &data), Err(Error::Decode(_))));
    }
}
