//! ABI codec
//!
//! Type model, typed values, head/tail encoding and the loaders that build
//! descriptors from JSON ABI files and human-readable signatures.

pub mod codec;
pub mod parser;
pub mod types;
pub mod value;

use ethers::types::H256;
use sha3::{Digest, Keccak256};

pub use codec::{decode, decode_single, encode, encode_params, encode_single};
pub use parser::AbiParser;
pub use types::{AbiType, WORD};
pub use value::AbiValue;

/// Keccak-256 hash of `data`
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// First four bytes of the Keccak-256 hash of a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Full Keccak-256 hash of a canonical event signature
pub fn topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

/// Canonical signature `name(type1,type2,...)`
pub fn signature<'a>(name: &str, types: impl IntoIterator<Item = &'a AbiType>) -> String {
    let types: Vec<String> = types.into_iter().map(AbiType::canonical).collect();
    format!("{}({})", name, types.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(hex::encode(selector("Error(string)")), "08c379a0");
        assert_eq!(hex::encode(selector("Panic(uint256)")), "4e487b71");
    }

    #[test]
    fn test_transfer_topic() {
        assert_eq!(
            format!("{:?}", topic("Transfer(address,address,uint256)")),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_signature_uses_canonical_types() {
        let types: Vec<AbiType> = vec!["uint".parse().unwrap(), "(address,bytes32)[]".parse().unwrap()];
        assert_eq!(signature("settle", &types), "settle(uint256,(address,bytes32)[])");
    }
}
