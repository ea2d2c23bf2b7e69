// Shared fixtures for binding integration tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, Filter, Log, Signature, TransactionReceipt, H256, U64};
use mockall::mock;

use bindery_ethereum::abi::{self, AbiValue};
use bindery_ethereum::{CallRequest, Fees, Signer, TransactionSubmission, Transport, TransportError};

mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        async fn call(&self, request: &CallRequest, block: BlockNumber) -> Result<Bytes, TransportError>;
        async fn send_transaction(
            &self,
            submission: &TransactionSubmission,
            fees: &Fees,
            signer: Arc<dyn Signer>,
        ) -> Result<TransactionReceipt, TransportError>;
        async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, TransportError>;
    }
}

// Transport requires Debug; mockall 0.11 mocks do not derive it
impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport").finish()
    }
}

// Signer that is only ever passed through to the mocked transport
#[derive(Debug)]
pub struct TestSigner(pub Address);

#[async_trait]
impl Signer for TestSigner {
    fn address(&self) -> Address {
        self.0
    }

    async fn sign_transaction(&self, _tx: &TypedTransaction) -> Result<Signature, TransportError> {
        Err(TransportError::rpc("test signer does not sign"))
    }
}

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn address_topic(address: Address) -> H256 {
    H256::from(address)
}

pub fn mined_receipt() -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: H256::repeat_byte(0xaa),
        block_number: Some(U64::from(100u64)),
        status: Some(U64::one()),
        ..Default::default()
    }
}

// Revert data for Error(string)
pub fn error_string(reason: &str) -> Bytes {
    let mut data = abi::selector("Error(string)").to_vec();
    data.extend(abi::encode(&[AbiValue::from(reason)]).unwrap());
    Bytes::from(data)
}

pub const ERC20_ABI: &str = r#"[
    {"inputs":[{"internalType":"address","name":"owner","type":"address"}],"stateMutability":"nonpayable","type":"constructor"},
    {"anonymous":false,"inputs":[{"indexed":true,"internalType":"address","name":"owner","type":"address"},{"indexed":true,"internalType":"address","name":"spender","type":"address"},{"indexed":false,"internalType":"uint256","name":"value","type":"uint256"}],"name":"Approval","type":"event"},
    {"anonymous":false,"inputs":[{"indexed":true,"internalType":"address","name":"from","type":"address"},{"indexed":true,"internalType":"address","name":"to","type":"address"},{"indexed":false,"internalType":"uint256","name":"value","type":"uint256"}],"name":"Transfer","type":"event"},
    {"inputs":[{"internalType":"address","name":"sender","type":"address"},{"internalType":"uint256","name":"balance","type":"uint256"},{"internalType":"uint256","name":"needed","type":"uint256"}],"name":"ERC20InsufficientBalance","type":"error"},
    {"inputs":[{"internalType":"address","name":"owner","type":"address"},{"internalType":"address","name":"spender","type":"address"}],"name":"allowance","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
    {"inputs":[{"internalType":"address","name":"spender","type":"address"},{"internalType":"uint256","name":"amount","type":"uint256"}],"name":"approve","outputs":[{"internalType":"bool","name":"","type":"bool"}],"stateMutability":"nonpayable","type":"function"},
    {"inputs":[{"internalType":"address","name":"account","type":"address"}],"name":"balanceOf","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
    {"inputs":[],"name":"decimals","outputs":[{"internalType":"uint8","name":"","type":"uint8"}],"stateMutability":"view","type":"function"},
    {"inputs":[],"name":"name","outputs":[{"internalType":"string","name":"","type":"string"}],"stateMutability":"view","type":"function"},
    {"inputs":[],"name":"symbol","outputs":[{"internalType":"string","name":"","type":"string"}],"stateMutability":"view","type":"function"},
    {"inputs":[],"name":"totalSupply","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
    {"inputs":[{"internalType":"address","name":"to","type":"address"},{"internalType":"uint256","name":"amount","type":"uint256"}],"name":"transfer","outputs":[{"internalType":"bool","name":"","type":"bool"}],"stateMutability":"nonpayable","type":"function"},
    {"inputs":[{"internalType":"address","name":"from","type":"address"},{"internalType":"address","name":"to","type":"address"},{"internalType":"uint256","name":"amount","type":"uint256"}],"name":"transferFrom","outputs":[{"internalType":"bool","name":"","type":"bool"}],"stateMutability":"nonpayable","type":"function"},
    {"stateMutability":"payable","type":"receive"}
]"#;
