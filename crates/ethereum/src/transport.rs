//! Collaborator interfaces consumed by the dispatcher

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, Filter, Log, Signature, TransactionReceipt, U256};

use crate::fees::Fees;

/// Failure reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The node reported that execution reverted, with whatever revert data it returned
    #[error("execution reverted{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Revert { data: Bytes, message: Option<String> },

    /// Connection, timeout or JSON-RPC failure
    #[error("{0}")]
    Rpc(String),
}

impl TransportError {
    pub fn rpc<S: Into<String>>(msg: S) -> Self {
        TransportError::Rpc(msg.into())
    }
}

/// A read-only call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

/// A transaction to sign and submit. `to` is `None` for contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSubmission {
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
}

/// Network access used by the dispatcher.
///
/// Confirmation policy, timeouts and connection handling belong to the
/// implementation; the dispatcher never retries.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Simulate a call against `block` and return the raw return data
    async fn call(&self, request: &CallRequest, block: BlockNumber) -> Result<Bytes, TransportError>;

    /// Sign with `signer`, broadcast and wait until the transaction is mined
    async fn send_transaction(
        &self,
        submission: &TransactionSubmission,
        fees: &Fees,
        signer: Arc<dyn Signer>,
    ) -> Result<TransactionReceipt, TransportError>;

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, TransportError>;
}

/// Signing capability, passed through to the transport untouched
#[async_trait]
pub trait Signer: Send + Sync + Debug {
    fn address(&self) -> Address;

    async fn sign_transaction(&self, tx: &TypedTransaction) -> Result<Signature, TransportError>;
}
