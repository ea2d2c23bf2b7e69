//! Remote call dispatch
//!
//! Read-only functions are simulated with `eth_call` and their return data
//! decoded; state-mutating functions are signed, submitted and awaited until
//! mined. Both produce lazy [`CallHandle`]s. Arguments are encoded when the
//! handle is built, so encoding errors surface before any network I/O.

use std::sync::Arc;

use ethers::types::{Address, BlockNumber, Bytes, TransactionReceipt, U256, U64};
use tracing::{debug, info, warn};

use bindery_core::{Error, Result};

use crate::abi::AbiValue;
use crate::fees::{FeePolicy, Fees};
use crate::function::{FunctionDescriptor, Mutability};
use crate::handle::CallHandle;
use crate::revert::{decode_revert_reason, ErrorDescriptor};
use crate::transport::{CallRequest, Signer, TransactionSubmission, Transport, TransportError};

/// Label used for fee lookup and logging of contract creations
pub const CONSTRUCTOR: &str = "constructor";

/// Result of [`Dispatcher::dispatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Decoded return values of a read-only call
    Returned(Vec<AbiValue>),
    /// Receipt of a mined transaction
    Mined(TransactionReceipt),
}

/// Routes calls to the transport.
///
/// Cloning is cheap; clones share the transport, fee policy and signer.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    fee_policy: Arc<dyn FeePolicy>,
    signer: Option<Arc<dyn Signer>>,
    caller: Option<Address>,
    block: BlockNumber,
    errors: Arc<[ErrorDescriptor]>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, fee_policy: Arc<dyn FeePolicy>) -> Self {
        Self {
            transport,
            fee_policy,
            signer: None,
            caller: None,
            block: BlockNumber::Latest,
            errors: Arc::from(Vec::new()),
        }
    }

    /// Signer handed to the transport for state-mutating calls
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// `from` address for read-only calls
    pub fn with_caller(mut self, caller: Address) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Default block for read-only calls
    pub fn with_block(mut self, block: BlockNumber) -> Self {
        self.block = block;
        self
    }

    /// Custom errors consulted when decoding revert data
    pub fn with_errors(mut self, errors: &[ErrorDescriptor]) -> Self {
        self.errors = Arc::from(errors);
        self
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn signer(&self) -> Option<&Arc<dyn Signer>> {
        self.signer.as_ref()
    }

    pub fn caller(&self) -> Option<Address> {
        self.caller
    }

    pub fn block(&self) -> BlockNumber {
        self.block
    }

    /// Read-only call against the default block
    pub fn read(
        &self,
        function: &Arc<FunctionDescriptor>,
        to: Address,
        args: &[AbiValue],
    ) -> Result<CallHandle<Vec<AbiValue>>> {
        self.read_at(function, to, args, self.block)
    }

    /// Read-only call against a specific block
    pub fn read_at(
        &self,
        function: &Arc<FunctionDescriptor>,
        to: Address,
        args: &[AbiValue],
        block: BlockNumber,
    ) -> Result<CallHandle<Vec<AbiValue>>> {
        let request = CallRequest {
            from: self.caller,
            to,
            data: Bytes::from(function.encode_call(args)?),
        };
        debug!(function = function.signature(), to = ?to, calldata = %request.data, "Prepared call");

        let transport = self.transport.clone();
        let errors = self.errors.clone();
        let function = function.clone();

        Ok(CallHandle::new(function.signature().to_string(), move || {
            let transport = transport.clone();
            let errors = errors.clone();
            let function = function.clone();
            let request = request.clone();
            async move {
                let output = transport
                    .call(&request, block)
                    .await
                    .map_err(|e| map_transport_error(e, &errors))?;

                if output.is_empty() && !function.outputs().is_empty() {
                    return Err(Error::decode(format!(
                        "{} returned no data; is there a contract at {:?}?",
                        function.signature(),
                        request.to
                    )));
                }

                debug!(function = function.signature(), bytes = output.len(), "Decoding return data");
                function.decode_output(&output)
            }
        }))
    }

    /// State-mutating call without native value
    pub fn write(
        &self,
        function: &Arc<FunctionDescriptor>,
        to: Address,
        args: &[AbiValue],
    ) -> Result<CallHandle<TransactionReceipt>> {
        self.write_with_value(function, to, args, U256::zero())
    }

    /// State-mutating call carrying `value` wei; only payable functions accept value.
    pub fn write_with_value(
        &self,
        function: &Arc<FunctionDescriptor>,
        to: Address,
        args: &[AbiValue],
        value: U256,
    ) -> Result<CallHandle<TransactionReceipt>> {
        if !value.is_zero() && function.mutability() != Mutability::Payable {
            return Err(Error::encode(format!(
                "{} is not payable but {} wei was attached",
                function.signature(),
                value
            )));
        }

        let data = function.encode_call(args)?;
        let signer = self.require_signer(function.signature())?;
        let fees = self.fee_policy.fees_for(function.signature());

        Ok(self.submit(function.signature(), Some(to), data, value, fees, signer))
    }

    /// Route by mutability: read functions are simulated, everything else is submitted.
    pub fn dispatch(
        &self,
        function: &Arc<FunctionDescriptor>,
        to: Address,
        args: &[AbiValue],
    ) -> Result<CallHandle<CallOutcome>> {
        if function.mutability().is_read() {
            Ok(self.read(function, to, args)?.map(|values| Ok(CallOutcome::Returned(values))))
        } else {
            Ok(self.write(function, to, args)?.map(|receipt| Ok(CallOutcome::Mined(receipt))))
        }
    }

    /// Submit creation code (no recipient).
    pub fn create(&self, data: Vec<u8>, value: U256) -> Result<CallHandle<TransactionReceipt>> {
        let signer = self.require_signer(CONSTRUCTOR)?;
        let fees = self.fee_policy.fees_for(CONSTRUCTOR);
        Ok(self.submit(CONSTRUCTOR, None, data, value, fees, signer))
    }

    fn require_signer(&self, function: &str) -> Result<Arc<dyn Signer>> {
        self.signer
            .clone()
            .ok_or_else(|| Error::MissingSigner(function.to_string()))
    }

    fn submit(
        &self,
        label: &str,
        to: Option<Address>,
        data: Vec<u8>,
        value: U256,
        fees: Fees,
        signer: Arc<dyn Signer>,
    ) -> CallHandle<TransactionReceipt> {
        let submission = TransactionSubmission {
            to,
            data: Bytes::from(data),
            value,
        };
        debug!(function = label, to = ?to, calldata = %submission.data, fees = ?fees, "Prepared transaction");

        let transport = self.transport.clone();
        let errors = self.errors.clone();
        let label: Arc<str> = Arc::from(label);

        CallHandle::new(label.clone(), move || {
            let transport = transport.clone();
            let errors = errors.clone();
            let signer = signer.clone();
            let submission = submission.clone();
            let label = label.clone();
            async move {
                info!(function = %label, to = ?submission.to, value = %submission.value, "Submitting transaction");

                let receipt = transport
                    .send_transaction(&submission, &fees, signer)
                    .await
                    .map_err(|e| map_transport_error(e, &errors))?;

                if receipt.status == Some(U64::zero()) {
                    warn!(function = %label, tx = ?receipt.transaction_hash, "Transaction reverted");
                    return Err(Error::reverted(format!(
                        "transaction {:?} reverted",
                        receipt.transaction_hash
                    )));
                }

                info!(
                    function = %label,
                    tx = ?receipt.transaction_hash,
                    block = ?receipt.block_number,
                    gas_used = ?receipt.gas_used,
                    "Transaction mined"
                );
                Ok(receipt)
            }
        })
    }
}

/// Map a transport failure onto the error taxonomy, decoding revert data.
pub(crate) fn map_transport_error(err: TransportError, errors: &[ErrorDescriptor]) -> Error {
    match err {
        TransportError::Revert { data, message } if data.is_empty() => {
            Error::Reverted(message.unwrap_or_else(|| decode_revert_reason(&[], errors)))
        }
        TransportError::Revert { data, .. } => Error::Reverted(decode_revert_reason(&data, errors)),
        TransportError::Rpc(msg) => Error::transport(msg),
    }
}
