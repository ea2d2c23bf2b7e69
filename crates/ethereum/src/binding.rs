//! Generic contract binding

use std::sync::Arc;

use ethers::types::{Address, BlockNumber, Bytes, Log, TransactionReceipt, U256};
use tracing::debug;

use bindery_core::{Error, Result};

use crate::abi::AbiValue;
use crate::contract::ContractAbi;
use crate::deploy::Deployer;
use crate::dispatcher::{map_transport_error, CallOutcome, Dispatcher};
use crate::event::DecodedEvent;
use crate::fees::FeePolicy;
use crate::handle::CallHandle;
use crate::transport::{Signer, Transport};

/// One deployed contract: its address, its descriptors and the dispatcher
/// that carries calls to it.
///
/// A binding is immutable; the `with_*` builders return a new binding.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    address: Address,
    abi: Arc<ContractAbi>,
    dispatcher: Dispatcher,
}

impl ContractBinding {
    /// Bind an already deployed contract. No network I/O.
    pub fn load(
        address: Address,
        abi: Arc<ContractAbi>,
        transport: Arc<dyn Transport>,
        fee_policy: Arc<dyn FeePolicy>,
    ) -> Self {
        Self::with_dispatcher(address, abi, Dispatcher::new(transport, fee_policy))
    }

    /// Bind using an existing dispatcher (shared transport, signer and fee policy).
    pub fn with_dispatcher(address: Address, abi: Arc<ContractAbi>, dispatcher: Dispatcher) -> Self {
        let dispatcher = dispatcher.with_errors(abi.errors());
        Self {
            address,
            abi,
            dispatcher,
        }
    }

    /// Deploy `bytecode` with constructor `args`; resolves to a binding at the new address.
    pub fn deploy(
        transport: Arc<dyn Transport>,
        fee_policy: Arc<dyn FeePolicy>,
        signer: Arc<dyn Signer>,
        abi: Arc<ContractAbi>,
        bytecode: Bytes,
        args: &[AbiValue],
    ) -> Result<CallHandle<ContractBinding>> {
        let dispatcher = Dispatcher::new(transport, fee_policy).with_signer(signer);
        Deployer::new(dispatcher, abi, bytecode).deploy(args)
    }

    pub fn with_signer(self, signer: Arc<dyn Signer>) -> Self {
        Self {
            dispatcher: self.dispatcher.with_signer(signer),
            ..self
        }
    }

    pub fn with_caller(self, caller: Address) -> Self {
        Self {
            dispatcher: self.dispatcher.with_caller(caller),
            ..self
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &Arc<ContractAbi> {
        &self.abi
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Read-only call by function name or signature
    pub fn call(&self, function: &str, args: &[AbiValue]) -> Result<CallHandle<Vec<AbiValue>>> {
        self.dispatcher.read(self.abi.function(function)?, self.address, args)
    }

    /// Read-only call against a specific block
    pub fn call_at(&self, function: &str, args: &[AbiValue], block: BlockNumber) -> Result<CallHandle<Vec<AbiValue>>> {
        self.dispatcher
            .read_at(self.abi.function(function)?, self.address, args, block)
    }

    /// State-mutating call
    pub fn send(&self, function: &str, args: &[AbiValue]) -> Result<CallHandle<TransactionReceipt>> {
        self.dispatcher.write(self.abi.function(function)?, self.address, args)
    }

    /// State-mutating call with native value
    pub fn send_with_value(
        &self,
        function: &str,
        args: &[AbiValue],
        value: U256,
    ) -> Result<CallHandle<TransactionReceipt>> {
        self.dispatcher
            .write_with_value(self.abi.function(function)?, self.address, args, value)
    }

    /// Call or send depending on the function's mutability
    pub fn dispatch(&self, function: &str, args: &[AbiValue]) -> Result<CallHandle<CallOutcome>> {
        self.dispatcher.dispatch(self.abi.function(function)?, self.address, args)
    }

    pub fn decode_log(&self, log: &Log) -> Result<DecodedEvent> {
        self.abi.decode_log(log)
    }

    /// Events this contract emitted in `receipt`
    pub fn decode_receipt(&self, receipt: &TransactionReceipt) -> Result<Vec<DecodedEvent>> {
        self.abi.decode_receipt(receipt, Some(self.address))
    }

    /// Fetch and decode past occurrences of `event`, optionally constrained on
    /// indexed arguments (`None` matches anything).
    pub fn events(
        &self,
        event: &str,
        indexed: &[Option<AbiValue>],
        from_block: Option<BlockNumber>,
        to_block: Option<BlockNumber>,
    ) -> Result<CallHandle<Vec<DecodedEvent>>> {
        let event = self.abi.event(event)?.clone();
        let mut filter = event.filter(self.address, indexed)?;
        if let Some(from) = from_block {
            filter = filter.from_block(from);
        }
        if let Some(to) = to_block {
            filter = filter.to_block(to);
        }
        debug!(event = event.signature(), address = ?self.address, "Prepared log query");

        let transport = self.dispatcher.transport().clone();
        let abi = self.abi.clone();

        Ok(CallHandle::new(event.signature().to_string(), move || {
            let transport = transport.clone();
            let abi = abi.clone();
            let event = event.clone();
            let filter = filter.clone();
            async move {
                let logs = transport
                    .get_logs(&filter)
                    .await
                    .map_err(|e| map_transport_error(e, abi.errors()))?;
                debug!(event = event.signature(), count = logs.len(), "Fetched logs");
                logs.iter()
                    .map(|log| event.decode(log))
                    .collect::<Result<Vec<_>>>()
            }
        }))
    }

    /// Human-readable reason for raw revert data
    pub fn revert_reason(&self, data: &[u8]) -> String {
        self.abi.revert_reason(data)
    }

    /// Decode call data sent to this contract, picking the function by selector
    pub fn decode_calldata(&self, calldata: &[u8]) -> Result<(String, Vec<AbiValue>)> {
        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| Error::decode("call data shorter than a selector"))?;
        let function = self.abi.function_by_selector(selector).ok_or_else(|| {
            Error::descriptor(format!("no function with selector 0x{}", hex::encode(selector)))
        })?;
        Ok((function.signature().to_string(), function.decode_input(calldata)?))
    }
}
