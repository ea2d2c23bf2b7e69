//! Deployment orchestration

use std::sync::Arc;

use ethers::types::{Bytes, U256};
use tracing::info;

use bindery_core::{Error, Result};

use crate::abi::AbiValue;
use crate::binding::ContractBinding;
use crate::contract::ContractAbi;
use crate::dispatcher::Dispatcher;
use crate::handle::CallHandle;

/// Deploys contracts of one ABI and bytecode.
#[derive(Debug, Clone)]
pub struct Deployer {
    dispatcher: Dispatcher,
    abi: Arc<ContractAbi>,
    bytecode: Bytes,
    value: U256,
}

impl Deployer {
    /// `dispatcher` must carry a signer.
    pub fn new(dispatcher: Dispatcher, abi: Arc<ContractAbi>, bytecode: Bytes) -> Self {
        Self {
            dispatcher,
            abi,
            bytecode,
            value: U256::zero(),
        }
    }

    /// Native value sent with the creation; the constructor must be payable.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Creation data: bytecode followed by the encoded constructor arguments.
    pub fn creation_data(&self, args: &[AbiValue]) -> Result<Vec<u8>> {
        if self.bytecode.is_empty() {
            return Err(Error::encode("cannot deploy empty bytecode"));
        }
        let constructor = self.abi.constructor().cloned().unwrap_or_default();
        if !self.value.is_zero() && !constructor.is_payable() {
            return Err(Error::encode(format!(
                "constructor is not payable but {} wei was attached",
                self.value
            )));
        }
        constructor.encode_deploy(&self.bytecode, args)
    }

    /// Submit the creation transaction; resolves to a binding at the new address.
    ///
    /// Arguments are encoded here, before any network I/O. Dispatcher errors
    /// pass through unchanged; a receipt without a contract address is a
    /// transport error.
    pub fn deploy(&self, args: &[AbiValue]) -> Result<CallHandle<ContractBinding>> {
        let data = self.creation_data(args)?;
        let receipt = self.dispatcher.create(data, self.value)?;

        let abi = self.abi.clone();
        let dispatcher = self.dispatcher.clone();

        Ok(receipt.map(move |receipt| {
            let address = receipt.contract_address.ok_or_else(|| {
                Error::transport(format!(
                    "receipt for {:?} carries no contract address",
                    receipt.transaction_hash
                ))
            })?;
            info!(address = ?address, tx = ?receipt.transaction_hash, "Contract deployed");
            Ok(ContractBinding::with_dispatcher(address, abi.clone(), dispatcher.clone()))
        }))
    }
}
