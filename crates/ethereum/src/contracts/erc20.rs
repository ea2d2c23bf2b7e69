//! Typed ERC-20 wrapper over the generic binding

use std::sync::Arc;

use ethers::types::{Address, BlockNumber, Log, TransactionReceipt, U256};

use bindery_core::{Error, Result};

use crate::abi::{AbiType, AbiValue};
use crate::binding::ContractBinding;
use crate::contract::ContractAbi;
use crate::event::{DecodedEvent, EventDescriptor, EventParam};
use crate::fees::FeePolicy;
use crate::function::{FunctionDescriptor, Mutability, Param};
use crate::handle::CallHandle;
use crate::transport::{Signer, Transport};

/// Descriptors of the ERC-20 interface
pub fn erc20_abi() -> Result<ContractAbi> {
    use AbiType::{Address as Addr, Bool, String as Str, Uint};

    let view = |name: &str, inputs: Vec<Param>, output: AbiType| {
        FunctionDescriptor::new(name, inputs, vec![Param::unnamed(output)], Mutability::Read)
    };
    let write = |name: &str, inputs: Vec<Param>| {
        FunctionDescriptor::new(name, inputs, vec![Param::unnamed(Bool)], Mutability::Write)
    };

    let mut abi = ContractAbi::new();
    abi.add_function(view("name", vec![], Str)?);
    abi.add_function(view("symbol", vec![], Str)?);
    abi.add_function(view("decimals", vec![], Uint(8))?);
    abi.add_function(view("totalSupply", vec![], Uint(256))?);
    abi.add_function(view("balanceOf", vec![Param::new("account", Addr)], Uint(256))?);
    abi.add_function(view(
        "allowance",
        vec![Param::new("owner", Addr), Param::new("spender", Addr)],
        Uint(256),
    )?);
    abi.add_function(write("transfer", vec![Param::new("to", Addr), Param::new("amount", Uint(256))])?);
    abi.add_function(write("approve", vec![Param::new("spender", Addr), Param::new("amount", Uint(256))])?);
    abi.add_function(write(
        "transferFrom",
        vec![
            Param::new("from", Addr),
            Param::new("to", Addr),
            Param::new("amount", Uint(256)),
        ],
    )?);

    abi.add_event(EventDescriptor::new(
        "Transfer",
        vec![
            EventParam::new("from", Addr, true),
            EventParam::new("to", Addr, true),
            EventParam::new("value", Uint(256), false),
        ],
        false,
    )?);
    abi.add_event(EventDescriptor::new(
        "Approval",
        vec![
            EventParam::new("owner", Addr, true),
            EventParam::new("spender", Addr, true),
            EventParam::new("value", Uint(256), false),
        ],
        false,
    )?);

    Ok(abi)
}

/// A `Transfer` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// An `Approval` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
}

/// ERC-20 token binding
#[derive(Debug, Clone)]
pub struct Erc20 {
    binding: ContractBinding,
}

impl Erc20 {
    pub fn load(address: Address, transport: Arc<dyn Transport>, fee_policy: Arc<dyn FeePolicy>) -> Result<Self> {
        let abi = Arc::new(erc20_abi()?);
        Ok(Self {
            binding: ContractBinding::load(address, abi, transport, fee_policy),
        })
    }

    pub fn from_binding(binding: ContractBinding) -> Self {
        Self { binding }
    }

    pub fn with_signer(self, signer: Arc<dyn Signer>) -> Self {
        Self {
            binding: self.binding.with_signer(signer),
        }
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    pub fn address(&self) -> Address {
        self.binding.address()
    }

    pub fn name(&self) -> Result<CallHandle<String>> {
        Ok(self.binding.call("name", &[])?.map(|v| single(v, |v| v.as_str().map(str::to_string))))
    }

    pub fn symbol(&self) -> Result<CallHandle<String>> {
        Ok(self.binding.call("symbol", &[])?.map(|v| single(v, |v| v.as_str().map(str::to_string))))
    }

    pub fn decimals(&self) -> Result<CallHandle<u8>> {
        Ok(self
            .binding
            .call("decimals", &[])?
            .map(|v| single(v, |v| v.as_uint().map(|d| d.low_u32() as u8))))
    }

    pub fn total_supply(&self) -> Result<CallHandle<U256>> {
        Ok(self.binding.call("totalSupply", &[])?.map(|v| single(v, AbiValue::as_uint)))
    }

    pub fn balance_of(&self, account: Address) -> Result<CallHandle<U256>> {
        Ok(self
            .binding
            .call("balanceOf", &[account.into()])?
            .map(|v| single(v, AbiValue::as_uint)))
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Result<CallHandle<U256>> {
        Ok(self
            .binding
            .call("allowance", &[owner.into(), spender.into()])?
            .map(|v| single(v, AbiValue::as_uint)))
    }

    pub fn transfer(&self, to: Address, amount: U256) -> Result<CallHandle<TransactionReceipt>> {
        self.binding.send("transfer", &[to.into(), amount.into()])
    }

    pub fn approve(&self, spender: Address, amount: U256) -> Result<CallHandle<TransactionReceipt>> {
        self.binding.send("approve", &[spender.into(), amount.into()])
    }

    pub fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<CallHandle<TransactionReceipt>> {
        self.binding
            .send("transferFrom", &[from.into(), to.into(), amount.into()])
    }

    pub fn decode_transfer(&self, log: &Log) -> Result<Transfer> {
        let event = self.binding.abi().event("Transfer")?.decode(log)?;
        to_transfer(&event)
    }

    pub fn decode_approval(&self, log: &Log) -> Result<Approval> {
        let event = self.binding.abi().event("Approval")?.decode(log)?;
        Ok(Approval {
            owner: address_arg(&event, "owner")?,
            spender: address_arg(&event, "spender")?,
            value: uint_arg(&event, "value")?,
        })
    }

    /// Past transfers, optionally filtered by sender and recipient
    pub fn transfers(
        &self,
        from: Option<Address>,
        to: Option<Address>,
        from_block: Option<BlockNumber>,
        to_block: Option<BlockNumber>,
    ) -> Result<CallHandle<Vec<Transfer>>> {
        let indexed = [from.map(AbiValue::from), to.map(AbiValue::from)];
        Ok(self
            .binding
            .events("Transfer", &indexed, from_block, to_block)?
            .map(|events| events.iter().map(to_transfer).collect()))
    }
}

fn single<T>(values: Vec<AbiValue>, extract: impl Fn(&AbiValue) -> Option<T>) -> Result<T> {
    values
        .first()
        .and_then(extract)
        .ok_or_else(|| Error::decode(format!("unexpected return values {:?}", values)))
}

fn to_transfer(event: &DecodedEvent) -> Result<Transfer> {
    Ok(Transfer {
        from: address_arg(event, "from")?,
        to: address_arg(event, "to")?,
        value: uint_arg(event, "value")?,
    })
}

fn address_arg(event: &DecodedEvent, name: &str) -> Result<Address> {
    event
        .value(name)
        .and_then(AbiValue::as_address)
        .ok_or_else(|| Error::decode(format!("{} event has no address '{}'", event.name, name)))
}

fn uint_arg(event: &DecodedEvent, name: &str) -> Result<U256> {
    event
        .value(name)
        .and_then(AbiValue::as_uint)
        .ok_or_else(|| Error::decode(format!("{} event has no uint '{}'", event.name, name)))
}
