//! Ethereum contract bindings
//!
//! ABI encoding and decoding, function, event and error descriptors, and a
//! dispatcher that turns descriptor calls into lazy [`CallHandle`]s executed
//! over a pluggable [`Transport`]. [`EthersTransport`] adapts ethers providers.

pub mod abi;
pub mod binding;
pub mod contract;
pub mod contracts;
pub mod deploy;
pub mod dispatcher;
pub mod event;
pub mod fees;
pub mod function;
pub mod handle;
pub mod provider;
pub mod revert;
pub mod transport;

pub use abi::{AbiParser, AbiType, AbiValue};
pub use binding::ContractBinding;
pub use contract::ContractAbi;
pub use contracts::Erc20;
pub use deploy::Deployer;
pub use dispatcher::{CallOutcome, Dispatcher};
pub use event::{DecodedEvent, DecodedParam, EventArg, EventDescriptor, EventParam};
pub use fees::{FeePolicy, Fees, PerFunctionFeePolicy, StaticFeePolicy};
pub use function::{ConstructorDescriptor, FunctionDescriptor, Mutability, Param};
pub use handle::CallHandle;
pub use provider::{EthereumProvider, EthersTransport, WalletSigner};
pub use revert::{decode_revert_reason, ErrorDescriptor};
pub use transport::{CallRequest, Signer, TransactionSubmission, Transport, TransportError};
