//! Typed wrappers for well-known contract interfaces

pub mod erc20;

pub use erc20::{erc20_abi, Approval, Erc20, Transfer};
