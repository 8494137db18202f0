//! The network side of the bank: a wallet/RPC capability trait and an
//! in-memory devnet that implements it.

pub mod memory;
pub mod provider;
pub mod receipt;

pub use memory::{ChainConfig, ContractDeployment, InMemoryChain, HARDHAT_CHAIN_ID};
pub use provider::{ProviderError, WalletProvider};
pub use receipt::{Receipt, TransactionRequest, TxStatus};
