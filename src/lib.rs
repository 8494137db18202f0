//! Single-owner ETH savings ledger with a wallet client and an in-memory
//! devnet to run it on.

pub mod chain;
pub mod client;
pub mod config;
pub mod domain;
pub mod parser;
pub mod replay;
pub mod writer;
