pub mod account;
pub mod call;
pub mod error;
pub mod events;
pub mod ledger;
pub mod types;

pub use account::Account;
pub use call::{CallContext, ContractCall, Payee, Query, QueryOutput, Sink};
pub use error::{AmountKind, LedgerError, TransferError};
pub use events::LedgerEvent;
pub use ledger::CoolBank;
pub use types::{Address, ChainId, TxHash, Wei};
