use thiserror::Error;

use crate::chain::receipt::{Receipt, TransactionRequest, TxStatus};
use crate::domain::{Address, ChainId, LedgerError, Query, QueryOutput, TxHash, Wei};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("no wallet account connected")]
    NotConnected,

    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),

    #[error("no contract deployed at {0}")]
    NoContract(Address),

    #[error("insufficient funds: {account} holds {available} wei, needs {required} wei")]
    InsufficientFunds {
        account: Address,
        available: Wei,
        required: Wei,
    },

    #[error("deployment failed: {0}")]
    Deployment(#[source] LedgerError),
}

/// What a wallet plus its RPC endpoint can do for a client: name the
/// connected account, sign and broadcast calls, report on them, and answer
/// read-only queries against committed state.
pub trait WalletProvider {
    fn chain_id(&self) -> ChainId;

    /// The connected account, if any. Transactions are signed by it.
    fn account(&self) -> Option<Address>;

    fn send_transaction(&mut self, request: TransactionRequest) -> Result<TxHash, ProviderError>;

    fn transaction_status(&self, hash: TxHash) -> Result<TxStatus, ProviderError>;

    /// Blocks until `hash` is in a block and returns its receipt.
    fn wait_for_receipt(&mut self, hash: TxHash) -> Result<Receipt, ProviderError>;

    fn call(&self, contract: Address, query: Query) -> Result<QueryOutput, ProviderError>;
}
