use serde::{Deserialize, Serialize};

use crate::domain::{Address, ContractCall, LedgerEvent, TxHash, Wei};

/// A contract call waiting to be signed by the connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: Address,
    pub value: Wei,
    pub call: ContractCall,
}

impl TransactionRequest {
    pub fn new(to: Address, call: ContractCall) -> Self {
        TransactionRequest {
            to,
            value: Wei::ZERO,
            call,
        }
    }

    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    /// Submitted, not yet in a block.
    Pending,
    Success,
    Reverted { reason: String },
}

impl TxStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub block_number: u64,
    pub status: TxStatus,
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    pub fn revert_reason(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Reverted { reason } => Some(reason),
            _ => None,
        }
    }
}
