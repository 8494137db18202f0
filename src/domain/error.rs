use std::fmt;

use thiserror::Error;

use crate::domain::types::{Address, Wei};

/// Which operation rejected a zero amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for AmountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountKind::Deposit => write!(f, "Deposit"),
            AmountKind::Withdrawal => write!(f, "Withdrawal"),
        }
    }
}

/// A recipient refused the outbound transfer of a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("recipient {recipient} rejected {amount} wei: {reason}")]
pub struct TransferError {
    pub recipient: Address,
    pub amount: Wei,
    pub reason: String,
}

impl TransferError {
    pub fn rejected(recipient: Address, amount: Wei, reason: impl Into<String>) -> Self {
        TransferError {
            recipient,
            amount,
            reason: reason.into(),
        }
    }
}

/// Every way a ledger call can revert. `Display` is the revert reason clients see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{0} amount must be greater than 0")]
    InvalidAmount(AmountKind),

    #[error("Insufficient balance")]
    InsufficientBalance { requested: Wei, available: Wei },

    #[error("Only owner can call this function")]
    Unauthorized { caller: Address },

    #[error("New owner cannot be zero address")]
    InvalidAddress,

    #[error("Transfer failed")]
    TransferFailed(#[source] TransferError),

    #[error("Function does not accept value")]
    NonPayable,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Owner cannot be zero address")]
    ZeroOwner,
}

impl LedgerError {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
