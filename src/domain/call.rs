use serde::{Deserialize, Serialize};

use crate::domain::error::TransferError;
use crate::domain::ledger::CoolBank;
use crate::domain::types::{Address, Wei};

/// Who is calling and how much native currency rides along with the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: Wei,
}

impl CallContext {
    pub fn new(caller: Address, value: Wei) -> Self {
        CallContext { caller, value }
    }

    /// A call with nothing attached.
    pub fn without_value(caller: Address) -> Self {
        CallContext {
            caller,
            value: Wei::ZERO,
        }
    }
}

/// Receiving side of a withdrawal's outbound transfer.
///
/// The bank has already debited the caller when `receive` runs, and hands
/// itself over so the recipient may call back in before the withdrawal
/// returns. Returning an error reverts the whole withdrawal.
pub trait Payee {
    fn receive(
        &mut self,
        bank: &mut CoolBank,
        recipient: Address,
        amount: Wei,
    ) -> Result<(), TransferError>;
}

/// Payee that accepts every transfer and forgets it.
#[derive(Debug, Default)]
pub struct Sink;

impl Payee for Sink {
    fn receive(&mut self, _: &mut CoolBank, _: Address, _: Wei) -> Result<(), TransferError> {
        Ok(())
    }
}

/// State-changing entry points, as encoded in a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractCall {
    Deposit,
    Withdraw { amount: Wei },
    TransferOwnership { new_owner: Address },
}

impl ContractCall {
    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::Deposit => "deposit",
            ContractCall::Withdraw { .. } => "withdraw",
            ContractCall::TransferOwnership { .. } => "transferOwnership",
        }
    }
}

/// Read-only entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Query {
    Owner,
    TotalDeposits,
    GetBalance { account: Address },
    GetMyBalance,
    GetContractBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutput {
    Address(Address),
    Amount(Wei),
}

impl QueryOutput {
    pub fn as_amount(&self) -> Option<Wei> {
        match self {
            QueryOutput::Amount(amount) => Some(*amount),
            QueryOutput::Address(_) => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            QueryOutput::Address(address) => Some(*address),
            QueryOutput::Amount(_) => None,
        }
    }
}
