use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::account::Account;
use crate::domain::call::{CallContext, ContractCall, Payee, Query, QueryOutput};
use crate::domain::error::{AmountKind, LedgerError};
use crate::domain::events::LedgerEvent;
use crate::domain::types::{Address, Wei};

/// Single-owner savings ledger: per-address ETH balances backed one to one by
/// the funds the contract holds.
///
/// Every mutating call either commits fully or leaves the state exactly as it
/// found it.
#[derive(Debug, Clone)]
pub struct CoolBank {
    accounts: HashMap<Address, Account>,
    total_deposits: Wei,
    owner: Address,
    /// Native currency held by the contract.
    funds: Wei,
    /// Events emitted since the last `take_events`.
    events: Vec<LedgerEvent>,
    /// Prior account entries, logged only while a withdrawal is paying out.
    journal: Option<Vec<(Address, Option<Account>)>>,
}

/// State a failed payout rolls back to.
#[derive(Debug, Clone, Copy)]
struct Savepoint {
    journal_len: usize,
    total_deposits: Wei,
    funds: Wei,
    owner: Address,
    events_len: usize,
    outermost: bool,
}

impl CoolBank {
    /// Deploys a fresh ledger owned by `deployer`.
    pub fn new(deployer: Address) -> Result<Self, LedgerError> {
        if deployer.is_zero() {
            return Err(LedgerError::ZeroOwner);
        }
        debug!(owner = %deployer, "ledger deployed");
        Ok(CoolBank {
            accounts: HashMap::new(),
            total_deposits: Wei::ZERO,
            owner: deployer,
            funds: Wei::ZERO,
            events: Vec::new(),
            journal: None,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn total_deposits(&self) -> Wei {
        self.total_deposits
    }

    pub fn get_account(&self, account: Address) -> Option<&Account> {
        self.accounts.get(&account)
    }

    pub fn accounts(&self) -> &HashMap<Address, Account> {
        &self.accounts
    }

    pub fn get_balance(&self, account: Address) -> Wei {
        self.accounts
            .get(&account)
            .map(|a| a.balance)
            .unwrap_or(Wei::ZERO)
    }

    pub fn get_my_balance(&self, ctx: &CallContext) -> Wei {
        self.get_balance(ctx.caller)
    }

    pub fn get_contract_balance(&self) -> Wei {
        self.funds
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// `total_deposits == Σ balances == funds`.
    pub fn is_consistent(&self) -> bool {
        let sum = self
            .accounts
            .values()
            .try_fold(Wei::ZERO, |acc, a| acc.checked_add(a.balance));
        sum == Some(self.total_deposits) && self.total_deposits == self.funds
    }

    pub fn deposit(&mut self, ctx: &CallContext) -> Result<(), LedgerError> {
        let amount = ctx.value;
        if amount.is_zero() {
            warn!(caller = %ctx.caller, "rejected zero deposit");
            return Err(LedgerError::InvalidAmount(AmountKind::Deposit));
        }

        let mut account = self.get_account(ctx.caller).copied().unwrap_or_default();
        account.credit(amount)?;
        let total_deposits = self
            .total_deposits
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let funds = self.funds.checked_add(amount).ok_or(LedgerError::Overflow)?;

        self.record(ctx.caller);
        self.accounts.insert(ctx.caller, account);
        self.total_deposits = total_deposits;
        self.funds = funds;
        self.events.push(LedgerEvent::Deposit {
            account: ctx.caller,
            amount,
        });
        debug!(account = %ctx.caller, %amount, "deposit credited");
        Ok(())
    }

    /// Debits the caller, then hands `amount` to `payee`.
    ///
    /// The debit lands before the payee runs, so a payee that re-enters sees
    /// the reduced balance. A rejected transfer rolls back everything the call
    /// did, re-entrant calls included.
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        amount: Wei,
        payee: &mut dyn Payee,
    ) -> Result<(), LedgerError> {
        ensure_no_value(ctx)?;
        if amount.is_zero() {
            warn!(caller = %ctx.caller, "rejected zero withdrawal");
            return Err(LedgerError::InvalidAmount(AmountKind::Withdrawal));
        }
        let available = self.get_balance(ctx.caller);
        if available < amount {
            warn!(caller = %ctx.caller, %amount, %available, "rejected withdrawal");
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let savepoint = self.savepoint();
        if let Err(err) = self.debit(ctx.caller, amount) {
            self.rollback(savepoint);
            return Err(err);
        }

        if let Err(err) = payee.receive(self, ctx.caller, amount) {
            warn!(caller = %ctx.caller, %amount, error = %err, "outbound transfer failed, reverting");
            self.rollback(savepoint);
            return Err(LedgerError::TransferFailed(err));
        }

        self.events.push(LedgerEvent::Withdrawal {
            account: ctx.caller,
            amount,
        });
        self.release(savepoint);
        debug!(account = %ctx.caller, %amount, "withdrawal paid out");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<(), LedgerError> {
        ensure_no_value(ctx)?;
        if ctx.caller != self.owner {
            warn!(caller = %ctx.caller, "non-owner attempted ownership transfer");
            return Err(LedgerError::Unauthorized { caller: ctx.caller });
        }
        if new_owner.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }

        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        self.events.push(LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        debug!(%previous_owner, %new_owner, "ownership transferred");
        Ok(())
    }

    pub fn dispatch(
        &mut self,
        ctx: &CallContext,
        call: &ContractCall,
        payee: &mut dyn Payee,
    ) -> Result<(), LedgerError> {
        match call {
            ContractCall::Deposit => self.deposit(ctx),
            ContractCall::Withdraw { amount } => self.withdraw(ctx, *amount, payee),
            ContractCall::TransferOwnership { new_owner } => {
                self.transfer_ownership(ctx, *new_owner)
            }
        }
    }

    pub fn query(&self, ctx: &CallContext, query: &Query) -> QueryOutput {
        match query {
            Query::Owner => QueryOutput::Address(self.owner),
            Query::TotalDeposits => QueryOutput::Amount(self.total_deposits),
            Query::GetBalance { account } => QueryOutput::Amount(self.get_balance(*account)),
            Query::GetMyBalance => QueryOutput::Amount(self.get_my_balance(ctx)),
            Query::GetContractBalance => QueryOutput::Amount(self.funds),
        }
    }

    fn debit(&mut self, account: Address, amount: Wei) -> Result<(), LedgerError> {
        self.record(account);
        self.accounts.entry(account).or_default().debit(amount)?;
        self.total_deposits = self
            .total_deposits
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        self.funds = self.funds.checked_sub(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Opens the journal if no withdrawal is in flight yet.
    fn savepoint(&mut self) -> Savepoint {
        let outermost = self.journal.is_none();
        let journal_len = self.journal.get_or_insert_with(Vec::new).len();
        Savepoint {
            journal_len,
            total_deposits: self.total_deposits,
            funds: self.funds,
            owner: self.owner,
            events_len: self.events.len(),
            outermost,
        }
    }

    /// Logs the current entry for `account` before it changes.
    fn record(&mut self, account: Address) {
        if let Some(journal) = &mut self.journal {
            journal.push((account, self.accounts.get(&account).copied()));
        }
    }

    /// Undoes every change since `savepoint`, newest first.
    fn rollback(&mut self, savepoint: Savepoint) {
        if let Some(journal) = &mut self.journal {
            for (account, previous) in journal.drain(savepoint.journal_len..).rev() {
                match previous {
                    Some(entry) => {
                        self.accounts.insert(account, entry);
                    }
                    None => {
                        self.accounts.remove(&account);
                    }
                }
            }
        }
        self.total_deposits = savepoint.total_deposits;
        self.funds = savepoint.funds;
        self.owner = savepoint.owner;
        self.events.truncate(savepoint.events_len);
        self.release(savepoint);
    }

    fn release(&mut self, savepoint: Savepoint) {
        if savepoint.outermost {
            self.journal = None;
        }
    }
}

fn ensure_no_value(ctx: &CallContext) -> Result<(), LedgerError> {
    if ctx.value.is_zero() {
        Ok(())
    } else {
        Err(LedgerError::NonPayable)
    }
}
