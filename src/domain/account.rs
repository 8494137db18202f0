use crate::domain::error::LedgerError;
use crate::domain::types::Wei;

/// Balance record for one address. A zero balance reads the same as an
/// address that never deposited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Account {
    pub balance: Wei,
}

impl Account {
    pub fn new() -> Self {
        Account { balance: Wei::ZERO }
    }

    pub fn credit(&mut self, amount: Wei) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Wei) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            })?;
        Ok(())
    }
}
