use std::io::Write;

use crate::domain::{Account, Address, Wei};

pub struct OutputRecord {
    pub account: Address,
    pub balance: Wei,
}

impl OutputRecord {
    pub fn from_account(address: Address, account: &Account) -> Self {
        OutputRecord {
            account: address,
            balance: account.balance,
        }
    }
}

/// Writes `account,balance` rows, balances in exact ether.
pub fn write_csv<W: Write>(
    writer: &mut W,
    records: impl Iterator<Item = OutputRecord>,
) -> std::io::Result<()> {
    writeln!(writer, "account,balance")?;

    for record in records {
        writeln!(
            writer,
            "{},{}",
            record.account,
            record.balance.to_ether_string()
        )?;
    }

    Ok(())
}
