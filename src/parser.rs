use csv::ReaderBuilder;
use std::io::Read;
use thiserror::Error;

use crate::chain::TransactionRequest;
use crate::domain::types::Operation;
use crate::domain::{Address, ContractCall, Wei};

/// One contract call from a replay script. Amounts are in wei, parsed from
/// ether text.
#[derive(Debug)]
pub struct InputRecord {
    pub op: Operation,
    pub caller: Address,
    pub amount: Option<Wei>,
    pub target: Option<Address>,
}

impl InputRecord {
    pub fn to_request(&self, contract: Address) -> TransactionRequest {
        match self.op {
            Operation::Deposit => TransactionRequest::new(contract, ContractCall::Deposit)
                .with_value(self.amount.unwrap_or_default()),
            Operation::Withdraw => TransactionRequest::new(
                contract,
                ContractCall::Withdraw {
                    amount: self.amount.unwrap_or_default(),
                },
            ),
            Operation::TransferOwnership => TransactionRequest::new(
                contract,
                ContractCall::TransferOwnership {
                    new_owner: self.target.unwrap_or_default(),
                },
            ),
        }
    }
}

#[derive(Debug, Error)]
#[error("Line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// The header row is unreadable or lacks a required column.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("Failed to read headers: {0}")]
    Read(#[from] csv::Error),

    #[error("Missing required column: '{0}'")]
    MissingColumn(&'static str),
}

#[derive(Debug)]
struct ColumnIndices {
    op_idx: usize,
    caller_idx: usize,
    amount_idx: usize,
    target_idx: usize,
}

/// Streams `op,caller,amount,target` rows. Columns are found by header name,
/// so order and extra columns do not matter.
pub struct CsvParser<R: Read> {
    reader: csv::Reader<R>,
    line_number: usize,
    columns: ColumnIndices,
}

impl<R: Read> std::fmt::Debug for CsvParser<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvParser")
            .field("line_number", &self.line_number)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl<R: Read> CsvParser<R> {
    pub fn new(reader: R) -> Result<Self, HeaderError> {
        let mut csv_reader = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();

        let columns = Self::extract_column_indices(&headers)?;

        Ok(CsvParser {
            reader: csv_reader,
            line_number: 1,
            columns,
        })
    }

    fn extract_column_indices(headers: &csv::StringRecord) -> Result<ColumnIndices, HeaderError> {
        let find_col = |name: &'static str| -> Result<usize, HeaderError> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(HeaderError::MissingColumn(name))
        };

        Ok(ColumnIndices {
            op_idx: find_col("op")?,
            caller_idx: find_col("caller")?,
            amount_idx: find_col("amount")?,
            target_idx: find_col("target")?,
        })
    }

    pub fn next_record(&mut self) -> Option<Result<InputRecord, ParseError>> {
        let mut record = csv::StringRecord::new();

        self.line_number += 1;
        let current_line = self.line_number;

        match self.reader.read_record(&mut record) {
            Ok(true) => Some(self.parse_record(&record, current_line)),
            Ok(false) => None,
            Err(e) => Some(Err(ParseError {
                line: current_line,
                message: format!("CSV error: {}", e),
            })),
        }
    }

    fn parse_record(
        &self,
        record: &csv::StringRecord,
        line: usize,
    ) -> Result<InputRecord, ParseError> {
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let op_str = field(self.columns.op_idx);
        let op: Operation = op_str.parse().map_err(|_| ParseError {
            line,
            message: format!("Unknown operation: '{}'", op_str),
        })?;

        let caller_str = field(self.columns.caller_idx);
        let caller: Address = caller_str.parse().map_err(|e| ParseError {
            line,
            message: format!("Invalid caller '{}': {}", caller_str, e),
        })?;

        let amount_str = field(self.columns.amount_idx);
        let amount = if amount_str.is_empty() {
            None
        } else {
            Some(Wei::from_ether_str(amount_str).map_err(|e| ParseError {
                line,
                message: format!("Invalid amount '{}': {}", amount_str, e),
            })?)
        };

        let target_str = field(self.columns.target_idx);
        let target = if target_str.is_empty() {
            None
        } else {
            Some(target_str.parse::<Address>().map_err(|e| ParseError {
                line,
                message: format!("Invalid target '{}': {}", target_str, e),
            })?)
        };

        match op {
            Operation::Deposit | Operation::Withdraw if amount.is_none() => {
                return Err(ParseError {
                    line,
                    message: "Deposit/withdraw requires amount".to_string(),
                });
            }
            Operation::TransferOwnership if target.is_none() => {
                return Err(ParseError {
                    line,
                    message: "transfer_ownership requires target".to_string(),
                });
            }
            _ => {}
        }

        Ok(InputRecord {
            op,
            caller,
            amount,
            target,
        })
    }
}

impl<R: Read> Iterator for CsvParser<R> {
    type Item = Result<InputRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}
