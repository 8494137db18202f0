use std::collections::HashSet;
use std::io::Read;

use tracing::{debug, warn};

use crate::chain::{
    ChainConfig, ContractDeployment, InMemoryChain, ProviderError, Receipt, TxStatus,
};
use crate::domain::{Address, CoolBank, LedgerEvent, Wei};
use crate::parser::{CsvParser, InputRecord};
use crate::writer::OutputRecord;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub committed: usize,
    pub reverted: usize,
    /// Rows that never reached the chain: parse errors and refused submissions.
    pub skipped: usize,
}

/// Runs scripted calls against a freshly deployed ledger on an auto-mining
/// devnet. Every caller gets `genesis` wei the first time it appears.
pub struct Replay {
    chain: InMemoryChain,
    deployment: ContractDeployment,
    genesis: Wei,
    funded: HashSet<Address>,
    events: Vec<LedgerEvent>,
}

impl Replay {
    pub fn new(
        config: ChainConfig,
        deployer: Address,
        genesis: Wei,
    ) -> Result<Self, ProviderError> {
        let mut chain = InMemoryChain::new(ChainConfig {
            auto_mine: true,
            ..config
        });
        chain.fund(deployer, genesis);
        let deployment = chain.deploy(deployer)?;
        let mut funded = HashSet::new();
        funded.insert(deployer);
        Ok(Replay {
            chain,
            deployment,
            genesis,
            funded,
            events: Vec::new(),
        })
    }

    pub fn deployment(&self) -> &ContractDeployment {
        &self.deployment
    }

    pub fn chain(&self) -> &InMemoryChain {
        &self.chain
    }

    pub fn bank(&self) -> Option<&CoolBank> {
        self.chain.contract(self.deployment.address)
    }

    pub fn apply(&mut self, record: &InputRecord) -> Result<Receipt, ProviderError> {
        if self.funded.insert(record.caller) {
            self.chain.fund(record.caller, self.genesis);
        }
        let request = record.to_request(self.deployment.address);
        let hash = self.chain.submit(record.caller, request)?;
        let receipt = self
            .chain
            .receipt(hash)
            .cloned()
            .ok_or(ProviderError::UnknownTransaction(hash))?;
        for event in &receipt.events {
            debug!(caller = %record.caller.short(), event = event.name(), "event emitted");
        }
        self.events.extend(receipt.events.iter().cloned());
        Ok(receipt)
    }

    /// Every event emitted by committed calls, in execution order.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn run<R: Read>(&mut self, parser: CsvParser<R>) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for result in parser {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("{}", e);
                    summary.skipped += 1;
                    continue;
                }
            };
            match self.apply(&record) {
                Ok(receipt) => match receipt.status {
                    TxStatus::Success => summary.committed += 1,
                    _ => summary.reverted += 1,
                },
                Err(e) => {
                    warn!(caller = %record.caller, error = %e, "submission refused");
                    summary.skipped += 1;
                }
            }
        }
        debug!(?summary, "replay finished");
        summary
    }

    /// Balance rows ordered by address.
    pub fn output_records(&self) -> Vec<OutputRecord> {
        let mut records: Vec<_> = self
            .bank()
            .into_iter()
            .flat_map(|bank| bank.accounts().iter())
            .map(|(address, account)| OutputRecord::from_account(*address, account))
            .collect();
        records.sort_by_key(|r| r.account);
        records
    }
}
