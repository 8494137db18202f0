use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::chain::provider::{ProviderError, WalletProvider};
use crate::chain::receipt::{Receipt, TransactionRequest, TxStatus};
use crate::domain::{
    Address, CallContext, ChainId, CoolBank, LedgerEvent, Payee, Query, QueryOutput,
    TransferError, TxHash, Wei,
};

pub const HARDHAT_CHAIN_ID: ChainId = ChainId(31337);

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    /// Mine a block as soon as a transaction is submitted.
    pub auto_mine: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            chain_id: HARDHAT_CHAIN_ID,
            auto_mine: true,
        }
    }
}

/// Result of publishing a ledger contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractDeployment {
    pub address: Address,
    pub deployer: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

#[derive(Debug, Clone)]
struct QueuedTransaction {
    hash: TxHash,
    from: Address,
    request: TransactionRequest,
}

/// Local devnet: external account balances, deployed ledgers, a mempool and
/// serial block execution. Transactions in a block run one after another in
/// submission order.
#[derive(Debug)]
pub struct InMemoryChain {
    config: ChainConfig,
    balances: HashMap<Address, Wei>,
    contracts: HashMap<Address, CoolBank>,
    nonces: HashMap<Address, u64>,
    mempool: VecDeque<QueuedTransaction>,
    receipts: HashMap<TxHash, Receipt>,
    block_number: u64,
    active_account: Option<Address>,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl InMemoryChain {
    pub fn new(config: ChainConfig) -> Self {
        InMemoryChain {
            config,
            balances: HashMap::new(),
            contracts: HashMap::new(),
            nonces: HashMap::new(),
            mempool: VecDeque::new(),
            receipts: HashMap::new(),
            block_number: 0,
            active_account: None,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Genesis-style allocation to an external account.
    pub fn fund(&mut self, account: Address, amount: Wei) {
        let balance = self.balances.entry(account).or_default();
        *balance = Wei(balance.0.saturating_add(amount.0));
    }

    pub fn balance_of(&self, account: Address) -> Wei {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn contract(&self, address: Address) -> Option<&CoolBank> {
        self.contracts.get(&address)
    }

    /// Every wei on the chain: external balances plus contract funds.
    /// `None` if the total does not fit in a `Wei`.
    pub fn total_value(&self) -> Option<Wei> {
        self.balances
            .values()
            .copied()
            .chain(self.contracts.values().map(|c| c.get_contract_balance()))
            .try_fold(Wei::ZERO, Wei::checked_add)
    }

    /// Selects the account the wallet signs with.
    pub fn connect(&mut self, account: Address) {
        self.active_account = Some(account);
    }

    pub fn disconnect(&mut self) {
        self.active_account = None;
    }

    pub fn pending_count(&self) -> usize {
        self.mempool.len()
    }

    pub fn receipt(&self, hash: TxHash) -> Option<&Receipt> {
        self.receipts.get(&hash)
    }

    pub fn deploy(&mut self, deployer: Address) -> Result<ContractDeployment, ProviderError> {
        let bank = CoolBank::new(deployer).map_err(ProviderError::Deployment)?;
        let nonce = self.next_nonce(deployer);
        let address = contract_address(deployer, nonce);
        let tx_hash = transaction_hash(self.config.chain_id, deployer, nonce);

        self.block_number += 1;
        self.contracts.insert(address, bank);
        self.receipts.insert(
            tx_hash,
            Receipt {
                hash: tx_hash,
                from: deployer,
                to: address,
                block_number: self.block_number,
                status: TxStatus::Success,
                events: Vec::new(),
            },
        );
        info!(%address, %deployer, block = self.block_number, "contract deployed");
        Ok(ContractDeployment {
            address,
            deployer,
            tx_hash,
            block_number: self.block_number,
        })
    }

    /// Queues a call signed by `from`. The sender must be able to cover the
    /// attached value at submission; it is checked again at execution.
    pub fn submit(
        &mut self,
        from: Address,
        request: TransactionRequest,
    ) -> Result<TxHash, ProviderError> {
        if !self.contracts.contains_key(&request.to) {
            return Err(ProviderError::NoContract(request.to));
        }
        let available = self.balance_of(from);
        if available < request.value {
            return Err(ProviderError::InsufficientFunds {
                account: from,
                available,
                required: request.value,
            });
        }

        let nonce = self.next_nonce(from);
        let hash = transaction_hash(self.config.chain_id, from, nonce);
        debug!(%hash, %from, method = request.call.method(), "transaction queued");
        self.mempool.push_back(QueuedTransaction {
            hash,
            from,
            request,
        });

        if self.config.auto_mine {
            self.mine();
        }
        Ok(hash)
    }

    /// Executes every queued transaction in one new block.
    pub fn mine(&mut self) -> Vec<TxHash> {
        self.block_number += 1;
        let block_number = self.block_number;
        let mut mined = Vec::with_capacity(self.mempool.len());
        while let Some(tx) = self.mempool.pop_front() {
            let receipt = self.execute(&tx, block_number);
            mined.push(receipt.hash);
            self.receipts.insert(receipt.hash, receipt);
        }
        debug!(block = block_number, transactions = mined.len(), "block mined");
        mined
    }

    fn execute(&mut self, tx: &QueuedTransaction, block_number: u64) -> Receipt {
        let checkpoint = self.balances.clone();
        let (status, events) = match self.apply(tx) {
            Ok(events) => (TxStatus::Success, events),
            Err(reason) => {
                warn!(hash = %tx.hash, from = %tx.from, %reason, "transaction reverted");
                self.balances = checkpoint;
                (TxStatus::Reverted { reason }, Vec::new())
            }
        };
        Receipt {
            hash: tx.hash,
            from: tx.from,
            to: tx.request.to,
            block_number,
            status,
            events,
        }
    }

    fn apply(&mut self, tx: &QueuedTransaction) -> Result<Vec<LedgerEvent>, String> {
        let InMemoryChain {
            balances,
            contracts,
            ..
        } = self;
        let bank = contracts
            .get_mut(&tx.request.to)
            .ok_or_else(|| format!("no contract at {}", tx.request.to))?;

        let value = tx.request.value;
        let sender = balances.entry(tx.from).or_default();
        *sender = sender
            .checked_sub(value)
            .ok_or_else(|| "insufficient funds for transfer".to_string())?;

        let ctx = CallContext::new(tx.from, value);
        let mut payee = ExternalAccounts { balances };
        bank.dispatch(&ctx, &tx.request.call, &mut payee)
            .map_err(|e| e.reason())?;
        Ok(bank.take_events())
    }

    fn next_nonce(&mut self, account: Address) -> u64 {
        let nonce = self.nonces.entry(account).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }
}

impl WalletProvider for InMemoryChain {
    fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    fn account(&self) -> Option<Address> {
        self.active_account
    }

    fn send_transaction(&mut self, request: TransactionRequest) -> Result<TxHash, ProviderError> {
        let from = self.active_account.ok_or(ProviderError::NotConnected)?;
        self.submit(from, request)
    }

    fn transaction_status(&self, hash: TxHash) -> Result<TxStatus, ProviderError> {
        if let Some(receipt) = self.receipts.get(&hash) {
            return Ok(receipt.status.clone());
        }
        if self.mempool.iter().any(|tx| tx.hash == hash) {
            return Ok(TxStatus::Pending);
        }
        Err(ProviderError::UnknownTransaction(hash))
    }

    fn wait_for_receipt(&mut self, hash: TxHash) -> Result<Receipt, ProviderError> {
        if !self.receipts.contains_key(&hash) && self.mempool.iter().any(|tx| tx.hash == hash) {
            self.mine();
        }
        self.receipts
            .get(&hash)
            .cloned()
            .ok_or(ProviderError::UnknownTransaction(hash))
    }

    fn call(&self, contract: Address, query: Query) -> Result<QueryOutput, ProviderError> {
        let bank = self
            .contracts
            .get(&contract)
            .ok_or(ProviderError::NoContract(contract))?;
        let caller = self.active_account.unwrap_or(Address::ZERO);
        Ok(bank.query(&CallContext::without_value(caller), &query))
    }
}

/// Pays withdrawals out to external accounts. Those have no code, so they
/// never re-enter and only refuse on balance overflow.
struct ExternalAccounts<'a> {
    balances: &'a mut HashMap<Address, Wei>,
}

impl Payee for ExternalAccounts<'_> {
    fn receive(
        &mut self,
        _bank: &mut CoolBank,
        recipient: Address,
        amount: Wei,
    ) -> Result<(), TransferError> {
        let balance = self.balances.entry(recipient).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::rejected(recipient, amount, "balance overflow"))?;
        Ok(())
    }
}

fn contract_address(deployer: Address, nonce: u64) -> Address {
    let digest = Sha256::new()
        .chain_update(b"contract")
        .chain_update(deployer.0)
        .chain_update(nonce.to_be_bytes())
        .finalize();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address(bytes)
}

fn transaction_hash(chain_id: ChainId, from: Address, nonce: u64) -> TxHash {
    let digest = Sha256::new()
        .chain_update(b"tx")
        .chain_update(chain_id.0.to_be_bytes())
        .chain_update(from.0)
        .chain_update(nonce.to_be_bytes())
        .finalize();
    TxHash(digest.into())
}
