use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chain::{ProviderError, Receipt, TransactionRequest, TxStatus, WalletProvider};
use crate::config::DeploymentRegistry;
use crate::domain::types::{AddressParseError, AmountParseError};
use crate::domain::{Address, ChainId, ContractCall, Query, TxHash, Wei};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("Contract not deployed on network {0}")]
    ContractNotDeployed(ChainId),

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountParseError),

    #[error("amount must be greater than 0")]
    ZeroAmount,

    #[error("amount exceeds available balance of {available} ETH")]
    ExceedsBalance { available: String },

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressParseError),

    /// The chain executed the transaction and rolled it back.
    #[error("{reason}")]
    Reverted { hash: TxHash, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("unexpected response to {0:?}")]
    UnexpectedOutput(Query),
}

/// What the dashboard shows for the connected account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BankingData {
    pub balance: Wei,
    pub total_deposits: Wei,
    pub contract_balance: Wei,
    pub is_owner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Deposit,
    Withdrawal,
    OwnershipTransfer,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Deposit => "deposit",
            Action::Withdrawal => "withdrawal",
            Action::OwnershipTransfer => "ownership transfer",
        }
    }
}

/// A broadcast transaction whose outcome is not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub action: Action,
}

/// Client for one deployed ledger, driven through a wallet provider.
///
/// Cached banking data only changes on `refresh`, which runs after a
/// confirmed receipt and never before.
pub struct BankClient<P> {
    provider: P,
    contract: Address,
    data: Option<BankingData>,
}

impl<P: WalletProvider> BankClient<P> {
    /// Finds the ledger for the provider's current network.
    pub fn connect(provider: P, registry: &DeploymentRegistry) -> Result<Self, ClientError> {
        let chain_id = provider.chain_id();
        let contract = registry.address_for(chain_id).ok_or_else(|| {
            warn!(%chain_id, "no deployment registered for network");
            ClientError::ContractNotDeployed(chain_id)
        })?;
        info!(%chain_id, %contract, "connected to ledger");
        Ok(Self::with_contract(provider, contract))
    }

    pub fn with_contract(provider: P, contract: Address) -> Self {
        BankClient {
            provider,
            contract,
            data: None,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Data from the last successful `refresh`.
    pub fn banking_data(&self) -> Option<&BankingData> {
        self.data.as_ref()
    }

    pub fn refresh(&mut self) -> Result<&BankingData, ClientError> {
        let account = self.provider.account().ok_or(ClientError::NotConnected)?;
        let balance = self.amount(Query::GetMyBalance)?;
        let total_deposits = self.amount(Query::TotalDeposits)?;
        let contract_balance = self.amount(Query::GetContractBalance)?;
        let owner = self
            .provider
            .call(self.contract, Query::Owner)?
            .as_address()
            .ok_or(ClientError::UnexpectedOutput(Query::Owner))?;

        let data = self.data.insert(BankingData {
            balance,
            total_deposits,
            contract_balance,
            is_owner: owner == account,
        });
        debug!(%account, balance = %balance.to_ether_string(), "banking data refreshed");
        Ok(data)
    }

    pub fn balance_of(&self, account: Address) -> Result<Wei, ClientError> {
        self.amount(Query::GetBalance { account })
    }

    pub fn submit_deposit(&mut self, ether: &str) -> Result<PendingTx, ClientError> {
        let value = parse_positive(ether)?;
        let request = TransactionRequest::new(self.contract, ContractCall::Deposit).with_value(value);
        self.send(request, Action::Deposit)
    }

    /// Rejects amounts above the cached balance before anything is signed.
    pub fn submit_withdraw(&mut self, ether: &str) -> Result<PendingTx, ClientError> {
        let amount = parse_positive(ether)?;
        if let Some(data) = &self.data {
            if amount > data.balance {
                return Err(ClientError::ExceedsBalance {
                    available: data.balance.format_ether(4),
                });
            }
        }
        let request = TransactionRequest::new(self.contract, ContractCall::Withdraw { amount });
        self.send(request, Action::Withdrawal)
    }

    pub fn submit_transfer_ownership(&mut self, new_owner: &str) -> Result<PendingTx, ClientError> {
        let new_owner: Address = new_owner.parse()?;
        let request =
            TransactionRequest::new(self.contract, ContractCall::TransferOwnership { new_owner });
        self.send(request, Action::OwnershipTransfer)
    }

    pub fn status(&self, pending: &PendingTx) -> Result<TxStatus, ClientError> {
        Ok(self.provider.transaction_status(pending.hash)?)
    }

    /// Waits for the transaction to land. Only a successful receipt refreshes
    /// the cached data; a revert surfaces the contract's reason.
    ///
    /// A committed transaction is reported as such even if the refresh after
    /// it fails. The stale cache is dropped in that case.
    pub fn confirm(&mut self, pending: PendingTx) -> Result<Receipt, ClientError> {
        let receipt = self.provider.wait_for_receipt(pending.hash)?;
        match &receipt.status {
            TxStatus::Success => {
                info!(hash = %pending.hash, "{} successful", pending.action.label());
                if let Err(e) = self.refresh() {
                    warn!(hash = %pending.hash, error = %e, "could not refresh banking data");
                    self.data = None;
                }
                Ok(receipt)
            }
            TxStatus::Reverted { reason } => {
                warn!(hash = %pending.hash, %reason, "{} failed", pending.action.label());
                Err(ClientError::Reverted {
                    hash: pending.hash,
                    reason: reason.clone(),
                })
            }
            TxStatus::Pending => Err(ClientError::Provider(ProviderError::UnknownTransaction(
                pending.hash,
            ))),
        }
    }

    pub fn deposit(&mut self, ether: &str) -> Result<Receipt, ClientError> {
        let pending = self.submit_deposit(ether)?;
        self.confirm(pending)
    }

    pub fn withdraw(&mut self, ether: &str) -> Result<Receipt, ClientError> {
        let pending = self.submit_withdraw(ether)?;
        self.confirm(pending)
    }

    pub fn transfer_ownership(&mut self, new_owner: &str) -> Result<Receipt, ClientError> {
        let pending = self.submit_transfer_ownership(new_owner)?;
        self.confirm(pending)
    }

    fn send(&mut self, request: TransactionRequest, action: Action) -> Result<PendingTx, ClientError> {
        if self.provider.account().is_none() {
            return Err(ClientError::NotConnected);
        }
        let hash = self.provider.send_transaction(request)?;
        debug!(%hash, "processing {}", action.label());
        Ok(PendingTx { hash, action })
    }

    fn amount(&self, query: Query) -> Result<Wei, ClientError> {
        self.provider
            .call(self.contract, query)?
            .as_amount()
            .ok_or(ClientError::UnexpectedOutput(query))
    }
}

fn parse_positive(ether: &str) -> Result<Wei, ClientError> {
    let amount = Wei::from_ether_str(ether)?;
    if amount.is_zero() {
        return Err(ClientError::ZeroAmount);
    }
    Ok(amount)
}
