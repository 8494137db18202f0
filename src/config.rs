use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ContractDeployment;
use crate::domain::{Address, ChainId, TxHash};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed deployment registry: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: &'static str,
    pub currency_symbol: &'static str,
    pub rpc_url: &'static str,
    pub testnet: bool,
}

pub const NETWORKS: [Network; 3] = [
    Network {
        chain_id: ChainId(1),
        name: "Ethereum",
        currency_symbol: "ETH",
        rpc_url: "https://eth.llamarpc.com",
        testnet: false,
    },
    Network {
        chain_id: ChainId(11155111),
        name: "Sepolia",
        currency_symbol: "ETH",
        rpc_url: "https://rpc.sepolia.org",
        testnet: true,
    },
    Network {
        chain_id: ChainId(31337),
        name: "Hardhat",
        currency_symbol: "ETH",
        rpc_url: "http://127.0.0.1:8545",
        testnet: true,
    },
];

/// Sepolia.
pub const DEFAULT_NETWORK: ChainId = ChainId(11155111);

pub fn network(chain_id: ChainId) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub address: Address,
    pub deployer: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

impl From<ContractDeployment> for Deployment {
    fn from(d: ContractDeployment) -> Self {
        Deployment {
            address: d.address,
            deployer: d.deployer,
            tx_hash: d.tx_hash,
            block_number: d.block_number,
        }
    }
}

/// Where the ledger lives on each network, keyed by chain id.
///
/// Written by the deploy command and read by clients, which refuse to connect
/// on a network with no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRegistry {
    #[serde(default)]
    deployments: BTreeMap<ChainId, Deployment>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Like `load`, but a missing file is an empty registry.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_json()?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Records a deployment, returning the one it replaces.
    pub fn record(&mut self, chain_id: ChainId, deployment: Deployment) -> Option<Deployment> {
        self.deployments.insert(chain_id, deployment)
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&Deployment> {
        self.deployments.get(&chain_id)
    }

    pub fn address_for(&self, chain_id: ChainId) -> Option<Address> {
        self.get(chain_id).map(|d| d.address)
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}
