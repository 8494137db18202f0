use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cool_bank::chain::ChainConfig;
use cool_bank::config::{self, DeploymentRegistry};
use cool_bank::domain::{Address, ChainId, Wei};
use cool_bank::parser::CsvParser;
use cool_bank::replay::Replay;
use cool_bank::writer::write_csv;

/// First Hardhat development account.
const DEFAULT_DEPLOYER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[derive(Parser, Debug)]
#[command(name = "cool-bank", version, about = "ETH savings ledger on a local devnet")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a CSV script of contract calls and print final balances
    Replay {
        /// CSV with columns op,caller,amount,target
        script: PathBuf,

        #[arg(long, default_value_t = 31337)]
        chain_id: u64,

        #[arg(long, default_value = DEFAULT_DEPLOYER)]
        deployer: Address,

        /// Ether given to every caller before its first call
        #[arg(long, default_value = "10000")]
        genesis_ether: String,

        /// Record the deployment in this registry file
        #[arg(long, value_name = "FILE")]
        deployments: Option<PathBuf>,

        /// Write the emitted events to this file as JSON
        #[arg(long, value_name = "FILE")]
        events: Option<PathBuf>,
    },

    /// Deploy the ledger and record its address for the network
    Deploy {
        #[arg(long, value_name = "FILE")]
        deployments: PathBuf,

        #[arg(long, default_value_t = 31337)]
        chain_id: u64,

        #[arg(long, default_value = DEFAULT_DEPLOYER)]
        deployer: Address,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Replay {
            script,
            chain_id,
            deployer,
            genesis_ether,
            deployments,
            events,
        } => replay(
            script,
            ChainId(chain_id),
            deployer,
            &genesis_ether,
            deployments,
            events,
        ),
        Command::Deploy {
            deployments,
            chain_id,
            deployer,
        } => deploy(deployments, ChainId(chain_id), deployer),
    }
}

fn chain_config(chain_id: ChainId) -> ChainConfig {
    match config::network(chain_id) {
        Some(network) => info!(%chain_id, network = network.name, "using network"),
        None => warn!(%chain_id, "unknown network, running as a local devnet"),
    }
    ChainConfig {
        chain_id,
        auto_mine: true,
    }
}

fn replay(
    script: PathBuf,
    chain_id: ChainId,
    deployer: Address,
    genesis_ether: &str,
    deployments: Option<PathBuf>,
    events: Option<PathBuf>,
) -> Result<()> {
    let genesis = Wei::from_ether_str(genesis_ether).context("invalid --genesis-ether")?;
    let file = File::open(&script)
        .with_context(|| format!("Failed to open '{}'", script.display()))?;
    let parser = CsvParser::new(BufReader::new(file))
        .with_context(|| format!("Failed to read header of '{}'", script.display()))?;

    let mut session = Replay::new(chain_config(chain_id), deployer, genesis)?;
    if let Some(path) = deployments {
        record_deployment(&path, chain_id, &session)?;
    }

    let summary = session.run(parser);
    let bank = session
        .bank()
        .context("deployed contract missing from chain")?;
    info!(
        committed = summary.committed,
        reverted = summary.reverted,
        skipped = summary.skipped,
        owner = %bank.owner(),
        total_deposits = %bank.total_deposits().to_ether_string(),
        contract_balance = %bank.get_contract_balance().to_ether_string(),
        "replay complete"
    );

    if let Some(path) = events {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create '{}'", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), session.events())
            .context("Failed to write events")?;
        info!(path = %path.display(), count = session.events().len(), "events written");
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_csv(&mut handle, session.output_records().into_iter())
        .context("Failed to write output")?;
    Ok(())
}

fn deploy(path: PathBuf, chain_id: ChainId, deployer: Address) -> Result<()> {
    info!("Starting deployment...");
    info!(account = %deployer, "Deploying contracts with the account");

    let session = Replay::new(chain_config(chain_id), deployer, Wei::from_ether(10_000))?;
    info!(
        balance = %session.chain().balance_of(deployer).to_ether_string(),
        "Account balance"
    );
    let deployment = session.deployment();
    let bank = session
        .bank()
        .context("deployed contract missing from chain")?;
    info!(
        address = %deployment.address,
        tx_hash = %deployment.tx_hash,
        owner = %bank.owner(),
        total_deposits = %bank.total_deposits().to_ether_string(),
        "contract deployed"
    );

    record_deployment(&path, chain_id, &session)?;
    println!("{}", deployment.address);
    Ok(())
}

fn record_deployment(path: &Path, chain_id: ChainId, session: &Replay) -> Result<()> {
    let mut registry = DeploymentRegistry::load_or_default(path)?;
    if let Some(previous) = registry.record(chain_id, (*session.deployment()).into()) {
        info!(previous = %previous.address, "replacing earlier deployment");
    }
    registry.save(path)?;
    info!(path = %path.display(), %chain_id, "deployment recorded");
    Ok(())
}
