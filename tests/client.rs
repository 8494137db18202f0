use cool_bank::chain::{ChainConfig, InMemoryChain, TxStatus, WalletProvider};
use cool_bank::client::{Action, BankClient, ClientError};
use cool_bank::config::DeploymentRegistry;
use cool_bank::domain::{Address, ChainId, LedgerEvent, Wei};

const OWNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const USER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

fn eth(s: &str) -> Wei {
    Wei::from_ether_str(s).expect("failed to parse amount")
}

fn address(s: &str) -> Address {
    s.parse().expect("failed to parse address")
}

/// Devnet with the ledger deployed by OWNER and both accounts funded.
fn setup(auto_mine: bool) -> (InMemoryChain, DeploymentRegistry) {
    let mut chain = InMemoryChain::new(ChainConfig {
        chain_id: ChainId(31337),
        auto_mine,
    });
    chain.fund(address(OWNER), eth("100"));
    chain.fund(address(USER), eth("100"));
    let deployment = chain.deploy(address(OWNER)).expect("deploy should succeed");

    let mut registry = DeploymentRegistry::new();
    registry.record(ChainId(31337), deployment.into());
    (chain, registry)
}

fn client_for(account: &str, auto_mine: bool) -> BankClient<InMemoryChain> {
    let (mut chain, registry) = setup(auto_mine);
    chain.connect(address(account));
    BankClient::connect(chain, &registry).expect("deployment registered")
}

#[test]
fn test_connect_unknown_network() {
    let (chain, _) = setup(true);
    let registry = DeploymentRegistry::new();
    let err = BankClient::connect(chain, &registry).err().expect("should fail");
    assert!(matches!(err, ClientError::ContractNotDeployed(ChainId(31337))));
    assert_eq!(err.to_string(), "Contract not deployed on network 31337");
}

#[test]
fn test_refresh_requires_account() {
    let (chain, registry) = setup(true);
    let mut client = BankClient::connect(chain, &registry).expect("deployment registered");
    assert!(matches!(client.refresh(), Err(ClientError::NotConnected)));
    assert!(matches!(
        client.deposit("1.0"),
        Err(ClientError::NotConnected)
    ));
}

#[test]
fn test_refresh_reports_ownership() {
    let mut owner = client_for(OWNER, true);
    let data = owner.refresh().expect("refresh should succeed").clone();
    assert!(data.is_owner);
    assert_eq!(data.balance, Wei::ZERO);
    assert_eq!(data.total_deposits, Wei::ZERO);

    let mut user = client_for(USER, true);
    assert!(!user.refresh().expect("refresh should succeed").is_owner);
}

#[test]
fn test_deposit_then_withdraw() {
    let mut client = client_for(USER, true);
    client.refresh().expect("refresh should succeed");

    let receipt = client.deposit("1.0").expect("deposit should succeed");
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::Deposit {
            account: address(USER),
            amount: eth("1.0"),
        }]
    );
    assert_eq!(client.banking_data().map(|d| d.balance), Some(eth("1.0")));

    client.withdraw("0.4").expect("withdraw should succeed");
    let data = client.banking_data().expect("refreshed after confirm");
    assert_eq!(data.balance, eth("0.6"));
    assert_eq!(data.total_deposits, eth("0.6"));
    assert_eq!(data.contract_balance, eth("0.6"));
    assert_eq!(client.provider().balance_of(address(USER)), eth("99.4"));
}

#[test]
fn test_input_validation_happens_before_signing() {
    let mut client = client_for(USER, true);
    client.refresh().expect("refresh should succeed");

    assert!(matches!(client.deposit("0"), Err(ClientError::ZeroAmount)));
    assert!(matches!(
        client.deposit("abc"),
        Err(ClientError::InvalidAmount(_))
    ));
    assert!(matches!(
        client.deposit("-1"),
        Err(ClientError::InvalidAmount(_))
    ));

    client.deposit("0.5").expect("deposit should succeed");
    let err = client.withdraw("1.0").err().expect("should fail");
    assert!(matches!(err, ClientError::ExceedsBalance { .. }));
    assert_eq!(
        err.to_string(),
        "amount exceeds available balance of 0.5000 ETH"
    );
    assert!(matches!(
        client.transfer_ownership("0x1234"),
        Err(ClientError::InvalidAddress(_))
    ));
}

#[test]
fn test_pending_until_mined() {
    let mut client = client_for(USER, false);
    client.refresh().expect("refresh should succeed");

    let pending = client.submit_deposit("2").expect("submission accepted");
    assert_eq!(pending.action, Action::Deposit);
    assert_eq!(client.status(&pending).expect("known tx"), TxStatus::Pending);
    assert_eq!(client.provider().pending_count(), 1);
    // Nothing changes until the receipt lands.
    assert_eq!(client.banking_data().map(|d| d.balance), Some(Wei::ZERO));
    assert_eq!(client.balance_of(address(USER)).expect("query"), Wei::ZERO);

    let receipt = client.confirm(pending).expect("deposit should succeed");
    assert!(receipt.is_success());
    assert_eq!(client.status(&pending).expect("known tx"), TxStatus::Success);
    assert_eq!(client.banking_data().map(|d| d.balance), Some(eth("2")));
}

#[test]
fn test_revert_reason_surfaced() {
    let mut client = client_for(USER, true);

    // No cached data, so the overdraw reaches the contract.
    let err = client.withdraw("5").err().expect("should revert");
    match err {
        ClientError::Reverted { reason, .. } => assert_eq!(reason, "Insufficient balance"),
        other => panic!("expected revert, got {other:?}"),
    }
    assert!(client.banking_data().is_none());

    let err = client.transfer_ownership(USER).err().expect("should revert");
    assert_eq!(err.to_string(), "Only owner can call this function");
}

#[test]
fn test_ownership_transfer() {
    let mut client = client_for(OWNER, true);
    client.refresh().expect("refresh should succeed");

    let receipt = client
        .transfer_ownership(USER)
        .expect("transfer should succeed");
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::OwnershipTransferred {
            previous_owner: address(OWNER),
            new_owner: address(USER),
        }]
    );
    assert!(!client.banking_data().expect("refreshed").is_owner);

    let err = client
        .transfer_ownership(OWNER)
        .err()
        .expect("old owner is locked out");
    assert!(matches!(err, ClientError::Reverted { .. }));

    client.provider_mut().connect(address(USER));
    assert!(client.refresh().expect("refresh should succeed").is_owner);
}

#[test]
fn test_deposit_beyond_wallet_funds() {
    let mut client = client_for(USER, true);
    let err = client.deposit("500").err().expect("should fail");
    assert!(matches!(err, ClientError::Provider(_)));
    assert_eq!(client.provider().balance_of(address(USER)), eth("100"));
    assert_eq!(client.provider().chain_id(), ChainId(31337));
}

#[test]
fn test_confirm_keeps_receipt_when_refresh_fails() {
    let mut client = client_for(USER, false);
    client.refresh().expect("refresh should succeed");

    let pending = client.submit_deposit("1").expect("submission accepted");
    client.provider_mut().disconnect();

    let receipt = client.confirm(pending).expect("deposit committed");
    assert!(receipt.is_success());
    assert!(client.banking_data().is_none());
    assert_eq!(client.balance_of(address(USER)).expect("query"), eth("1"));
}
