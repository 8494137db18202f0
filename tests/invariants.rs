use std::collections::HashMap;

use proptest::prelude::*;

use cool_bank::chain::{ChainConfig, InMemoryChain, TransactionRequest};
use cool_bank::domain::{Address, CallContext, ContractCall, CoolBank, LedgerError, Sink, Wei};

const GWEI: u128 = 1_000_000_000;

#[derive(Debug, Clone)]
enum Op {
    Deposit { who: u64, gwei: u128 },
    Withdraw { who: u64, gwei: u128 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..=3, 0u128..=5_000).prop_map(|(who, gwei)| Op::Deposit { who, gwei }),
        (1u64..=3, 0u128..=5_000).prop_map(|(who, gwei)| Op::Withdraw { who, gwei }),
    ]
}

proptest! {
    #[test]
    fn ledger_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut bank = CoolBank::new(Address::from_low_u64(99)).expect("nonzero deployer");
        let mut model: HashMap<u64, u128> = HashMap::new();

        for op in ops {
            match op {
                Op::Deposit { who, gwei } => {
                    let ctx = CallContext::new(Address::from_low_u64(who), Wei(gwei * GWEI));
                    let result = bank.deposit(&ctx);
                    if gwei == 0 {
                        prop_assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
                    } else {
                        prop_assert!(result.is_ok());
                        *model.entry(who).or_default() += gwei * GWEI;
                    }
                }
                Op::Withdraw { who, gwei } => {
                    let ctx = CallContext::without_value(Address::from_low_u64(who));
                    let held = model.get(&who).copied().unwrap_or_default();
                    let result = bank.withdraw(&ctx, Wei(gwei * GWEI), &mut Sink);
                    if gwei == 0 {
                        prop_assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
                    } else if gwei * GWEI > held {
                        prop_assert!(
                            matches!(result, Err(LedgerError::InsufficientBalance { .. })),
                            "unexpected result {:?}",
                            result
                        );
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(who, held - gwei * GWEI);
                    }
                }
            }
            prop_assert!(bank.is_consistent());
        }

        for (who, expected) in &model {
            prop_assert_eq!(bank.get_balance(Address::from_low_u64(*who)), Wei(*expected));
        }
        prop_assert_eq!(bank.total_deposits(), Wei(model.values().sum()));
        prop_assert_eq!(bank.get_contract_balance(), bank.total_deposits());
    }

    #[test]
    fn chain_conserves_value(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut chain = InMemoryChain::new(ChainConfig::default());
        let deployer = Address::from_low_u64(99);
        for who in 1..=3 {
            chain.fund(Address::from_low_u64(who), Wei(10_000 * GWEI));
        }
        let contract = chain.deploy(deployer).expect("deploy should succeed").address;
        let genesis = chain.total_value().expect("genesis fits in u128");

        for op in ops {
            let (from, request) = match op {
                Op::Deposit { who, gwei } => (
                    who,
                    TransactionRequest::new(contract, ContractCall::Deposit)
                        .with_value(Wei(gwei * GWEI)),
                ),
                Op::Withdraw { who, gwei } => (
                    who,
                    TransactionRequest::new(
                        contract,
                        ContractCall::Withdraw { amount: Wei(gwei * GWEI) },
                    ),
                ),
            };
            // Overspending deposits are refused at submission.
            let _ = chain.submit(Address::from_low_u64(from), request);

            prop_assert_eq!(chain.total_value(), Some(genesis));
            let bank = chain.contract(contract).expect("contract deployed");
            prop_assert!(bank.is_consistent());
        }
    }
}
