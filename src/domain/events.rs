use serde::{Deserialize, Serialize};

use crate::domain::types::{Address, Wei};

/// Log entries emitted once per successful state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    Deposit {
        account: Address,
        amount: Wei,
    },
    Withdrawal {
        account: Address,
        amount: Wei,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Deposit { .. } => "Deposit",
            LedgerEvent::Withdrawal { .. } => "Withdrawal",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = LedgerEvent::Deposit {
            account: Address::from_low_u64(1),
            amount: Wei(10),
        };
        let json = serde_json::to_string(&event).expect("failed to serialize event");
        assert_eq!(
            json,
            r#"{"event":"Deposit","account":"0x0000000000000000000000000000000000000001","amount":10}"#
        );
    }

    #[test]
    fn test_event_names() {
        let event = LedgerEvent::OwnershipTransferred {
            previous_owner: Address::from_low_u64(1),
            new_owner: Address::from_low_u64(2),
        };
        assert_eq!(event.name(), "OwnershipTransferred");
    }
}
