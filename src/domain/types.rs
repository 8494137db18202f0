use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places between wei and ether.
pub const ETHER_DECIMALS: u32 = 18;

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must be 40 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("address contains non-hex characters: {0}")]
    InvalidHex(String),
}

/// 20-byte account identity, written as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Address whose low eight bytes hold `n`; handy for fixtures.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// `0x1234...abcd` form used in headers and log lines.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 40 {
            return Err(AddressParseError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| AddressParseError::InvalidHex(s.to_string()))?;
        Ok(Address(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmountParseError {
    #[error("not a decimal number: {0}")]
    Invalid(#[from] rust_decimal::Error),
    #[error("amount cannot be negative")]
    Negative,
    #[error("amount has more than 18 decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

/// Integer amount of native currency in its smallest unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub fn from_ether(ether: u64) -> Self {
        Wei(u128::from(ether) * WEI_PER_ETHER)
    }

    /// Parses a decimal ether amount such as `"0.4"` into wei.
    pub fn from_ether_str(s: &str) -> Result<Self, AmountParseError> {
        let decimal = Decimal::from_str(s.trim())?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(AmountParseError::Negative);
        }
        let scale = decimal.scale();
        if scale > ETHER_DECIMALS {
            return Err(AmountParseError::TooPrecise);
        }
        let mantissa = decimal.mantissa().unsigned_abs();
        mantissa
            .checked_mul(10u128.pow(ETHER_DECIMALS - scale))
            .map(Wei)
            .ok_or(AmountParseError::Overflow)
    }

    /// Exact ether text, always with at least one decimal (`"1.0"`, `"0.6"`).
    pub fn to_ether_string(self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return format!("{}.0", whole);
        }
        let digits = format!("{:018}", frac);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }

    /// Ether rounded to `dp` decimals, padded (`format_ether(4)` gives `"1.5000"`).
    pub fn format_ether(self, dp: u32) -> String {
        let decimal = i128::try_from(self.0)
            .ok()
            .and_then(|m| Decimal::try_from_i128_with_scale(m, ETHER_DECIMALS).ok());
        match decimal {
            Some(d) => format!(
                "{:.*}",
                dp as usize,
                d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
            ),
            None => self.to_ether_string(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_add(rhs.0).map(Wei)
    }

    pub fn checked_sub(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_sub(rhs.0).map(Wei)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl TryFrom<String> for TxHash {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value.strip_prefix("0x").unwrap_or(&value);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(TxHash(bytes))
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.to_string()
    }
}

/// Contract operation named in a replay script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Withdraw,
    TransferOwnership,
}

impl FromStr for Operation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(Operation::Deposit),
            "withdraw" | "withdrawal" => Ok(Operation::Withdraw),
            "transfer_ownership" | "transferownership" => Ok(Operation::TransferOwnership),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether_to_wei() {
        let wei = Wei::from_ether_str("1.5").expect("failed to parse amount");
        assert_eq!(wei, Wei(1_500_000_000_000_000_000));
        assert_eq!(
            Wei::from_ether_str(" 0.000000000000000001 ").expect("failed to parse amount"),
            Wei(1)
        );
    }

    #[test]
    fn test_parse_ether_rejects_bad_input() {
        assert_eq!(Wei::from_ether_str("-1"), Err(AmountParseError::Negative));
        assert_eq!(
            Wei::from_ether_str("0.0000000000000000001"),
            Err(AmountParseError::TooPrecise)
        );
        assert!(matches!(
            Wei::from_ether_str("abc"),
            Err(AmountParseError::Invalid(_))
        ));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(Wei::from_ether_str("-0"), Ok(Wei::ZERO));
    }

    #[test]
    fn test_ether_string_is_exact() {
        assert_eq!(Wei::from_ether(1).to_ether_string(), "1.0");
        assert_eq!(Wei(600_000_000_000_000_000).to_ether_string(), "0.6");
        assert_eq!(Wei(1).to_ether_string(), "0.000000000000000001");
        assert_eq!(Wei::ZERO.to_ether_string(), "0.0");
    }

    #[test]
    fn test_format_ether_pads_to_precision() {
        assert_eq!(Wei(1_500_000_000_000_000_000).format_ether(4), "1.5000");
        assert_eq!(Wei(123_456_789_000_000_000).format_ether(4), "0.1235");
        assert_eq!(Wei::ZERO.format_ether(2), "0.00");
    }

    #[test]
    fn test_format_ether_rounds_midpoint_up() {
        assert_eq!(Wei(50_000_000_000_000).format_ether(4), "0.0001");
        assert_eq!(Wei(250_000_000_000_000).format_ether(4), "0.0003");
        assert_eq!(Wei(49_999_999_999_999).format_ether(4), "0.0000");
    }

    #[test]
    fn test_address_round_trips_through_text() {
        let text = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        let address: Address = text.parse().expect("failed to parse address");
        assert_eq!(address.to_string(), text);
        let upper: Address = "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266"
            .parse()
            .expect("failed to parse address");
        assert_eq!(upper, address);
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<Address>(),
            Err(AddressParseError::InvalidLength(4))
        );
        assert!(matches!(
            "0xzz9fd6e51aad88f6f4ce6ab8827279cfffb92266".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_short_address() {
        let address: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
            .parse()
            .expect("failed to parse address");
        assert_eq!(address.short(), "0xf39f...2266");
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!(Operation::from_str("deposit"), Ok(Operation::Deposit));
        assert_eq!(Operation::from_str(" WITHDRAW "), Ok(Operation::Withdraw));
        assert_eq!(Operation::from_str("withdrawal"), Ok(Operation::Withdraw));
        assert_eq!(
            Operation::from_str("transfer_ownership"),
            Ok(Operation::TransferOwnership)
        );
        assert!(Operation::from_str("dispute").is_err());
    }
}
