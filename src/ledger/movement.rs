//! Movement Types
//!
//! A movement is one immutable credit or debit entry for an account. Balances
//! are never stored; they are folded from the movement log on demand.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::account::AccountId;
use crate::error::LedgerError;
use crate::money::Amount;

/// Movement ID - ULID-based, sortable by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MovementId(ulid::Ulid);

impl MovementId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the inner ULID value
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MovementId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Movement direction
///
/// Stored and exchanged as the single-character tags `C` / `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "C")]
    Credit,
    #[serde(rename = "D")]
    Debit,
}

impl MovementKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Credit => "C",
            MovementKind::Debit => "D",
        }
    }

    /// Parse a boundary token. Accepts `C`/`D` in either case, surrounding
    /// whitespace ignored.
    pub fn parse(token: &str) -> Result<Self, LedgerError> {
        match token.trim() {
            "C" | "c" => Ok(MovementKind::Credit),
            "D" | "d" => Ok(MovementKind::Debit),
            other => Err(LedgerError::InvalidKind(other.to_string())),
        }
    }

    /// Signed contribution of `value` to a balance
    #[inline]
    pub fn signed(&self, value: Decimal) -> Decimal {
        match self {
            MovementKind::Credit => value,
            MovementKind::Debit => -value,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKind::parse(s)
    }
}

/// Ledger entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub account_id: AccountId,
    pub kind: MovementKind,
    pub value: Amount,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn new(account_id: AccountId, kind: MovementKind, value: Amount, at: DateTime<Utc>) -> Self {
        Self {
            id: MovementId::new(),
            account_id,
            kind,
            value,
            created_at: at,
        }
    }

    pub fn credit(account_id: AccountId, value: Amount, at: DateTime<Utc>) -> Self {
        Self::new(account_id, MovementKind::Credit, value, at)
    }

    pub fn debit(account_id: AccountId, value: Amount, at: DateTime<Utc>) -> Self {
        Self::new(account_id, MovementKind::Debit, value, at)
    }

    #[inline]
    pub fn signed_value(&self) -> Decimal {
        self.kind.signed(self.value.value())
    }
}

/// Σ credits − Σ debits. Zero for an empty log.
///
/// Saturates at the decimal range instead of overflowing, so an absurd log
/// still reads and still covers any debit.
pub fn fold_balance<'a, I>(movements: I) -> Decimal
where
    I: IntoIterator<Item = &'a Movement>,
{
    movements
        .into_iter()
        .fold(Decimal::ZERO, |acc, m| acc.saturating_add(m.signed_value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn amount(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn test_kind_parse_case_insensitive() {
        assert_eq!(MovementKind::parse("C").unwrap(), MovementKind::Credit);
        assert_eq!(MovementKind::parse("c").unwrap(), MovementKind::Credit);
        assert_eq!(MovementKind::parse(" d ").unwrap(), MovementKind::Debit);
    }

    #[test]
    fn test_kind_parse_rejects_unknown() {
        assert_eq!(
            MovementKind::parse("X").unwrap_err(),
            LedgerError::InvalidKind("X".into())
        );
        assert!(MovementKind::parse("").is_err());
        assert!(MovementKind::parse("CREDIT").is_err());
    }

    #[test]
    fn test_kind_serde_tags() {
        assert_eq!(serde_json::to_string(&MovementKind::Debit).unwrap(), "\"D\"");
        let kind: MovementKind = serde_json::from_str("\"C\"").unwrap();
        assert_eq!(kind, MovementKind::Credit);
    }

    #[test]
    fn test_movement_id_roundtrip_str() {
        let id = MovementId::new();
        assert_eq!(id.to_string().parse::<MovementId>().unwrap(), id);
    }

    #[test]
    fn test_fold_saturates_instead_of_overflowing() {
        let account = AccountId::new();
        let now = Utc::now();
        let huge = Amount::new_unchecked(Decimal::MAX);
        let log = vec![
            Movement::credit(account, huge, now),
            Movement::credit(account, huge, now),
        ];
        assert_eq!(fold_balance(&log), Decimal::MAX);

        let log = vec![
            Movement::debit(account, huge, now),
            Movement::debit(account, huge, now),
        ];
        assert_eq!(fold_balance(&log), Decimal::MIN);
    }

    #[test]
    fn test_fold_empty_is_zero() {
        assert_eq!(fold_balance(&Vec::<Movement>::new()), Decimal::ZERO);
    }

    #[test]
    fn test_fold_credit_minus_debit() {
        let account = AccountId::new();
        let now = Utc::now();
        let log = vec![
            Movement::credit(account, amount(dec!(200)), now),
            Movement::debit(account, amount(dec!(100)), now),
            Movement::debit(account, amount(dec!(2)), now),
        ];
        assert_eq!(fold_balance(&log), dec!(98));
    }

    #[test]
    fn test_fold_preserves_precision() {
        let account = AccountId::new();
        let now = Utc::now();
        let log = vec![
            Movement::credit(account, amount(dec!(0.1)), now),
            Movement::credit(account, amount(dec!(0.2)), now),
            Movement::debit(account, amount(dec!(0.3)), now),
        ];
        assert_eq!(fold_balance(&log), Decimal::ZERO);
    }

    fn arb_movement() -> impl Strategy<Value = (bool, i64, u32)> {
        // (credit?, units, scale)
        (any::<bool>(), 1i64..1_000_000_000, 0u32..=4)
    }

    proptest! {
        #[test]
        fn prop_fold_equals_credits_minus_debits(entries in prop::collection::vec(arb_movement(), 0..64)) {
            let account = AccountId::new();
            let now = Utc::now();
            let log: Vec<Movement> = entries
                .iter()
                .map(|(credit, units, scale)| {
                    let value = amount(Decimal::new(*units, *scale));
                    if *credit {
                        Movement::credit(account, value, now)
                    } else {
                        Movement::debit(account, value, now)
                    }
                })
                .collect();

            let credits: Decimal = log
                .iter()
                .filter(|m| m.kind == MovementKind::Credit)
                .map(|m| m.value.value())
                .sum();
            let debits: Decimal = log
                .iter()
                .filter(|m| m.kind == MovementKind::Debit)
                .map(|m| m.value.value())
                .sum();

            prop_assert_eq!(fold_balance(&log), credits - debits);
        }
    }
}
