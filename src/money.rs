//! Money Values
//!
//! Every value that moves through the ledger is a strictly positive
//! [`Decimal`]. [`Amount`] is the only way to obtain one, so a movement,
//! transfer or fee with a zero or negative value cannot be constructed.
//!
//! ## Boundary parsing
//! Clients send values as strings ("100", "12.50"). [`parse_amount`] is strict:
//! - no sign prefix (`+` / `-`)
//! - no dangling dot (`.5`, `5.`)
//! - at most [`MAX_SCALE`] fractional digits (no silent rounding)
//! - at most [`MAX_INTEGER_DIGITS`] integer digits
//!
//! ```
//! use ledger_engine::money::{parse_amount, MoneyError};
//!
//! let value = parse_amount("12.50").unwrap();
//! assert_eq!(value.to_string(), "12.50");
//! assert_eq!(parse_amount("0"), Err(MoneyError::NotPositive));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum fractional digits accepted for a value.
///
/// Matches the scale of the `NUMERIC` columns in PostgreSQL, so a value read
/// back from storage is always identical to the value written.
pub const MAX_SCALE: u32 = 10;

/// Maximum integer digits of a value: `NUMERIC(30, 10)` leaves 20.
pub const MAX_INTEGER_DIGITS: u32 = 20;

/// Exclusive upper bound of a value, `10^MAX_INTEGER_DIGITS`
pub fn value_limit() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(MAX_INTEGER_DIGITS), 0)
}

/// Money conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Value out of range: at most {max_integer_digits} integer digits")]
    OutOfRange { max_integer_digits: u32 },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Strictly positive decimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Validate a decimal as a ledger value.
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value <= Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }
        if value.scale() > MAX_SCALE {
            return Err(MoneyError::PrecisionOverflow {
                provided: value.scale(),
                max: MAX_SCALE,
            });
        }
        if value >= value_limit() {
            return Err(MoneyError::OutOfRange {
                max_integer_digits: MAX_INTEGER_DIGITS,
            });
        }
        Ok(Self(value))
    }

    /// Skips validation, for building out-of-range fixtures
    #[cfg(test)]
    pub(crate) fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Sum of two amounts, `None` when it leaves the value range.
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0
            .checked_add(other.0)
            .and_then(|sum| Amount::new(sum).ok())
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

/// Parse a client-supplied value string into an [`Amount`].
pub fn parse_amount(amount_str: &str) -> Result<Amount, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') {
        return Err(MoneyError::NotPositive);
    }
    if amount_str.starts_with('+') {
        return Err(MoneyError::InvalidFormat("sign prefix not allowed".into()));
    }

    let mut parts = amount_str.split('.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next();
    if parts.next().is_some() {
        return Err(MoneyError::InvalidFormat("multiple decimal points".into()));
    }

    if whole.is_empty() {
        return Err(MoneyError::InvalidFormat(
            "missing leading zero (e.g., use 0.5 instead of .5)".into(),
        ));
    }
    if let Some(frac) = frac {
        if frac.is_empty() {
            return Err(MoneyError::InvalidFormat(
                "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
            ));
        }
        if frac.len() > MAX_SCALE as usize {
            return Err(MoneyError::PrecisionOverflow {
                provided: frac.len() as u32,
                max: MAX_SCALE,
            });
        }
    }

    if !whole
        .chars()
        .chain(frac.unwrap_or_default().chars())
        .all(|c| c.is_ascii_digit())
    {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in '{}'",
            amount_str
        )));
    }

    let decimal = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;

    Amount::new(decimal)
}
