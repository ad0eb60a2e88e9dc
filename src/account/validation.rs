//! Input validation for account registration
//!
//! Validated types for the holder name and the tax id (Brazilian CPF).
//! All fields are private to force validation through the public API.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Validation Errors
// ============================================================================

/// Validation errors for registration input
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Tax id check digits do not match")]
    InvalidCheckDigits,
}

// ============================================================================
// TaxId - Validated CPF (Private Fields)
// ============================================================================

/// Validated tax id, stored as its 11 digits without punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl TaxId {
    /// Number of digits in a CPF
    pub const LEN: usize = 11;

    /// Create a new validated TaxId
    ///
    /// # Validation Rules
    /// - Punctuation is stripped (`529.982.247-25` == `52998224725`)
    /// - Exactly 11 digits remain
    /// - Not a repetition of one digit (`111.111.111-11` is rejected)
    /// - Both mod-11 check digits match
    ///
    /// # Examples
    /// ```
    /// use ledger_engine::account::validation::TaxId;
    ///
    /// let cpf = TaxId::new("529.982.247-25").unwrap();
    /// assert_eq!(cpf.as_str(), "52998224725");
    ///
    /// assert!(TaxId::new("529.982.247-24").is_err()); // wrong check digit
    /// ```
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != Self::LEN {
            return Err(ValidationError::InvalidLength {
                field: "tax_id",
                min: Self::LEN,
                max: Self::LEN,
                actual: digits.len(),
            });
        }

        if !raw
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == ' ')
        {
            return Err(ValidationError::InvalidFormat {
                field: "tax_id",
                value: raw.to_string(),
                expected: "digits with optional '.', '-' separators",
            });
        }

        if digits.iter().all(|d| *d == digits[0]) {
            return Err(ValidationError::InvalidFormat {
                field: "tax_id",
                value: raw.to_string(),
                expected: "not a single repeated digit",
            });
        }

        if check_digit(&digits[..9]) != digits[9] || check_digit(&digits[..10]) != digits[10] {
            return Err(ValidationError::InvalidCheckDigits);
        }

        Ok(Self(digits.iter().map(|d| char::from(b'0' + *d as u8)).collect()))
    }

    /// Get the validated digits as &str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Random well-formed tax id, for fixtures and seeding
    pub fn random() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        loop {
            let mut digits: Vec<u32> = (0..9).map(|_| rng.gen_range(0..10)).collect();
            digits.push(check_digit(&digits));
            digits.push(check_digit(&digits));
            if digits.iter().any(|d| *d != digits[0]) {
                return Self(digits.iter().map(|d| char::from(b'0' + *d as u8)).collect());
            }
        }
    }
}

/// Mod-11 check digit over a weighted prefix (weights count down to 2).
fn check_digit(prefix: &[u32]) -> u32 {
    let weight_start = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TaxId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaxId::new(&value)
    }
}

impl From<TaxId> for String {
    fn from(tax_id: TaxId) -> Self {
        tax_id.0
    }
}

// ============================================================================
// HolderName - Validated Display Name (Private Fields)
// ============================================================================

/// Validated account holder name (trimmed, 1-100 characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HolderName(String);

impl HolderName {
    pub const MAX_LEN: usize = 100;

    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let len = name.chars().count();
        if len == 0 || len > Self::MAX_LEN {
            return Err(ValidationError::InvalidLength {
                field: "name",
                min: 1,
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        if name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidFormat {
                field: "name",
                value: name.to_string(),
                expected: "printable characters",
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
