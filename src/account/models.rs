//! Data models for the account directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::credential::Credential;
use super::validation::TaxId;

/// Opaque account identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a new random AccountId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Human-facing account number, unique per account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(u32);

impl AccountNumber {
    /// First number handed out by the sequential allocators
    pub const FIRST: u32 = 100_000;

    pub fn new(number: u32) -> Self {
        Self(number)
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account record
///
/// Created at registration, mutated only by (de)activation, never deleted.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub number: AccountNumber,
    pub name: String,
    pub tax_id: TaxId,
    pub credential: Credential,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_roundtrip_str() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_account_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_account_number_display() {
        assert_eq!(AccountNumber::new(123456).to_string(), "123456");
    }
}
