//! Idempotency keys
//!
//! A key is a client-supplied 128-bit token. It is the sole identity of a
//! command in storage: one key, one record, ever.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Parse a boundary token. Empty, missing or malformed keys fail with
    /// `InvalidKey`.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LedgerError::InvalidKey("missing idempotency key".into()));
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| LedgerError::InvalidKey(raw.to_string()))
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random key, for callers that generate their own
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdempotencyKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdempotencyKey::parse(s)
    }
}

/// Command a key was first used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Movement,
    Transfer,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Movement => "MOVEMENT",
            CommandKind::Transfer => "TRANSFER",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "MOVEMENT" => Some(CommandKind::Movement),
            "TRANSFER" => Some(CommandKind::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
