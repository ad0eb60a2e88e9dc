use chrono::{DateTime, Utc};
use serde_json::Value;

use super::key::{CommandKind, IdempotencyKey};

/// Outcome of a committed command. Created once per key, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub key: IdempotencyKey,
    pub command: CommandKind,
    pub request: Value,
    pub result: Value,
    pub created_at: DateTime<Utc>,
}
