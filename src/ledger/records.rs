use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountId;
use crate::money::Amount;

/// Completed transfer. The id equals the idempotency key it was submitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub value: Amount,
    pub created_at: DateTime<Utc>,
}

/// Fixed charge paid by the source of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub account_id: AccountId,
    pub value: Amount,
    pub created_at: DateTime<Utc>,
}
