//! Command, receipt and view types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{Account, AccountId, AccountNumber, TaxId};
use crate::ledger::{Movement, MovementId, MovementKind};
use crate::money::Amount;

/// Transfer command as received from the boundary, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: AccountId,
    pub destination: AccountId,
    pub value: Decimal,
    pub idempotency_key: String,
}

/// Deposit / withdrawal command as received from the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub account_id: AccountId,
    /// `C` or `D`, any case
    pub kind: String,
    pub value: Decimal,
    pub idempotency_key: String,
}

/// Validated transfer payload, stored as the idempotency request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TransferCommand {
    pub source: AccountId,
    pub destination: AccountId,
    pub value: Amount,
}

/// Validated movement payload, stored as the idempotency request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MovementCommand {
    pub account_id: AccountId,
    pub kind: MovementKind,
    pub value: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub value: Amount,
    pub fee: Option<Amount>,
    pub debit_movement_id: MovementId,
    pub credit_movement_id: MovementId,
    pub fee_movement_id: Option<MovementId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReceipt {
    pub movement_id: MovementId,
    pub account_id: AccountId,
    pub kind: MovementKind,
    pub value: Amount,
    pub created_at: DateTime<Utc>,
}

impl From<&Movement> for MovementReceipt {
    fn from(movement: &Movement) -> Self {
        Self {
            movement_id: movement.id,
            account_id: movement.account_id,
            kind: movement.kind,
            value: movement.value,
            created_at: movement.created_at,
        }
    }
}

/// Result of a keyed command
///
/// `Replayed` carries the result stored by the first execution, unchanged.
/// Nothing was written by the call that returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome<T> {
    Committed(T),
    Replayed(T),
}

impl<T> CommandOutcome<T> {
    #[inline]
    pub fn is_replay(&self) -> bool {
        matches!(self, CommandOutcome::Replayed(_))
    }

    pub fn receipt(&self) -> &T {
        match self {
            CommandOutcome::Committed(t) | CommandOutcome::Replayed(t) => t,
        }
    }

    pub fn into_receipt(self) -> T {
        match self {
            CommandOutcome::Committed(t) | CommandOutcome::Replayed(t) => t,
        }
    }
}

/// Balance snapshot of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceView {
    pub account_id: AccountId,
    pub number: AccountNumber,
    pub name: String,
    pub tax_id: TaxId,
    pub active: bool,
    pub balance: Decimal,
    pub as_of: DateTime<Utc>,
}

impl BalanceView {
    pub fn new(account: &Account, balance: Decimal, as_of: DateTime<Utc>) -> Self {
        Self {
            account_id: account.id,
            number: account.number,
            name: account.name.clone(),
            tax_id: account.tax_id.clone(),
            active: account.active,
            balance,
            as_of,
        }
    }
}

/// Account header plus its movements, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub account: BalanceView,
    pub movements: Vec<Movement>,
}
