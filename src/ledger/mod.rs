//! Ledger Store
//!
//! Append-only movement log per account. Balance is always derived:
//! `balance(account) = Σ credits − Σ debits`, zero when the log is empty.
//! Whether the account exists is the Account Directory's question, not ours.

pub mod movement;
pub mod records;
pub mod unit;

pub use movement::{Movement, MovementId, MovementKind, fold_balance};
pub use records::{Fee, Transfer};
pub use unit::{FeeCharge, MovementUnit, TransferUnit, UnitOutcome};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::account::AccountId;
use crate::error::LedgerError;
use crate::money::Amount;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Durable append of a single movement, outside any command unit
    async fn append_movement(&self, movement: &Movement) -> Result<(), LedgerError>;

    async fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError>;

    /// Full scan, newest first
    async fn movements(&self, account_id: AccountId) -> Result<Vec<Movement>, LedgerError>;

    /// Single-account command unit
    async fn commit_movement(&self, unit: MovementUnit) -> Result<UnitOutcome, LedgerError>;

    /// Transfer unit: debit, credit, optional fee, transfer row, outbox row
    async fn commit_transfer(&self, unit: TransferUnit) -> Result<UnitOutcome, LedgerError>;

    async fn transfer(&self, id: Uuid) -> Result<Option<Transfer>, LedgerError>;

    /// Fees paid by an account, newest first
    async fn fees(&self, account_id: AccountId) -> Result<Vec<Fee>, LedgerError>;
}

/// Thin validating front over a [`LedgerStore`]
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// # Errors
    /// - `InvalidValue`: value ≤ 0 or too many fractional digits
    pub async fn append_movement(
        &self,
        account_id: AccountId,
        kind: MovementKind,
        value: Decimal,
        at: DateTime<Utc>,
    ) -> Result<MovementId, LedgerError> {
        let value = Amount::new(value)?;
        let movement = Movement::new(account_id, kind, value, at);
        self.store.append_movement(&movement).await?;

        debug!(
            movement_id = %movement.id,
            account_id = %account_id,
            kind = %kind,
            value = %value,
            "Movement appended"
        );
        Ok(movement.id)
    }

    pub async fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.store.balance(account_id).await
    }

    pub async fn movements(&self, account_id: AccountId) -> Result<Vec<Movement>, LedgerError> {
        self.store.movements(account_id).await
    }

    pub async fn transfer(&self, id: Uuid) -> Result<Option<Transfer>, LedgerError> {
        self.store.transfer(id).await
    }

    pub async fn fees(&self, account_id: AccountId) -> Result<Vec<Fee>, LedgerError> {
        self.store.fees(account_id).await
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_empty_account_balance_is_zero() {
        let ledger = ledger();
        assert_eq!(ledger.balance(AccountId::new()).await.unwrap(), Decimal::ZERO);
        assert!(ledger.movements(AccountId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_rejects_non_positive() {
        let ledger = ledger();
        let account = AccountId::new();

        for value in [dec!(0), dec!(-1), dec!(-0.01)] {
            let err = ledger
                .append_movement(account, MovementKind::Credit, value, Utc::now())
                .await
                .unwrap_err();
            assert_eq!(err, LedgerError::InvalidValue);
        }
        assert!(ledger.movements(account).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_is_credits_minus_debits() {
        let ledger = ledger();
        let account = AccountId::new();
        let now = Utc::now();

        ledger
            .append_movement(account, MovementKind::Credit, dec!(150.25), now)
            .await
            .unwrap();
        ledger
            .append_movement(account, MovementKind::Debit, dec!(50.10), now)
            .await
            .unwrap();
        ledger
            .append_movement(account, MovementKind::Credit, dec!(0.0001), now)
            .await
            .unwrap();

        assert_eq!(ledger.balance(account).await.unwrap(), dec!(100.1501));
    }

    #[tokio::test]
    async fn test_movements_newest_first() {
        let ledger = ledger();
        let account = AccountId::new();
        let now = Utc::now();

        let first = ledger
            .append_movement(account, MovementKind::Credit, dec!(1), now)
            .await
            .unwrap();
        let second = ledger
            .append_movement(account, MovementKind::Credit, dec!(2), now)
            .await
            .unwrap();
        let third = ledger
            .append_movement(account, MovementKind::Debit, dec!(1), now)
            .await
            .unwrap();

        let ids: Vec<MovementId> = ledger
            .movements(account)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[tokio::test]
    async fn test_movements_are_per_account() {
        let ledger = ledger();
        let a = AccountId::new();
        let b = AccountId::new();

        ledger
            .append_movement(a, MovementKind::Credit, dec!(10), Utc::now())
            .await
            .unwrap();

        assert_eq!(ledger.balance(a).await.unwrap(), dec!(10));
        assert_eq!(ledger.balance(b).await.unwrap(), Decimal::ZERO);
    }
}
