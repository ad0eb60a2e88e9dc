//! In-memory backend
//!
//! One async mutex guards the whole state. Every unit runs its checks first
//! and mutates only after all of them passed, with no `.await` in between,
//! so a dropped future can never leave a half-applied unit behind.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::account::{
    Account, AccountId, AccountNumber, AccountStore, NumberAllocator, UNIQUE_ACCOUNT_NUMBER,
    UNIQUE_TAX_ID,
};
use crate::error::LedgerError;
use crate::idempotency::{IdempotencyKey, IdempotencyRecord, IdempotencyStore};
use crate::ledger::{
    Fee, LedgerStore, Movement, MovementUnit, Transfer, TransferUnit, UnitOutcome, fold_balance,
};
use crate::notification::{FeeNoticeStore, FeeNotification, OutboxEntry, OutboxStore};

/// Pending outbox row. Removed once delivered.
struct OutboxRow {
    seq: u64,
    entry: OutboxEntry,
    last_error: Option<String>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    by_number: HashMap<AccountNumber, AccountId>,
    by_tax_id: HashMap<String, AccountId>,
    /// Per account, insertion order
    movements: HashMap<AccountId, Vec<Movement>>,
    transfers: HashMap<Uuid, Transfer>,
    fees: Vec<Fee>,
    idempotency: HashMap<IdempotencyKey, IdempotencyRecord>,
    outbox: HashMap<Uuid, OutboxRow>,
    next_outbox_seq: u64,
    fee_notices: HashMap<Uuid, FeeNotification>,
}

impl State {
    fn balance(&self, account_id: AccountId) -> Decimal {
        self.movements
            .get(&account_id)
            .map(|log| fold_balance(log))
            .unwrap_or(Decimal::ZERO)
    }

    fn require_active(&self, account_id: AccountId) -> Result<(), LedgerError> {
        match self.accounts.get(&account_id) {
            Some(account) if account.is_active() => Ok(()),
            _ => Err(LedgerError::InvalidAccount),
        }
    }

    fn push_movement(&mut self, movement: Movement) {
        self.movements
            .entry(movement.account_id)
            .or_default()
            .push(movement);
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
    next_number: AtomicU32,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_number: AtomicU32::new(AccountNumber::FIRST),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Make every following unit fail with `StorageFailure` after its checks,
    /// as a rolled-back transaction would.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> Result<(), LedgerError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(LedgerError::StorageFailure(
                "injected commit failure".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn idempotency_record_count(&self) -> usize {
        self.state.lock().await.idempotency.len()
    }

    #[cfg(test)]
    pub(crate) async fn insert_record_for_test(&self, record: IdempotencyRecord) {
        self.state
            .lock()
            .await
            .idempotency
            .insert(record.key, record);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append_movement(&self, movement: &Movement) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        self.injected_failure()?;
        state.push_movement(movement.clone());
        Ok(())
    }

    async fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self.state.lock().await.balance(account_id))
    }

    async fn movements(&self, account_id: AccountId) -> Result<Vec<Movement>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .get(&account_id)
            .map(|log| log.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit_movement(&self, unit: MovementUnit) -> Result<UnitOutcome, LedgerError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.idempotency.get(&unit.record.key) {
            return Ok(UnitOutcome::Duplicate(existing.clone()));
        }
        state.require_active(unit.movement.account_id)?;
        if let Some(required) = unit.required_balance() {
            if state.balance(unit.movement.account_id) < required {
                return Err(LedgerError::InsufficientBalance);
            }
        }
        self.injected_failure()?;

        state.push_movement(unit.movement);
        state.idempotency.insert(unit.record.key, unit.record);
        Ok(UnitOutcome::Committed)
    }

    async fn commit_transfer(&self, unit: TransferUnit) -> Result<UnitOutcome, LedgerError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.idempotency.get(&unit.record.key) {
            return Ok(UnitOutcome::Duplicate(existing.clone()));
        }
        state.require_active(unit.transfer.source_account_id)?;
        state.require_active(unit.transfer.destination_account_id)?;
        match unit.required_balance() {
            Some(required) if state.balance(unit.transfer.source_account_id) >= required => {}
            _ => return Err(LedgerError::InsufficientBalance),
        }
        self.injected_failure()?;

        let TransferUnit {
            record,
            transfer,
            debit,
            credit,
            fee,
            notification,
        } = unit;

        state.push_movement(debit);
        state.push_movement(credit);
        if let Some(charge) = fee {
            state.push_movement(charge.movement);
            state.fees.push(charge.fee);
        }
        state.transfers.insert(transfer.id, transfer);
        let seq = state.next_outbox_seq;
        state.next_outbox_seq += 1;
        state.outbox.insert(
            notification.transfer_id,
            OutboxRow {
                seq,
                entry: OutboxEntry {
                    notification,
                    attempts: 0,
                },
                last_error: None,
            },
        );
        state.idempotency.insert(record.key, record);
        Ok(UnitOutcome::Committed)
    }

    async fn transfer(&self, id: Uuid) -> Result<Option<Transfer>, LedgerError> {
        Ok(self.state.lock().await.transfers.get(&id).cloned())
    }

    async fn fees(&self, account_id: AccountId) -> Result<Vec<Fee>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .fees
            .iter()
            .rev()
            .filter(|fee| fee.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IdempotencyStore for MemoryStore {
    async fn find_idempotency(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        Ok(self.state.lock().await.idempotency.get(key).cloned())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;

        if state.by_tax_id.contains_key(account.tax_id.as_str()) {
            return Err(LedgerError::DuplicateIdentity(UNIQUE_TAX_ID.to_string()));
        }
        if state.by_number.contains_key(&account.number) {
            return Err(LedgerError::DuplicateIdentity(
                UNIQUE_ACCOUNT_NUMBER.to_string(),
            ));
        }

        state.by_number.insert(account.number, account.id);
        state
            .by_tax_id
            .insert(account.tax_id.as_str().to_string(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn account_by_number(
        &self,
        number: AccountNumber,
    ) -> Result<Option<Account>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .by_number
            .get(&number)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn set_active(&self, id: AccountId, active: bool) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(&id) {
            Some(account) if account.active != active => {
                account.active = active;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl NumberAllocator for MemoryStore {
    async fn allocate(&self) -> Result<AccountNumber, LedgerError> {
        Ok(AccountNumber::new(
            self.next_number.fetch_add(1, Ordering::SeqCst),
        ))
    }
}

#[async_trait]
impl OutboxStore for MemoryStore {
    async fn pending_notifications(&self, limit: usize) -> Result<Vec<OutboxEntry>, LedgerError> {
        let state = self.state.lock().await;
        let mut pending: Vec<&OutboxRow> = state.outbox.values().collect();
        pending.sort_by_key(|row| row.seq);
        Ok(pending
            .into_iter()
            .take(limit)
            .map(|row| row.entry.clone())
            .collect())
    }

    async fn mark_delivered(&self, transfer_id: Uuid) -> Result<bool, LedgerError> {
        Ok(self
            .state
            .lock()
            .await
            .outbox
            .remove(&transfer_id)
            .is_some())
    }

    async fn record_failed_attempt(
        &self,
        transfer_id: Uuid,
        error: &str,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(row) = state.outbox.get_mut(&transfer_id) {
            row.entry.attempts += 1;
            row.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl FeeNoticeStore for MemoryStore {
    async fn record_fee_notice(&self, notification: &FeeNotification) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().await;
        if state.fee_notices.contains_key(&notification.transfer_id) {
            return Ok(false);
        }
        state
            .fee_notices
            .insert(notification.transfer_id, notification.clone());
        Ok(true)
    }
}
