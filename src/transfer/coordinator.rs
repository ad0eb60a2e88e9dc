//! Transfer Coordinator
//!
//! Drives keyed commands through validation, the idempotency guard, the
//! account directory and finally one atomic store unit.
//!
//! Validation runs before any storage access. The directory check before the
//! unit is a fast rejection path only; the store re-checks account state and
//! solvency inside the unit, which is what makes concurrent transfers from the
//! same account safe.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{TransferAttempt, TransferState};
use super::types::{
    BalanceView, CommandOutcome, MovementCommand, MovementReceipt, MovementRequest, Statement,
    TransferCommand, TransferReceipt, TransferRequest,
};
use crate::account::{AccountDirectory, AccountId};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::idempotency::{
    BeginOutcome, CommandKind, IdempotencyGuard, IdempotencyKey, IdempotencyRecord,
    IdempotencyStore,
};
use crate::ledger::{
    Fee, FeeCharge, Ledger, LedgerStore, Movement, MovementKind, MovementUnit, Transfer,
    TransferUnit, UnitOutcome, fold_balance,
};
use crate::money::Amount;
use crate::notification::{FeeNotification, OutboxRelay};

/// Fee and overdraft rules, injected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    /// Fixed fee per transfer, `None` when disabled
    pub fee: Option<Amount>,
    /// Let single-account debits go below zero
    pub allow_negative_balance: bool,
}

impl FeePolicy {
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let fee = if config.transfer_fee == Decimal::ZERO {
            None
        } else {
            Some(Amount::new(config.transfer_fee)?)
        };
        Ok(Self {
            fee,
            allow_negative_balance: config.allow_negative_balance,
        })
    }
}

pub struct TransferCoordinator {
    ledger: Ledger,
    guard: IdempotencyGuard,
    directory: Arc<AccountDirectory>,
    relay: Option<Arc<OutboxRelay>>,
    policy: FeePolicy,
}

impl TransferCoordinator {
    pub fn new(
        ledger_store: Arc<dyn LedgerStore>,
        idempotency_store: Arc<dyn IdempotencyStore>,
        directory: Arc<AccountDirectory>,
        policy: FeePolicy,
    ) -> Self {
        Self {
            ledger: Ledger::new(ledger_store),
            guard: IdempotencyGuard::new(idempotency_store),
            directory,
            relay: None,
            policy,
        }
    }

    /// Publish notifications immediately after commit instead of waiting for
    /// the relay's next scan
    pub fn with_relay(mut self, relay: Arc<OutboxRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn policy(&self) -> FeePolicy {
        self.policy
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Move `value` from source to destination, charging the configured fee
    /// to the source.
    ///
    /// # Errors
    /// - `InvalidValue`, `InvalidKey`, `SameAccount`: rejected before storage
    /// - `InvalidAccount`: source or destination missing or inactive
    /// - `InsufficientBalance`: source balance below value + fee
    /// - `StorageFailure`: nothing written, retry with the same key
    pub async fn transfer(
        &self,
        req: TransferRequest,
    ) -> Result<CommandOutcome<TransferReceipt>, LedgerError> {
        let mut attempt = TransferAttempt::new();
        let result = self.run_transfer(&req, &mut attempt).await;

        match &result {
            Ok(outcome) => debug!(
                transfer_id = %outcome.receipt().transfer_id,
                trail = %attempt,
                "Transfer finished"
            ),
            Err(e) => {
                attempt.reject(e.code());
                if e.is_retryable() {
                    warn!(key = %req.idempotency_key, error = %e, trail = %attempt, "Transfer failed");
                } else {
                    debug!(key = %req.idempotency_key, error = %e, trail = %attempt, "Transfer rejected");
                }
            }
        }
        result
    }

    async fn run_transfer(
        &self,
        req: &TransferRequest,
        attempt: &mut TransferAttempt,
    ) -> Result<CommandOutcome<TransferReceipt>, LedgerError> {
        // === Validation, no storage access ===
        let value = Amount::new(req.value)?;
        let key = IdempotencyKey::parse(&req.idempotency_key)?;
        if req.source == req.destination {
            return Err(LedgerError::SameAccount);
        }
        let command = TransferCommand {
            source: req.source,
            destination: req.destination,
            value,
        };

        // === Idempotency fast path ===
        if let BeginOutcome::Duplicate(record) = self.guard.try_begin(&key).await? {
            let outcome: CommandOutcome<TransferReceipt> =
                self.replayed(&record, CommandKind::Transfer, &command)?;
            attempt.advance(TransferState::KeyChecked);
            attempt.advance(TransferState::Committed);
            return Ok(outcome);
        }
        attempt.advance(TransferState::KeyChecked);

        // === Directory pre-check ===
        for account_id in [req.source, req.destination] {
            if self.directory.get_active_account(account_id).await?.is_none() {
                return self
                    .reject_or_replay(&key, CommandKind::Transfer, &command, LedgerError::InvalidAccount)
                    .await;
            }
        }

        // === Atomic unit ===
        let now = Utc::now();
        let transfer_id = key.as_uuid();
        let debit = Movement::debit(req.source, value, now);
        let credit = Movement::credit(req.destination, value, now);
        let fee = self.policy.fee.map(|fee_value| FeeCharge {
            movement: Movement::debit(req.source, fee_value, now),
            fee: Fee {
                id: Uuid::new_v4(),
                transfer_id,
                account_id: req.source,
                value: fee_value,
                created_at: now,
            },
        });

        let receipt = TransferReceipt {
            transfer_id,
            source_account_id: req.source,
            destination_account_id: req.destination,
            value,
            fee: self.policy.fee,
            debit_movement_id: debit.id,
            credit_movement_id: credit.id,
            fee_movement_id: fee.as_ref().map(|charge| charge.movement.id),
            created_at: now,
        };
        let notification = FeeNotification {
            transfer_id,
            source_account_id: req.source,
            destination_account_id: req.destination,
            value,
            fee: self.policy.fee,
            created_at: now,
        };

        let unit = TransferUnit {
            record: self
                .guard
                .record(key, CommandKind::Transfer, &command, &receipt)?,
            transfer: Transfer {
                id: transfer_id,
                source_account_id: req.source,
                destination_account_id: req.destination,
                value,
                created_at: now,
            },
            debit,
            credit,
            fee,
            notification: notification.clone(),
        };

        match self.ledger.store().commit_transfer(unit).await? {
            UnitOutcome::Committed => {
                attempt.commit_unit(receipt.fee.is_some());
                info!(
                    transfer_id = %transfer_id,
                    source = %req.source,
                    destination = %req.destination,
                    value = %value,
                    fee = ?receipt.fee.map(|f| f.to_string()),
                    "Transfer committed"
                );

                if let Some(relay) = &self.relay {
                    relay.dispatch(&notification).await;
                }
                Ok(CommandOutcome::Committed(receipt))
            }
            UnitOutcome::Duplicate(record) => {
                let outcome: CommandOutcome<TransferReceipt> =
                    self.replayed(&record, CommandKind::Transfer, &command)?;
                attempt.advance(TransferState::Committed);
                Ok(outcome)
            }
        }
    }

    /// Record a single credit or debit on one account.
    ///
    /// Debits are checked against the balance unless the policy allows
    /// negative balances.
    pub async fn record_movement(
        &self,
        req: MovementRequest,
    ) -> Result<CommandOutcome<MovementReceipt>, LedgerError> {
        let result = self.run_movement(&req).await;
        if let Err(e) = &result {
            if e.is_retryable() {
                warn!(key = %req.idempotency_key, error = %e, "Movement failed");
            } else {
                debug!(key = %req.idempotency_key, error = %e, "Movement rejected");
            }
        }
        result
    }

    async fn run_movement(
        &self,
        req: &MovementRequest,
    ) -> Result<CommandOutcome<MovementReceipt>, LedgerError> {
        let value = Amount::new(req.value)?;
        let kind = MovementKind::parse(&req.kind)?;
        let key = IdempotencyKey::parse(&req.idempotency_key)?;
        let command = MovementCommand {
            account_id: req.account_id,
            kind,
            value,
        };

        if let BeginOutcome::Duplicate(record) = self.guard.try_begin(&key).await? {
            return self.replayed(&record, CommandKind::Movement, &command);
        }

        if self
            .directory
            .get_active_account(req.account_id)
            .await?
            .is_none()
        {
            return self
                .reject_or_replay(&key, CommandKind::Movement, &command, LedgerError::InvalidAccount)
                .await;
        }

        let movement = Movement::new(req.account_id, kind, value, Utc::now());
        let receipt = MovementReceipt::from(&movement);
        let unit = MovementUnit {
            record: self
                .guard
                .record(key, CommandKind::Movement, &command, &receipt)?,
            movement,
            enforce_funds: kind == MovementKind::Debit && !self.policy.allow_negative_balance,
        };

        match self.ledger.store().commit_movement(unit).await? {
            UnitOutcome::Committed => {
                info!(
                    movement_id = %receipt.movement_id,
                    account_id = %receipt.account_id,
                    kind = %kind,
                    value = %value,
                    "Movement committed"
                );
                Ok(CommandOutcome::Committed(receipt))
            }
            UnitOutcome::Duplicate(record) => {
                self.replayed(&record, CommandKind::Movement, &command)
            }
        }
    }

    fn replayed<Req, Res>(
        &self,
        record: &IdempotencyRecord,
        command: CommandKind,
        request: &Req,
    ) -> Result<CommandOutcome<Res>, LedgerError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let result = self.guard.replay(record, command, request)?;
        warn!(key = %record.key, command = %command, "Duplicate key, replaying stored result");
        Ok(CommandOutcome::Replayed(result))
    }

    /// A pre-unit rejection may race a concurrent commit under the same key.
    /// If that commit landed, the command already happened: replay it.
    async fn reject_or_replay<Req, Res>(
        &self,
        key: &IdempotencyKey,
        command: CommandKind,
        request: &Req,
        rejection: LedgerError,
    ) -> Result<CommandOutcome<Res>, LedgerError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        match self.guard.try_begin(key).await? {
            BeginOutcome::Duplicate(record) => self.replayed(&record, command, request),
            BeginOutcome::Fresh => Err(rejection),
        }
    }

    /// Stored receipt of a committed transfer, for callers whose request was
    /// cancelled or timed out and need to know whether it landed.
    pub async fn recorded_transfer(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<TransferReceipt>, LedgerError> {
        self.recorded(idempotency_key, CommandKind::Transfer).await
    }

    /// Stored receipt of a committed movement, see [`Self::recorded_transfer`]
    pub async fn recorded_movement(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<MovementReceipt>, LedgerError> {
        self.recorded(idempotency_key, CommandKind::Movement).await
    }

    async fn recorded<T: DeserializeOwned>(
        &self,
        idempotency_key: &str,
        command: CommandKind,
    ) -> Result<Option<T>, LedgerError> {
        let key = IdempotencyKey::parse(idempotency_key)?;
        match self.guard.try_begin(&key).await? {
            BeginOutcome::Fresh => Ok(None),
            BeginOutcome::Duplicate(record) => {
                if record.command != command {
                    return Err(LedgerError::InvalidKey(format!(
                        "{} belongs to a {} command",
                        key, record.command
                    )));
                }
                Ok(Some(serde_json::from_value(record.result)?))
            }
        }
    }

    /// Balance snapshot. Inactive accounts stay readable.
    pub async fn balance_of(&self, account_id: AccountId) -> Result<BalanceView, LedgerError> {
        let account = self
            .directory
            .account(account_id)
            .await?
            .ok_or(LedgerError::InvalidAccount)?;
        let balance = self.ledger.balance(account_id).await?;
        Ok(BalanceView::new(&account, balance, Utc::now()))
    }

    /// Account header and full movement history, newest first
    pub async fn statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        let account = self
            .directory
            .account(account_id)
            .await?
            .ok_or(LedgerError::InvalidAccount)?;
        let movements = self.ledger.movements(account_id).await?;
        // Balance from the same read, so header and lines agree
        let balance = fold_balance(&movements);
        Ok(Statement {
            account: BalanceView::new(&account, balance, Utc::now()),
            movements,
        })
    }

    pub async fn transfer_by_id(&self, transfer_id: Uuid) -> Result<Option<Transfer>, LedgerError> {
        self.ledger.transfer(transfer_id).await
    }

    pub async fn fees(&self, account_id: AccountId) -> Result<Vec<Fee>, LedgerError> {
        self.ledger.fees(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_policy_from_config() {
        let policy = FeePolicy::from_config(&LedgerConfig::default()).unwrap();
        assert_eq!(policy.fee.map(|f| f.value()), Some(dec!(2)));
        assert!(!policy.allow_negative_balance);
    }

    #[test]
    fn test_zero_fee_disables_fee() {
        let config = LedgerConfig {
            transfer_fee: Decimal::ZERO,
            allow_negative_balance: true,
        };
        let policy = FeePolicy::from_config(&config).unwrap();
        assert_eq!(policy.fee, None);
        assert!(policy.allow_negative_balance);
    }

    #[test]
    fn test_negative_fee_rejected() {
        let config = LedgerConfig {
            transfer_fee: dec!(-1),
            allow_negative_balance: false,
        };
        assert_eq!(
            FeePolicy::from_config(&config).unwrap_err(),
            LedgerError::InvalidValue
        );
    }
}
