//! Atomic units
//!
//! Everything a command writes, assembled up front and handed to the store in
//! one call. The store applies the unit in a single isolated transaction:
//!
//! 1. insert the idempotency record (unique on key; a loser gets `Duplicate`)
//! 2. re-check account state and solvency against committed movements
//! 3. append movements and records
//!
//! A failed check or a storage error rolls the whole unit back.

use rust_decimal::Decimal;

use super::movement::Movement;
use super::records::{Fee, Transfer};
use crate::idempotency::IdempotencyRecord;
use crate::notification::FeeNotification;

#[derive(Debug, Clone)]
pub struct MovementUnit {
    pub record: IdempotencyRecord,
    pub movement: Movement,
    /// Reject a debit that would take the balance below zero
    pub enforce_funds: bool,
}

impl MovementUnit {
    /// Balance the account must hold for the unit to commit
    pub fn required_balance(&self) -> Option<Decimal> {
        (self.enforce_funds && self.movement.signed_value() < Decimal::ZERO)
            .then(|| self.movement.value.value())
    }
}

/// Fee debit and its record, written together
#[derive(Debug, Clone)]
pub struct FeeCharge {
    pub movement: Movement,
    pub fee: Fee,
}

#[derive(Debug, Clone)]
pub struct TransferUnit {
    pub record: IdempotencyRecord,
    pub transfer: Transfer,
    pub debit: Movement,
    pub credit: Movement,
    pub fee: Option<FeeCharge>,
    /// Outbox row, published after commit
    pub notification: FeeNotification,
}

impl TransferUnit {
    /// value + fee, `None` if the sum overflows (no balance can cover it)
    pub fn required_balance(&self) -> Option<Decimal> {
        let fee = self
            .fee
            .as_ref()
            .map(|charge| charge.movement.value.value())
            .unwrap_or(Decimal::ZERO);
        self.debit.value.value().checked_add(fee)
    }

    /// All movements of the unit, in write order
    pub fn movements(&self) -> impl Iterator<Item = &Movement> {
        [&self.debit, &self.credit]
            .into_iter()
            .chain(self.fee.as_ref().map(|charge| &charge.movement))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Committed,
    /// Another unit already committed under the same key
    Duplicate(IdempotencyRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::idempotency::{CommandKind, IdempotencyKey};
    use crate::money::Amount;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn transfer_unit(value: Amount, fee: Option<Amount>) -> TransferUnit {
        let now = Utc::now();
        let (source, destination) = (AccountId::new(), AccountId::new());
        let id = Uuid::new_v4();
        TransferUnit {
            record: IdempotencyRecord {
                key: IdempotencyKey::from_uuid(id),
                command: CommandKind::Transfer,
                request: serde_json::json!({}),
                result: serde_json::json!({}),
                created_at: now,
            },
            transfer: Transfer {
                id,
                source_account_id: source,
                destination_account_id: destination,
                value,
                created_at: now,
            },
            debit: Movement::debit(source, value, now),
            credit: Movement::credit(destination, value, now),
            fee: fee.map(|fee_value| FeeCharge {
                movement: Movement::debit(source, fee_value, now),
                fee: Fee {
                    id: Uuid::new_v4(),
                    transfer_id: id,
                    account_id: source,
                    value: fee_value,
                    created_at: now,
                },
            }),
            notification: FeeNotification {
                transfer_id: id,
                source_account_id: source,
                destination_account_id: destination,
                value,
                fee,
                created_at: now,
            },
        }
    }

    #[test]
    fn test_required_balance_includes_fee() {
        let value = Amount::new(dec!(100)).unwrap();
        let fee = Amount::new(dec!(2)).unwrap();
        assert_eq!(
            transfer_unit(value, Some(fee)).required_balance(),
            Some(dec!(102))
        );
        assert_eq!(transfer_unit(value, None).required_balance(), Some(dec!(100)));
        assert_eq!(transfer_unit(value, Some(fee)).movements().count(), 3);
    }

    #[test]
    fn test_required_balance_overflow_is_none() {
        let huge = Amount::new_unchecked(Decimal::MAX);
        let fee = Amount::new(dec!(2)).unwrap();
        assert_eq!(transfer_unit(huge, Some(fee)).required_balance(), None);
    }

    #[test]
    fn test_movement_unit_requires_funds_for_enforced_debit_only() {
        let now = Utc::now();
        let account = AccountId::new();
        let value = Amount::new(dec!(5)).unwrap();
        let record = transfer_unit(value, None).record;

        let debit = MovementUnit {
            record: record.clone(),
            movement: Movement::debit(account, value, now),
            enforce_funds: true,
        };
        assert_eq!(debit.required_balance(), Some(dec!(5)));

        let credit = MovementUnit {
            movement: Movement::credit(account, value, now),
            ..debit.clone()
        };
        assert_eq!(credit.required_balance(), None);

        let lenient = MovementUnit {
            enforce_funds: false,
            ..debit
        };
        assert_eq!(lenient.required_balance(), None);
    }
}
