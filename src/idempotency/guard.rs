//! Idempotency Guard
//!
//! `try_begin` is a fast-path read: it short-circuits keys that already have a
//! committed record. It is not the source of truth for "first writer wins".
//! That is the uniqueness constraint hit when the record is inserted inside
//! the command's atomic unit, which is why [`IdempotencyGuard::record`] only
//! builds the record and hands it to the unit instead of writing it.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use super::key::{CommandKind, IdempotencyKey};
use super::record::IdempotencyRecord;
use crate::error::LedgerError;

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Committed record for `key`, if any
    async fn find_idempotency(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    /// No record yet, execute the command
    Fresh,
    /// Already executed, return the stored result unchanged
    Duplicate(IdempotencyRecord),
}

pub struct IdempotencyGuard {
    store: Arc<dyn IdempotencyStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn IdempotencyStore>) -> Self {
        Self { store }
    }

    pub async fn try_begin(&self, key: &IdempotencyKey) -> Result<BeginOutcome, LedgerError> {
        Ok(match self.store.find_idempotency(key).await? {
            Some(record) => BeginOutcome::Duplicate(record),
            None => BeginOutcome::Fresh,
        })
    }

    /// Build the record that the command's atomic unit commits.
    pub fn record<Req, Res>(
        &self,
        key: IdempotencyKey,
        command: CommandKind,
        request: &Req,
        result: &Res,
    ) -> Result<IdempotencyRecord, LedgerError>
    where
        Req: Serialize,
        Res: Serialize,
    {
        Ok(IdempotencyRecord {
            key,
            command,
            request: serde_json::to_value(request)?,
            result: serde_json::to_value(result)?,
            created_at: Utc::now(),
        })
    }

    /// Decode the stored result of a duplicate.
    ///
    /// A key first used for a different command fails with `InvalidKey`. A
    /// different payload under the same key is a caller contract violation:
    /// the stored result wins and the mismatch is logged.
    pub fn replay<Req, Res>(
        &self,
        record: &IdempotencyRecord,
        command: CommandKind,
        request: &Req,
    ) -> Result<Res, LedgerError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        if record.command != command {
            warn!(
                key = %record.key,
                stored = %record.command,
                requested = %command,
                "Idempotency key reused for a different command"
            );
            return Err(LedgerError::InvalidKey(format!(
                "{} already used for a {} command",
                record.key, record.command
            )));
        }

        if serde_json::to_value(request)? != record.request {
            warn!(
                key = %record.key,
                "Idempotency key reused with a different payload, replaying stored result"
            );
        }

        Ok(serde_json::from_value(record.result.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Echo {
        n: u32,
    }

    fn guard() -> (IdempotencyGuard, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (IdempotencyGuard::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_unknown_key_is_fresh() {
        let (guard, _) = guard();
        let outcome = guard.try_begin(&IdempotencyKey::generate()).await.unwrap();
        assert_eq!(outcome, BeginOutcome::Fresh);
    }

    #[tokio::test]
    async fn test_committed_key_is_duplicate() {
        let (guard, store) = guard();
        let key = IdempotencyKey::generate();
        let record = guard
            .record(key, CommandKind::Movement, &Echo { n: 1 }, &Echo { n: 2 })
            .unwrap();
        store.insert_record_for_test(record.clone()).await;

        match guard.try_begin(&key).await.unwrap() {
            BeginOutcome::Duplicate(stored) => assert_eq!(stored, record),
            BeginOutcome::Fresh => panic!("expected duplicate"),
        }
    }

    #[test]
    fn test_replay_returns_stored_result() {
        let (guard, _) = guard();
        let record = guard
            .record(
                IdempotencyKey::generate(),
                CommandKind::Transfer,
                &Echo { n: 1 },
                &Echo { n: 42 },
            )
            .unwrap();

        let result: Echo = guard
            .replay(&record, CommandKind::Transfer, &Echo { n: 1 })
            .unwrap();
        assert_eq!(result, Echo { n: 42 });

        // Different payload: stored result still wins
        let result: Echo = guard
            .replay(&record, CommandKind::Transfer, &Echo { n: 9 })
            .unwrap();
        assert_eq!(result, Echo { n: 42 });
    }

    #[test]
    fn test_replay_other_command_is_invalid_key() {
        let (guard, _) = guard();
        let record = guard
            .record(
                IdempotencyKey::generate(),
                CommandKind::Movement,
                &Echo { n: 1 },
                &Echo { n: 2 },
            )
            .unwrap();

        let err = guard
            .replay::<_, Echo>(&record, CommandKind::Transfer, &Echo { n: 1 })
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidKey(_)));
    }
}
