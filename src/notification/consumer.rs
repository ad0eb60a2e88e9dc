//! Fee notice consumer
//!
//! Downstream side of the pipeline. The fee itself is charged synchronously in
//! the transfer's unit; this consumer keeps the audit trail of notices and
//! must apply each `transfer_id` at most once, since the channel redelivers.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{FeeNotification, FeeNoticeStore};
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeOutcome {
    Applied,
    AlreadyProcessed,
}

pub struct FeeNoticeConsumer {
    store: Arc<dyn FeeNoticeStore>,
}

impl FeeNoticeConsumer {
    pub fn new(store: Arc<dyn FeeNoticeStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, notification: &FeeNotification) -> Result<NoticeOutcome, LedgerError> {
        if self.store.record_fee_notice(notification).await? {
            info!(
                transfer_id = %notification.transfer_id,
                account_id = %notification.source_account_id,
                "Fee notice applied"
            );
            Ok(NoticeOutcome::Applied)
        } else {
            debug!(
                transfer_id = %notification.transfer_id,
                "Fee notice redelivered, ignoring"
            );
            Ok(NoticeOutcome::AlreadyProcessed)
        }
    }

    /// Drain `rx` until every sender is dropped. Returns the number applied.
    pub async fn run(&self, mut rx: mpsc::Receiver<FeeNotification>) -> usize {
        let mut applied = 0;
        while let Some(notification) = rx.recv().await {
            match self.handle(&notification).await {
                Ok(NoticeOutcome::Applied) => applied += 1,
                Ok(NoticeOutcome::AlreadyProcessed) => {}
                Err(e) => error!(
                    transfer_id = %notification.transfer_id,
                    error = %e,
                    "Failed to apply fee notice"
                ),
            }
        }
        debug!(applied = applied, "Fee notice consumer stopped");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::money::Amount;
    use crate::notification::sink::{NotificationSink, fee_channel};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn notification() -> FeeNotification {
        FeeNotification {
            transfer_id: Uuid::new_v4(),
            source_account_id: AccountId::new(),
            destination_account_id: AccountId::new(),
            value: Amount::new(dec!(100)).unwrap(),
            fee: Some(Amount::new(dec!(2)).unwrap()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_redelivery_is_ignored() {
        let consumer = FeeNoticeConsumer::new(Arc::new(MemoryStore::new()));
        let n = notification();

        assert_eq!(consumer.handle(&n).await.unwrap(), NoticeOutcome::Applied);
        assert_eq!(
            consumer.handle(&n).await.unwrap(),
            NoticeOutcome::AlreadyProcessed
        );
        assert_eq!(
            consumer.handle(&notification()).await.unwrap(),
            NoticeOutcome::Applied
        );
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let consumer = FeeNoticeConsumer::new(Arc::new(MemoryStore::new()));
        let (sink, rx) = fee_channel(8);

        let n = notification();
        sink.publish(&n).await.unwrap();
        sink.publish(&n).await.unwrap();
        sink.publish(&notification()).await.unwrap();
        drop(sink);

        assert_eq!(consumer.run(rx).await, 2);
    }
}
