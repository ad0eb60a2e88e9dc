//! Outbox Relay
//!
//! Background worker that publishes undelivered fee notifications.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::sink::{NotificationSink, PublishError};
use super::{FeeNotification, OutboxStore};
use crate::config::RelayConfig;
use crate::error::LedgerError;

/// Attempts after which a stuck notification is logged loudly
const STUCK_ATTEMPTS: u32 = 10;

#[derive(Debug, Error)]
enum DeliveryError {
    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Storage(#[from] LedgerError),
}

pub struct OutboxRelay {
    outbox: Arc<dyn OutboxStore>,
    sink: Arc<dyn NotificationSink>,
    config: RelayConfig,
}

impl OutboxRelay {
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        sink: Arc<dyn NotificationSink>,
        config: RelayConfig,
    ) -> Self {
        Self {
            outbox,
            sink,
            config,
        }
    }

    /// Publish one notification right after its transfer committed.
    ///
    /// Best-effort: a failure leaves the row pending for the next scan and is
    /// never reported to the transfer's caller. Returns true when delivered.
    pub async fn dispatch(&self, notification: &FeeNotification) -> bool {
        match self.publish(notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    transfer_id = %notification.transfer_id,
                    sink = self.sink.name(),
                    error = %e,
                    "Immediate notification publish failed, left for relay"
                );
                false
            }
        }
    }

    /// Run the relay loop until `shutdown` flips to true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            scan_interval_ms = self.config.scan_interval_ms,
            batch_size = self.config.batch_size,
            sink = self.sink.name(),
            "Starting outbox relay"
        );

        loop {
            if let Err(e) = self.scan_and_publish().await {
                error!(error = %e, "Outbox scan failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.scan_interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Outbox relay stopped");
    }

    /// Run a single scan. Returns the number of notifications delivered.
    pub async fn scan_and_publish(&self) -> Result<usize, LedgerError> {
        let pending = self
            .outbox
            .pending_notifications(self.config.batch_size)
            .await?;

        if pending.is_empty() {
            debug!("No pending notifications");
            return Ok(0);
        }

        debug!(count = pending.len(), "Publishing pending notifications");

        let mut delivered = 0;
        for entry in &pending {
            if entry.attempts > STUCK_ATTEMPTS {
                warn!(
                    transfer_id = %entry.notification.transfer_id,
                    attempts = entry.attempts,
                    "Notification stuck in outbox"
                );
            }

            match self.publish(&entry.notification).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    error!(
                        transfer_id = %entry.notification.transfer_id,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Failed to publish notification"
                    );
                }
            }
        }

        if delivered > 0 {
            info!(count = delivered, "Notifications delivered this scan");
        }
        Ok(delivered)
    }

    async fn publish(&self, notification: &FeeNotification) -> Result<(), DeliveryError> {
        if let Err(e) = self.sink.publish(notification).await {
            self.outbox
                .record_failed_attempt(notification.transfer_id, &e.to_string())
                .await?;
            return Err(e.into());
        }

        // Already marked by a concurrent dispatch: harmless duplicate publish
        if !self.outbox.mark_delivered(notification.transfer_id).await? {
            debug!(
                transfer_id = %notification.transfer_id,
                "Notification was already marked delivered"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::sink::MockSink;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn relay(store: Arc<MemoryStore>, sink: Arc<MockSink>) -> OutboxRelay {
        OutboxRelay::new(
            store,
            sink,
            RelayConfig {
                scan_interval_ms: 10,
                batch_size: 10,
            },
        )
    }

    #[tokio::test]
    async fn test_empty_outbox_scan() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MockSink::new());
        assert_eq!(relay(store, sink.clone()).scan_and_publish().await.unwrap(), 0);
        assert!(sink.published().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let relay = Arc::new(relay(store, Arc::new(MockSink::new())));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let relay = relay.clone();
            async move { relay.run(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
