//! Notification sinks
//!
//! The message-bus transport is external; a sink is its delivery contract.
//! `publish` returning `Ok` means the bus accepted the message.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use super::FeeNotification;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Publish failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink name for logging
    fn name(&self) -> &'static str;

    async fn publish(&self, notification: &FeeNotification) -> Result<(), PublishError>;
}

/// In-process bus backed by a bounded tokio channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<FeeNotification>,
}

/// Create a bounded fee channel. The receiver feeds a [`super::FeeNoticeConsumer`].
pub fn fee_channel(buffer: usize) -> (ChannelSink, mpsc::Receiver<FeeNotification>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ChannelSink { tx }, rx)
}

#[async_trait]
impl NotificationSink for ChannelSink {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn publish(&self, notification: &FeeNotification) -> Result<(), PublishError> {
        self.tx
            .send(notification.clone())
            .await
            .map_err(|_| PublishError::Closed)
    }
}

/// Writes every notification to the log and accepts it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, notification: &FeeNotification) -> Result<(), PublishError> {
        info!(
            transfer_id = %notification.transfer_id,
            source = %notification.source_account_id,
            destination = %notification.destination_account_id,
            value = %notification.value,
            fee = ?notification.fee.map(|f| f.to_string()),
            "Fee notification"
        );
        Ok(())
    }
}

/// Mock sink for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSink {
        published: Mutex<Vec<FeeNotification>>,
        fail: Mutex<bool>,
    }

    impl MockSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        pub fn published(&self) -> Vec<FeeNotification> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for MockSink {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn publish(&self, notification: &FeeNotification) -> Result<(), PublishError> {
            if *self.fail.lock().unwrap() {
                return Err(PublishError::Failed("Mock publish failure".to_string()));
            }
            self.published.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
pub use mock::MockSink;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::money::Amount;
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
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = fee_channel(4);
        let n = notification();
        sink.publish(&n).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), n);
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (sink, rx) = fee_channel(4);
        drop(rx);
        assert_eq!(
            sink.publish(&notification()).await.unwrap_err(),
            PublishError::Closed
        );
    }

    #[tokio::test]
    async fn test_mock_sink_failure_toggle() {
        let sink = MockSink::new();
        sink.set_fail(true);
        assert!(sink.publish(&notification()).await.is_err());
        assert!(sink.published().is_empty());

        sink.set_fail(false);
        sink.publish(&notification()).await.unwrap();
        assert_eq!(sink.published().len(), 1);
    }
}
