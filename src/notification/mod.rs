//! Fee Notification Pipeline
//!
//! Transfer-completed events leave the engine through an outbox:
//!
//! ```text
//! commit_transfer ──► fee_outbox row (same transaction)
//!                          │
//!        OutboxRelay ──────┴──► NotificationSink::publish ──► mark_delivered
//!                                        │
//!                                        └──► FeeNoticeConsumer (idempotent on transfer_id)
//! ```
//!
//! Delivery is at-least-once: a crash between publish and `mark_delivered`
//! republishes on the next scan. Consumers must tolerate redelivery.

pub mod consumer;
pub mod relay;
pub mod sink;

pub use consumer::{FeeNoticeConsumer, NoticeOutcome};
pub use relay::OutboxRelay;
pub use sink::{ChannelSink, LogSink, NotificationSink, PublishError, fee_channel};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountId;
use crate::error::LedgerError;
use crate::money::Amount;

/// Published once per committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeNotification {
    pub transfer_id: Uuid,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub value: Amount,
    /// Fee charged in the transfer's unit, if any
    pub fee: Option<Amount>,
    pub created_at: DateTime<Utc>,
}

/// Undelivered outbox row
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub notification: FeeNotification,
    pub attempts: u32,
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Undelivered notifications, oldest first
    async fn pending_notifications(&self, limit: usize) -> Result<Vec<OutboxEntry>, LedgerError>;

    /// Returns false if the row was already delivered or does not exist
    async fn mark_delivered(&self, transfer_id: Uuid) -> Result<bool, LedgerError>;

    async fn record_failed_attempt(&self, transfer_id: Uuid, error: &str)
    -> Result<(), LedgerError>;
}

#[async_trait]
pub trait FeeNoticeStore: Send + Sync {
    /// Insert-once on `transfer_id`. Returns false for a redelivery.
    async fn record_fee_notice(&self, notification: &FeeNotification) -> Result<bool, LedgerError>;
}
