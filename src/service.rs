//! Service wiring
//!
//! Builds the directory, coordinator, outbox relay and fee consumer over one
//! storage backend.

use std::sync::Arc;

use crate::account::AccountDirectory;
use crate::config::{LedgerConfig, RelayConfig};
use crate::error::LedgerError;
use crate::notification::{FeeNoticeConsumer, NotificationSink, OutboxRelay};
use crate::store::Backend;
use crate::transfer::{FeePolicy, TransferCoordinator};

pub struct LedgerService {
    pub directory: Arc<AccountDirectory>,
    pub coordinator: Arc<TransferCoordinator>,
    pub relay: Arc<OutboxRelay>,
    pub consumer: Arc<FeeNoticeConsumer>,
}

impl LedgerService {
    pub fn new<B: Backend + 'static>(
        backend: Arc<B>,
        sink: Arc<dyn NotificationSink>,
        ledger: &LedgerConfig,
        relay: RelayConfig,
    ) -> Result<Self, LedgerError> {
        let policy = FeePolicy::from_config(ledger)?;

        let directory = Arc::new(AccountDirectory::new(backend.clone(), backend.clone()));
        let relay = Arc::new(OutboxRelay::new(backend.clone(), sink, relay));
        let coordinator = Arc::new(
            TransferCoordinator::new(backend.clone(), backend.clone(), directory.clone(), policy)
                .with_relay(relay.clone()),
        );
        let consumer = Arc::new(FeeNoticeConsumer::new(backend));

        Ok(Self {
            directory,
            coordinator,
            relay,
            consumer,
        })
    }
}
