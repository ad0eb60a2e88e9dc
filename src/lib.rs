//! Ledger Engine - Per-account ledgers with exactly-once money movement
//!
//! Balances are derived from an append-only movement log. Deposits,
//! withdrawals and fee-bearing transfers run once per client-supplied
//! idempotency key, each as one atomic storage unit.
//!
//! # Modules
//!
//! - [`money`] - Positive decimal values and boundary parsing
//! - [`error`] - Error taxonomy shared by every command
//! - [`ledger`] - Movement log, balance derivation, atomic units
//! - [`idempotency`] - Idempotency keys, records and the guard
//! - [`account`] - Account directory, registration, credentials
//! - [`transfer`] - Transfer orchestrator and single-account movements
//! - [`notification`] - Fee notification outbox, relay and consumer
//! - [`store`] - In-memory and PostgreSQL backends
//! - [`db`] - PostgreSQL pool and schema
//! - [`service`] - Wiring over one backend

pub mod account;
pub mod config;
pub mod db;
pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod notification;
pub mod service;
pub mod store;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountDirectory, AccountId, AccountNumber, RegisterAccount};
pub use error::LedgerError;
pub use idempotency::IdempotencyKey;
pub use ledger::{Ledger, Movement, MovementKind};
pub use money::Amount;
pub use service::LedgerService;
pub use store::{Backend, MemoryStore, PgStore};
pub use transfer::{
    CommandOutcome, MovementRequest, TransferCoordinator, TransferReceipt, TransferRequest,
};
