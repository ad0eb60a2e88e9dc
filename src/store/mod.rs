//! Storage backends
//!
//! Both backends implement every store trait and give the same guarantees for
//! the command units: isolated, all-or-nothing, first key wins.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::account::{AccountStore, NumberAllocator};
use crate::idempotency::IdempotencyStore;
use crate::ledger::LedgerStore;
use crate::notification::{FeeNoticeStore, OutboxStore};

/// Everything the engine needs from one storage backend
pub trait Backend:
    LedgerStore + IdempotencyStore + AccountStore + NumberAllocator + OutboxStore + FeeNoticeStore
{
}

impl<T> Backend for T where
    T: LedgerStore
        + IdempotencyStore
        + AccountStore
        + NumberAllocator
        + OutboxStore
        + FeeNoticeStore
{
}
