//! Idempotency Guard
//!
//! At-most-once execution of money-moving commands under client-supplied keys.
//!
//! # Flow
//!
//! ```text
//! parse key ──► try_begin ──► Duplicate(record) ──► replay stored result
//!                   │
//!                   └──► Fresh ──► atomic unit { effects + insert record }
//!                                        │
//!                                        └── unique violation ──► Duplicate
//! ```
//!
//! Records exist only for committed commands. A rejected command leaves no
//! record, so the same key can be resubmitted once the cause is fixed.

pub mod guard;
pub mod key;
pub mod record;

pub use guard::{BeginOutcome, IdempotencyGuard, IdempotencyStore};
pub use key::{CommandKind, IdempotencyKey};
pub use record::IdempotencyRecord;
