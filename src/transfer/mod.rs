//! Transfer Orchestrator
//!
//! Keyed money-moving commands: account-to-account transfers with a fixed fee
//! and single-account deposits / withdrawals.
//!
//! # State Machine
//!
//! ```text
//! RECEIVED → KEY_CHECKED → BALANCE_CHECKED → MOVEMENTS_WRITTEN → TRANSFER_RECORDED → FEE_APPLIED → COMMITTED
//!     ↓           ↓
//!  REJECTED    REJECTED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Validate first**: value, kind, key and self-transfer are checked before any storage access
//! 2. **One unit**: movements, transfer, fee, outbox row and idempotency record commit together or not at all
//! 3. **Check inside the unit**: solvency and account state are re-read under lock in the unit
//! 4. **Records only for commits**: a rejected command leaves the key unused

pub mod coordinator;
pub mod state;
pub mod types;


// Re-exports for convenience
pub use coordinator::{FeePolicy, TransferCoordinator};
pub use state::{TransferAttempt, TransferState};
pub use types::{
    BalanceView, CommandOutcome, MovementReceipt, MovementRequest, Statement, TransferReceipt,
    TransferRequest,
};
