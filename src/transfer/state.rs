//! Transfer FSM State Definitions
//!
//! ```text
//! RECEIVED → KEY_CHECKED → BALANCE_CHECKED → MOVEMENTS_WRITTEN → TRANSFER_RECORDED → FEE_APPLIED → COMMITTED
//!                 │                                                      │
//!                 └──── duplicate key: COMMITTED (replayed)              └──── no fee: COMMITTED
//!
//! any non-terminal state → REJECTED(reason)
//! ```
//!
//! Everything from BALANCE_CHECKED to COMMITTED happens inside one atomic
//! unit, so an observer only ever sees KEY_CHECKED followed by COMMITTED or
//! REJECTED. The trail still records each step for diagnostics.

use std::fmt;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Command accepted for validation
    Received,

    /// Key parsed and not yet committed
    KeyChecked,

    /// Source holds value + fee
    BalanceChecked,

    /// Debit and credit appended
    MovementsWritten,

    TransferRecorded,

    /// Fee debit and fee record appended
    FeeApplied,

    /// Terminal: unit committed (or replayed)
    Committed,

    /// Terminal: nothing was written
    Rejected,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::Rejected)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Received => "RECEIVED",
            TransferState::KeyChecked => "KEY_CHECKED",
            TransferState::BalanceChecked => "BALANCE_CHECKED",
            TransferState::MovementsWritten => "MOVEMENTS_WRITTEN",
            TransferState::TransferRecorded => "TRANSFER_RECORDED",
            TransferState::FeeApplied => "FEE_APPLIED",
            TransferState::Committed => "COMMITTED",
            TransferState::Rejected => "REJECTED",
        }
    }

    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        match (self, next) {
            (from, Rejected) => !from.is_terminal(),
            (Received, KeyChecked)
            | (KeyChecked, BalanceChecked)
            | (KeyChecked, Committed)
            | (BalanceChecked, MovementsWritten)
            | (MovementsWritten, TransferRecorded)
            | (TransferRecorded, FeeApplied)
            | (TransferRecorded, Committed)
            | (FeeApplied, Committed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pass of a command through the FSM
#[derive(Debug, Clone)]
pub struct TransferAttempt {
    trail: Vec<TransferState>,
    rejection: Option<&'static str>,
}

impl TransferAttempt {
    pub fn new() -> Self {
        Self {
            trail: vec![TransferState::Received],
            rejection: None,
        }
    }

    #[inline]
    pub fn state(&self) -> TransferState {
        self.trail
            .last()
            .copied()
            .unwrap_or(TransferState::Received)
    }

    /// Move to `next`. Illegal transitions are a bug in the caller and are
    /// logged and ignored.
    pub fn advance(&mut self, next: TransferState) -> bool {
        let current = self.state();
        if !current.can_transition_to(next) {
            error!(from = %current, to = %next, "Illegal transfer state transition");
            debug_assert!(false, "illegal transition {} -> {}", current, next);
            return false;
        }
        self.trail.push(next);
        true
    }

    /// Walk the steps the atomic unit performed
    pub fn commit_unit(&mut self, fee_applied: bool) {
        self.advance(TransferState::BalanceChecked);
        self.advance(TransferState::MovementsWritten);
        self.advance(TransferState::TransferRecorded);
        if fee_applied {
            self.advance(TransferState::FeeApplied);
        }
        self.advance(TransferState::Committed);
    }

    /// Record a rejection with its error code. No-op once terminal.
    pub fn reject(&mut self, code: &'static str) {
        if self.state().is_terminal() {
            return;
        }
        if self.advance(TransferState::Rejected) {
            self.rejection = Some(code);
        }
    }

    pub fn trail(&self) -> &[TransferState] {
        &self.trail
    }

    pub fn rejection(&self) -> Option<&'static str> {
        self.rejection
    }
}

impl Default for TransferAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for state in &self.trail {
            if !first {
                write!(f, " -> ")?;
            }
            first = false;
            write!(f, "{}", state)?;
        }
        if let Some(code) = self.rejection {
            write!(f, "({})", code)?;
        }
        Ok(())
    }
}
