//! Account storage contract
//!
//! Implemented by every backend in [`crate::store`].

use async_trait::async_trait;

use super::models::{Account, AccountId, AccountNumber};
use crate::error::LedgerError;

/// Identity fields reported by `DuplicateIdentity`
pub const UNIQUE_TAX_ID: &str = "tax_id";
pub const UNIQUE_ACCOUNT_NUMBER: &str = "account_number";

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with `DuplicateIdentity("tax_id")` or `DuplicateIdentity("account_number")`
    /// when a uniqueness constraint is hit.
    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError>;

    /// Get account by id, whatever its active state
    async fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Get account by its human-facing number
    async fn account_by_number(
        &self,
        number: AccountNumber,
    ) -> Result<Option<Account>, LedgerError>;

    /// Flip the active flag.
    ///
    /// Returns true only when the stored flag actually changed, so setting an
    /// account to the state it is already in returns false.
    async fn set_active(&self, id: AccountId, active: bool) -> Result<bool, LedgerError>;
}
