//! Account Directory
//!
//! Account existence, active state and credential checks consumed by the
//! transfer coordinator, plus registration and (de)activation.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::allocator::NumberAllocator;
use super::credential::Credential;
use super::models::{Account, AccountId, AccountNumber};
use super::repository::{AccountStore, UNIQUE_ACCOUNT_NUMBER};
use super::validation::{HolderName, TaxId};
use crate::error::LedgerError;

/// Attempts before giving up on finding a free account number
const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Registration input
#[derive(Debug, Clone)]
pub struct RegisterAccount {
    pub name: String,
    pub tax_id: String,
    pub secret: String,
}

pub struct AccountDirectory {
    store: Arc<dyn AccountStore>,
    allocator: Arc<dyn NumberAllocator>,
}

impl AccountDirectory {
    pub fn new(store: Arc<dyn AccountStore>, allocator: Arc<dyn NumberAllocator>) -> Self {
        Self { store, allocator }
    }

    /// Register a new active account
    ///
    /// Tax id and account number are unique; a number collision is retried
    /// with a fresh number, a tax id collision is returned to the caller.
    pub async fn register(&self, req: RegisterAccount) -> Result<Account, LedgerError> {
        let name = HolderName::new(&req.name)?;
        let tax_id = TaxId::new(&req.tax_id)?;
        let credential = Credential::derive(&req.secret)?;

        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let account = Account {
                id: AccountId::new(),
                number: self.allocator.allocate().await?,
                name: name.as_str().to_string(),
                tax_id: tax_id.clone(),
                credential: credential.clone(),
                active: true,
                created_at: Utc::now(),
            };

            match self.store.insert_account(&account).await {
                Ok(()) => {
                    info!(
                        account_id = %account.id,
                        number = %account.number,
                        "Account registered"
                    );
                    return Ok(account);
                }
                Err(LedgerError::DuplicateIdentity(field)) if field == UNIQUE_ACCOUNT_NUMBER => {
                    debug!(
                        number = %account.number,
                        attempt = attempt,
                        "Account number taken, allocating another"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Could not allocate a free account number");
        Err(LedgerError::DuplicateIdentity(UNIQUE_ACCOUNT_NUMBER.to_string()))
    }

    /// Account by id if it exists and is active
    pub async fn get_active_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.store.account(id).await?.filter(Account::is_active))
    }

    /// Account by id whatever its state
    pub async fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.store.account(id).await
    }

    pub async fn account_by_number(
        &self,
        number: AccountNumber,
    ) -> Result<Option<Account>, LedgerError> {
        self.store.account_by_number(number).await
    }

    /// Check a supplied secret. Unknown accounts verify as false.
    pub async fn verify_credential(
        &self,
        id: AccountId,
        secret: &str,
    ) -> Result<bool, LedgerError> {
        Ok(self
            .store
            .account(id)
            .await?
            .is_some_and(|account| account.credential.verify(secret)))
    }

    /// Returns true when the flag changed
    pub async fn set_active(&self, id: AccountId, active: bool) -> Result<bool, LedgerError> {
        self.store.set_active(id, active).await
    }

    /// Deactivate after verifying the account's credential
    ///
    /// # Errors
    /// - `InvalidAccount`: account missing or already inactive
    /// - `InvalidCredential`: wrong secret, account left untouched
    pub async fn deactivate(&self, id: AccountId, secret: &str) -> Result<(), LedgerError> {
        let account = self
            .store
            .account(id)
            .await?
            .ok_or(LedgerError::InvalidAccount)?;
        self.deactivate_verified(account, secret).await
    }

    /// Deactivate addressed by account number
    pub async fn deactivate_by_number(
        &self,
        number: AccountNumber,
        secret: &str,
    ) -> Result<(), LedgerError> {
        let account = self
            .store
            .account_by_number(number)
            .await?
            .ok_or(LedgerError::InvalidAccount)?;
        self.deactivate_verified(account, secret).await
    }

    async fn deactivate_verified(&self, account: Account, secret: &str) -> Result<(), LedgerError> {
        if !account.credential.verify(secret) {
            warn!(account_id = %account.id, "Deactivation refused: invalid credential");
            return Err(LedgerError::InvalidCredential);
        }
        if !account.is_active() {
            return Err(LedgerError::InvalidAccount);
        }

        // Conditional update: a concurrent deactivation makes this a no-op
        if !self.store.set_active(account.id, false).await? {
            return Err(LedgerError::InvalidAccount);
        }

        info!(account_id = %account.id, "Account deactivated");
        Ok(())
    }

    /// Reactivate an inactive account
    pub async fn activate(&self, id: AccountId) -> Result<(), LedgerError> {
        if !self.store.set_active(id, true).await? {
            return Err(LedgerError::InvalidAccount);
        }
        info!(account_id = %id, "Account activated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::allocator::RandomAllocator;
    use crate::account::validation::ValidationError;
    use crate::store::MemoryStore;

    fn directory() -> AccountDirectory {
        let store = Arc::new(MemoryStore::new());
        AccountDirectory::new(store.clone(), store)
    }

    fn register_req(tax_id: &str) -> RegisterAccount {
        RegisterAccount {
            name: "Ana Souza".into(),
            tax_id: tax_id.into(),
            secret: "hunter2".into(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_active_account() {
        let directory = directory();
        let account = directory.register(register_req("52998224725")).await.unwrap();

        assert!(account.active);
        assert_eq!(account.number.value(), AccountNumber::FIRST);
        assert_eq!(account.tax_id.as_str(), "52998224725");

        let loaded = directory.get_active_account(account.id).await.unwrap();
        assert_eq!(loaded.unwrap().number, account.number);
    }

    #[tokio::test]
    async fn test_register_assigns_distinct_numbers() {
        let directory = directory();
        let a = directory.register(register_req("52998224725")).await.unwrap();
        let b = directory.register(register_req("11144477735")).await.unwrap();
        assert_ne!(a.number, b.number);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_tax_id() {
        let directory = directory();
        directory.register(register_req("52998224725")).await.unwrap();

        let err = directory
            .register(register_req("529.982.247-25"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateIdentity("tax_id".into()));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_tax_id() {
        let directory = directory();
        let err = directory
            .register(register_req("52998224724"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Validation(ValidationError::InvalidCheckDigits)
        );
    }

    #[tokio::test]
    async fn test_register_gives_up_when_numbers_exhausted() {
        let store = Arc::new(MemoryStore::new());
        // Single-number range: every attempt after the first collides
        let directory = AccountDirectory::new(store, Arc::new(RandomAllocator::new(500, 500)));

        let first = directory.register(register_req("52998224725")).await.unwrap();
        assert_eq!(first.number.value(), 500);

        let err = directory
            .register(register_req("11144477735"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateIdentity("account_number".into()));
    }

    #[tokio::test]
    async fn test_verify_credential() {
        let directory = directory();
        let account = directory.register(register_req("52998224725")).await.unwrap();

        assert!(directory.verify_credential(account.id, "hunter2").await.unwrap());
        assert!(!directory.verify_credential(account.id, "nope").await.unwrap());
        assert!(!directory
            .verify_credential(AccountId::new(), "hunter2")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_deactivate_wrong_credential_keeps_account_active() {
        let directory = directory();
        let account = directory.register(register_req("52998224725")).await.unwrap();

        let err = directory.deactivate(account.id, "wrong").await.unwrap_err();
        assert_eq!(err, LedgerError::InvalidCredential);
        assert!(directory.get_active_account(account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deactivate_then_again_fails() {
        let directory = directory();
        let account = directory.register(register_req("52998224725")).await.unwrap();

        directory.deactivate(account.id, "hunter2").await.unwrap();
        assert!(directory.get_active_account(account.id).await.unwrap().is_none());
        assert!(!directory.account(account.id).await.unwrap().unwrap().active);

        let err = directory.deactivate(account.id, "hunter2").await.unwrap_err();
        assert_eq!(err, LedgerError::InvalidAccount);
    }

    #[tokio::test]
    async fn test_deactivate_unknown_account() {
        let directory = directory();
        let err = directory
            .deactivate(AccountId::new(), "hunter2")
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidAccount);
    }

    #[tokio::test]
    async fn test_deactivate_by_number_and_activate() {
        let directory = directory();
        let account = directory.register(register_req("52998224725")).await.unwrap();

        directory
            .deactivate_by_number(account.number, "hunter2")
            .await
            .unwrap();
        assert!(directory.get_active_account(account.id).await.unwrap().is_none());

        directory.activate(account.id).await.unwrap();
        assert!(directory.get_active_account(account.id).await.unwrap().is_some());

        // Already active
        assert_eq!(
            directory.activate(account.id).await.unwrap_err(),
            LedgerError::InvalidAccount
        );
    }
}
