//! Account Directory
//!
//! Typed account records, registration input validation, credential hashing,
//! number allocation and the directory service the transfer coordinator
//! consults for existence and active state.

pub mod allocator;
pub mod credential;
pub mod directory;
pub mod models;
pub mod repository;
pub mod validation;

// Re-export commonly used types
pub use allocator::{NumberAllocator, RandomAllocator};
pub use credential::Credential;
pub use directory::{AccountDirectory, RegisterAccount};
pub use models::{Account, AccountId, AccountNumber};
pub use repository::{AccountStore, UNIQUE_ACCOUNT_NUMBER, UNIQUE_TAX_ID};
pub use validation::{HolderName, TaxId, ValidationError};
