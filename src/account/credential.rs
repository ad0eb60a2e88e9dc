//! Credential hashing
//!
//! Secrets are hashed with Argon2id and a per-account random salt. The PHC
//! string already embeds the salt; the salt is also kept in its own column so
//! the stored shape stays "hash + salt".

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::LedgerError;

/// Stored credential of an account
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub hash: String,
    pub salt: String,
}

impl Credential {
    /// Hash a plaintext secret with a fresh salt
    pub fn derive(secret: &str) -> Result<Self, LedgerError> {
        if secret.is_empty() {
            return Err(LedgerError::InvalidCredential);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| LedgerError::StorageFailure(format!("credential hashing failed: {}", e)))?
            .to_string();

        Ok(Self {
            hash,
            salt: salt.as_str().to_string(),
        })
    }

    /// Check a supplied secret against the stored hash.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, secret: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            tracing::error!("Stored credential hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

// Never print hashes
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_and_verify() {
        let credential = Credential::derive("s3cret").unwrap();
        assert!(credential.verify("s3cret"));
        assert!(!credential.verify("wrong"));
    }

    #[test]
    fn test_salt_is_random() {
        let a = Credential::derive("same").unwrap();
        let b = Credential::derive("same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(
            Credential::derive("").unwrap_err(),
            LedgerError::InvalidCredential
        );
    }

    #[test]
    fn test_malformed_hash_does_not_verify() {
        let credential = Credential {
            hash: "not-a-phc-string".into(),
            salt: "x".into(),
        };
        assert!(!credential.verify("anything"));
    }

    #[test]
    fn test_debug_hides_hash() {
        let credential = Credential::derive("s3cret").unwrap();
        assert!(!format!("{:?}", credential).contains(&credential.hash));
    }
}
