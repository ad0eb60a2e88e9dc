//! Account number allocation
//!
//! Numbers come from a dedicated allocator instead of inline randomness at the
//! registration site. Storage backends provide a sequence-based allocator;
//! [`RandomAllocator`] draws from a fixed six-digit range and relies on the
//! directory retrying when the uniqueness constraint rejects a collision.

use async_trait::async_trait;
use rand::Rng;

use super::models::AccountNumber;
use crate::error::LedgerError;

#[async_trait]
pub trait NumberAllocator: Send + Sync {
    /// Hand out a candidate number. Uniqueness is enforced on insert.
    async fn allocate(&self) -> Result<AccountNumber, LedgerError>;
}

/// Uniform draw from `[min, max]`
#[derive(Debug, Clone)]
pub struct RandomAllocator {
    min: u32,
    max: u32,
}

impl RandomAllocator {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }
}

impl Default for RandomAllocator {
    fn default() -> Self {
        Self::new(AccountNumber::FIRST, 999_999)
    }
}

#[async_trait]
impl NumberAllocator for RandomAllocator {
    async fn allocate(&self) -> Result<AccountNumber, LedgerError> {
        let number = rand::thread_rng().gen_range(self.min..=self.max);
        Ok(AccountNumber::new(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_random_allocator_stays_in_range() {
        let allocator = RandomAllocator::new(10, 12);
        for _ in 0..50 {
            let n = allocator.allocate().await.unwrap().value();
            assert!((10..=12).contains(&n));
        }
    }

    #[tokio::test]
    async fn test_random_allocator_single_value() {
        let allocator = RandomAllocator::new(7, 7);
        assert_eq!(allocator.allocate().await.unwrap().value(), 7);
    }

    #[test]
    fn test_random_allocator_swaps_bounds() {
        let allocator = RandomAllocator::new(20, 10);
        assert_eq!((allocator.min, allocator.max), (10, 20));
    }
}
