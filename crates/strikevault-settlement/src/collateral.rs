//! Locked-collateral book: strike each minter personally contributed.
//!
//! An entry moves only through its owner's own mint, burn, and withdraw.
//! Option-unit transfers never touch it, which is what ties burn rights
//! and the post-expiry payout to the minter rather than to whoever holds
//! the units.
//!
//! ```text
//! mint(n)      locked[caller] += n × ratio     total += n × ratio
//! burn(n)      locked[caller] -= n × ratio     total -= n × ratio
//! exercise(n)  (unchanged)
//! withdraw()   locked[caller]  = 0             total -= old locked[caller]
//! ```

use std::collections::HashMap;

use strikevault_types::{Address, Amount, Result, StrikevaultError, amount};

/// Per-minter locked amounts and their running total.
#[derive(Debug, Clone, Default)]
pub struct CollateralBook {
    locked: HashMap<Address, Amount>,
    total_locked: Amount,
}

impl CollateralBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn locked_of(&self, minter: &Address) -> Amount {
        self.locked.get(minter).copied().unwrap_or(0)
    }

    /// Running total, maintained incrementally.
    #[must_use]
    pub fn total_locked(&self) -> Amount {
        self.total_locked
    }

    /// Check that `amount` can be added for `minter` without overflow.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if either the entry or the total would
    /// overflow.
    pub fn ensure_can_lock(&self, minter: &Address, amount: Amount) -> Result<()> {
        amount::add(self.locked_of(minter), amount, "locked collateral")?;
        amount::add(self.total_locked, amount, "total locked")?;
        Ok(())
    }

    /// Record `amount` of strike contributed by `minter`.
    pub fn lock(&mut self, minter: Address, amount: Amount) -> Result<()> {
        self.ensure_can_lock(&minter, amount)?;
        if amount == 0 {
            return Ok(());
        }
        *self.locked.entry(minter).or_insert(0) += amount;
        self.total_locked += amount;
        Ok(())
    }

    /// # Errors
    /// Returns `InsufficientLocked` if `minter` contributed less than `amount`.
    pub fn ensure_can_unlock(&self, minter: &Address, amount: Amount) -> Result<()> {
        let locked = self.locked_of(minter);
        if locked < amount {
            return Err(StrikevaultError::InsufficientLocked {
                needed: amount,
                locked,
            });
        }
        Ok(())
    }

    /// Release `amount` of `minter`'s contribution (burn).
    pub fn unlock(&mut self, minter: &Address, amount: Amount) -> Result<()> {
        self.ensure_can_unlock(minter, amount)?;
        if amount == 0 {
            return Ok(());
        }
        let remaining = self.locked_of(minter) - amount;
        if remaining == 0 {
            self.locked.remove(minter);
        } else {
            self.locked.insert(*minter, remaining);
        }
        self.total_locked = self.total_locked.checked_sub(amount).ok_or_else(|| {
            StrikevaultError::InvariantViolation {
                reason: format!("total locked {} below entry {amount}", self.total_locked),
            }
        })?;
        Ok(())
    }

    /// Zero `minter`'s entry and return what it held (withdraw).
    pub fn settle(&mut self, minter: &Address) -> Result<Amount> {
        let Some(locked) = self.locked.remove(minter) else {
            return Ok(0);
        };
        match self.total_locked.checked_sub(locked) {
            Some(rest) => {
                self.total_locked = rest;
                Ok(locked)
            }
            None => {
                self.locked.insert(*minter, locked);
                Err(StrikevaultError::InvariantViolation {
                    reason: format!("total locked {} below entry {locked}", self.total_locked),
                })
            }
        }
    }

    /// All non-zero entries.
    pub fn entries(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.locked.iter()
    }

    /// Recomputed sum of the entries; `None` on overflow.
    #[must_use]
    pub fn sum_of_entries(&self) -> Option<Amount> {
        self.locked
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_accumulates_per_minter() {
        let a = Address::random();
        let b = Address::random();
        let mut book = CollateralBook::new();
        book.lock(a, 1_000_001).unwrap();
        book.lock(a, 1_000_001).unwrap();
        book.lock(b, 5).unwrap();
        assert_eq!(book.locked_of(&a), 2_000_002);
        assert_eq!(book.locked_of(&b), 5);
        assert_eq!(book.total_locked(), 2_000_007);
        assert_eq!(book.sum_of_entries(), Some(book.total_locked()));
    }

    #[test]
    fn unlock_capped_by_own_contribution() {
        let a = Address::random();
        let mut book = CollateralBook::new();
        book.lock(a, 1_000_001).unwrap();
        let err = book.unlock(&a, 2_000_002).unwrap_err();
        assert!(matches!(
            err,
            StrikevaultError::InsufficientLocked {
                needed: 2_000_002,
                locked: 1_000_001
            }
        ));
        assert_eq!(book.total_locked(), 1_000_001);
    }

    #[test]
    fn stranger_has_nothing_to_unlock() {
        let a = Address::random();
        let b = Address::random();
        let mut book = CollateralBook::new();
        book.lock(a, 10).unwrap();
        assert!(book.unlock(&b, 10).is_err());
        assert_eq!(book.locked_of(&a), 10);
    }

    #[test]
    fn full_unlock_drops_entry() {
        let a = Address::random();
        let mut book = CollateralBook::new();
        book.lock(a, 10).unwrap();
        book.unlock(&a, 10).unwrap();
        assert_eq!(book.entries().count(), 0);
        assert_eq!(book.total_locked(), 0);
    }

    #[test]
    fn settle_zeroes_entry_once() {
        let a = Address::random();
        let b = Address::random();
        let mut book = CollateralBook::new();
        book.lock(a, 7).unwrap();
        book.lock(b, 3).unwrap();
        assert_eq!(book.settle(&a).unwrap(), 7);
        assert_eq!(book.settle(&a).unwrap(), 0);
        assert_eq!(book.total_locked(), 3);
        assert_eq!(book.locked_of(&a), 0);
    }

    #[test]
    fn lock_overflow_leaves_book_unchanged() {
        let a = Address::random();
        let b = Address::random();
        let mut book = CollateralBook::new();
        book.lock(a, u128::MAX).unwrap();
        let err = book.lock(b, 1).unwrap_err();
        assert!(matches!(err, StrikevaultError::ArithmeticOverflow { .. }));
        assert_eq!(book.locked_of(&b), 0);
        assert_eq!(book.total_locked(), u128::MAX);
    }
}
