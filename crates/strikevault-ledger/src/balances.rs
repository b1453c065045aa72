//! Balance, allowance, and supply accounting for one fungible unit.
//!
//! All mutations are atomic: every check runs before the first write, so
//! either the full operation succeeds or the ledger is unchanged.

use std::collections::HashMap;

use strikevault_types::{Address, Amount, Result, StrikevaultError};

/// Standard fungible-unit ledger: balances, allowances, total supply.
///
/// Zero balances and zero allowances are not stored, so iterating
/// [`TokenLedger::holders`] yields only accounts that own something.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    /// Units owned per account.
    balances: HashMap<Address, Amount>,
    /// Units `spender` may move out of `owner`, keyed `(owner, spender)`.
    allowances: HashMap<(Address, Address), Amount>,
    /// Sum of all balances.
    total_supply: Amount,
}

impl TokenLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Set (overwrite) the allowance of `spender` over `owner`'s units.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if `from` owns less than `amount`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.ensure_balance(&from, amount)?;
        self.debit(from, amount);
        self.credit(to, amount);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    ///
    /// # Errors
    /// - `InsufficientAllowance` if `spender` is not approved for `amount`
    /// - `InsufficientBalance` if `from` owns less than `amount`
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let allowed = self.allowance(&from, &spender);
        if allowed < amount {
            return Err(StrikevaultError::InsufficientAllowance {
                needed: amount,
                available: allowed,
            });
        }
        self.ensure_balance(&from, amount)?;

        self.approve(from, spender, allowed - amount);
        self.debit(from, amount);
        self.credit(to, amount);
        Ok(())
    }

    /// Create `amount` new units owned by `to`.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if total supply would exceed `u128`.
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<()> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(StrikevaultError::ArithmeticOverflow {
                context: "ledger mint",
            })?;
        self.credit(to, amount);
        Ok(())
    }

    /// Destroy `amount` units owned by `from`.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if `from` owns less than `amount`.
    pub fn burn(&mut self, from: Address, amount: Amount) -> Result<()> {
        self.ensure_balance(&from, amount)?;
        self.debit(from, amount);
        self.total_supply -= amount;
        Ok(())
    }

    /// Accounts with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Sum of every stored balance; equals `total_supply` when consistent.
    #[must_use]
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
    }

    fn ensure_balance(&self, owner: &Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(owner);
        if available < amount {
            return Err(StrikevaultError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    // Callers check the balance first.
    fn debit(&mut self, owner: Address, amount: Amount) {
        if let Some(balance) = self.balances.get_mut(&owner) {
            *balance -= amount;
            if *balance == 0 {
                self.balances.remove(&owner);
            }
        }
    }

    // Every balance is bounded by total_supply, so this cannot overflow.
    fn credit(&mut self, owner: Address, amount: Amount) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(owner).or_insert(0) += amount;
    }
}
