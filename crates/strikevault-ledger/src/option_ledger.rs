//! Option-unit ledger.
//!
//! Option units always use 18 decimals, whatever the strike and underlying
//! assets use. Transfers and approvals stay available for the whole life
//! of the series, including after expiry: downstream liquidity pools hold
//! and move option units independently of the series state.

use strikevault_types::{Address, Amount, Result, constants};

use crate::TokenLedger;

/// Balances, allowances, and supply of one series' option units.
#[derive(Debug, Clone)]
pub struct OptionLedger {
    name: String,
    symbol: String,
    units: TokenLedger,
}

impl OptionLedger {
    #[must_use]
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            units: TokenLedger::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Always 18.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        constants::OPTION_DECIMALS
    }

    #[must_use]
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.units.balance_of(owner)
    }

    #[must_use]
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.units.allowance(owner, spender)
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.units.total_supply()
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.units.transfer(from, to, amount)?;
        tracing::debug!(
            option = %self.symbol,
            from = %from.short(),
            to = %to.short(),
            units = %amount,
            "Option transfer"
        );
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.units.approve(owner, spender, amount);
        tracing::debug!(
            option = %self.symbol,
            owner = %owner.short(),
            spender = %spender.short(),
            units = %amount,
            "Option approval"
        );
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.units.transfer_from(spender, from, to, amount)?;
        tracing::debug!(
            option = %self.symbol,
            spender = %spender.short(),
            from = %from.short(),
            to = %to.short(),
            units = %amount,
            "Option transfer under allowance"
        );
        Ok(())
    }

    /// Issue option units. Only the owning vault calls this.
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<()> {
        self.units.mint(to, amount)
    }

    /// Destroy option units. Only the owning vault calls this.
    pub fn burn(&mut self, from: Address, amount: Amount) -> Result<()> {
        self.units.burn(from, amount)
    }

    /// Accounts holding option units.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.units.holders()
    }

    #[must_use]
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.units.sum_of_balances()
    }
}
