//! In-process fungible asset.
//!
//! [`Token`] wraps a [`TokenLedger`] behind a read-write lock and
//! implements [`FungibleAsset`], so it can stand in for the strike or
//! underlying asset wherever the vault is hosted in-process.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strikevault_types::{Address, Amount, Result};

use crate::{FungibleAsset, TokenLedger};

/// Static description of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    /// Metadata with an address derived from name and symbol.
    #[must_use]
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        let name = name.into();
        let symbol = symbol.into();
        let address = Address::derive(
            b"strikevault:token:v1:",
            format!("{name}\u{0}{symbol}").as_bytes(),
        );
        Self {
            address,
            name,
            symbol,
            decimals,
        }
    }
}

/// Thread-safe in-process fungible asset.
pub struct Token {
    meta: TokenMetadata,
    ledger: RwLock<TokenLedger>,
}

impl Token {
    /// Create a token with no supply.
    #[must_use]
    pub fn new(meta: TokenMetadata) -> Self {
        Self {
            meta,
            ledger: RwLock::new(TokenLedger::new()),
        }
    }

    /// Create a token whose entire initial supply belongs to `holder`.
    pub fn standalone(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        initial_supply: Amount,
        holder: Address,
    ) -> Result<Self> {
        let token = Self::new(TokenMetadata::new(name, symbol, decimals));
        token.ledger.write().mint(holder, initial_supply)?;
        Ok(token)
    }

    #[must_use]
    pub fn metadata(&self) -> &TokenMetadata {
        &self.meta
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.ledger.read().total_supply()
    }

    /// Issue new units, as the token's own minter would.
    pub fn mint(&self, to: Address, amount: Amount) -> Result<()> {
        self.ledger.write().mint(to, amount)
    }
}

impl FungibleAsset for Token {
    fn address(&self) -> Address {
        self.meta.address
    }

    fn symbol(&self) -> String {
        self.meta.symbol.clone()
    }

    fn decimals(&self) -> u8 {
        self.meta.decimals
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.ledger.read().balance_of(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.ledger.read().allowance(owner, spender)
    }

    fn approve(&self, owner: Address, spender: Address, amount: Amount) -> Result<()> {
        self.ledger.write().approve(owner, spender, amount);
        Ok(())
    }

    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.ledger.write().transfer(from, to, amount)?;
        tracing::debug!(
            token = %self.meta.symbol,
            from = %from.short(),
            to = %to.short(),
            amount = %amount,
            "Asset transfer"
        );
        Ok(())
    }

    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ledger.write().transfer_from(spender, from, to, amount)?;
        tracing::debug!(
            token = %self.meta.symbol,
            spender = %spender.short(),
            from = %from.short(),
            to = %to.short(),
            amount = %amount,
            "Asset pulled under allowance"
        );
        Ok(())
    }
}
