//! The external fungible-asset collaborator.
//!
//! The strike and underlying assets are services outside the vault. The
//! vault only ever calls [`FungibleAsset::transfer_from`] to pull funds
//! from a holder and [`FungibleAsset::transfer`] to pay out of its own
//! custody; the rest of the surface exists for holders and for invariant
//! checks. Any `Err` must leave the asset unchanged.

use strikevault_types::{Address, Amount, AssetInfo, Result};

/// A fungible asset the vault can pull from and pay out of.
///
/// Methods take `&self`: implementations are shared services and handle
/// their own synchronization.
///
/// The vault calls these methods while holding its write lock, and that
/// lock is not re-entrant. An implementation must not call back into the
/// vault from inside any method, not even a read-only query; doing so
/// deadlocks the calling thread.
pub trait FungibleAsset: Send + Sync {
    /// The asset's own address; recorded in the series.
    fn address(&self) -> Address;

    fn symbol(&self) -> String;

    fn decimals(&self) -> u8;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn approve(&self, owner: Address, spender: Address, amount: Amount) -> Result<()>;

    /// `from` moves its own units to `to`.
    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<()>;

    /// `spender` moves `from`'s units to `to` under an allowance.
    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    /// Identity snapshot for recording in a series.
    fn info(&self) -> AssetInfo {
        AssetInfo {
            address: self.address(),
            symbol: self.symbol(),
            decimals: self.decimals(),
        }
    }
}
