//! # strikevault-ledger
//!
//! **Fungible-unit accounting** for StrikeVault.
//!
//! ## Architecture
//!
//! 1. **TokenLedger**: balances, allowances, and total supply of one fungible unit
//! 2. **FungibleAsset**: the collaborator interface the vault calls on the
//!    strike and underlying assets (`transfer_from` to pull, `transfer` to pay)
//! 3. **Token**: an in-process, thread-safe [`FungibleAsset`] backed by a `TokenLedger`
//! 4. **OptionLedger**: the series' own 18-decimal option units
//!
//! ## Trust Boundary
//!
//! `OptionLedger::mint` and `OptionLedger::burn` are only reachable by whoever
//! owns the ledger value. The vault keeps its `OptionLedger` private and
//! exposes transfer/approve/transfer_from only, so external callers can never
//! create or destroy option units directly.

pub mod asset;
pub mod balances;
pub mod option_ledger;
pub mod token;

pub use asset::FungibleAsset;
pub use balances::TokenLedger;
pub use option_ledger::OptionLedger;
pub use token::{Token, TokenMetadata};
