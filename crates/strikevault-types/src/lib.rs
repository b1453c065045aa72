//! # strikevault-types
//!
//! Shared types, errors, and configuration for the **StrikeVault** option
//! settlement ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`SeriesId`]
//! - **Fixed-point amounts**: [`Amount`], [`pow10`], [`to_decimal`], [`parse_units`]
//! - **Series model**: [`Series`], [`SeriesState`], [`ExpirationPolicy`]
//! - **Configuration**: [`SeriesConfig`]
//! - **Receipts**: [`VaultReceipt`], [`ReceiptKind`]
//! - **Errors**: [`StrikevaultError`] with `SV_ERR_` prefix codes
//! - **Constants**: option decimals and other fixed values

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod receipt;
pub mod series;

// Re-export all primary types at crate root for ergonomic imports:
//   use strikevault_types::{Address, Series, StrikevaultError, ...};

pub use amount::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use receipt::*;
pub use series::*;

// Constants are accessed via `strikevault_types::constants::FOO`
// (not re-exported to avoid name collisions).
