//! # strikevault-settlement
//!
//! **Series lifecycle**: minting, burning, exercise, expiry, and the
//! post-expiry pro-rata withdrawal for one collateralized option series.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──▶ CollateralVault ──┬──▶ SeriesClock       (NOT_EXPIRED / EXPIRED gate)
//!                                ├──▶ SettlementEngine  (checked fixed-point math)
//!                                ├──▶ CollateralBook    (locked strike per minter)
//!                                ├──▶ OptionLedger      (18-decimal option units)
//!                                └──▶ FungibleAsset ×2  (strike, underlying)
//! ```
//!
//! The vault is the single writer. Each operation runs under one write
//! lock and either commits completely or leaves every pool, balance, and
//! locked record as it was. The one exception is a withdrawal whose
//! payout was only partly delivered: the rest is kept as owed to the
//! minter and paid by their next withdrawal. [`ConservationCheck`] verifies the books
//! against the vault's real custody at any point.

pub mod clock;
pub mod collateral;
pub mod conservation;
pub mod engine;
pub mod vault;

pub use clock::{ManualTimeSource, SeriesClock, SystemTimeSource, TimeSource};
pub use collateral::CollateralBook;
pub use conservation::{ConservationCheck, MinterPosition, VaultSnapshot};
pub use engine::{ExerciseAmounts, SettlementEngine, WithdrawalAmounts, pro_rata_share};
pub use vault::CollateralVault;
