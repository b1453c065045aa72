//! Receipts for committed vault operations.
//!
//! Every mutating vault call that succeeds returns a [`VaultReceipt`]
//! recording exactly which amounts moved. Receipts carry a per-vault
//! monotonic sequence number, so a stream of them is a complete audit
//! trail of the series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, SeriesId, amount};

/// The operation a receipt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// Strike collateral locked, option units issued.
    Minted,
    /// Option units returned, strike collateral unlocked.
    Burned,
    /// Underlying delivered, strike paid out, option units burned.
    Exercised,
    /// Post-expiry pro-rata payout.
    Withdrawn,
    /// The series was expired.
    Expired,
}

impl std::fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minted => write!(f, "MINTED"),
            Self::Burned => write!(f, "BURNED"),
            Self::Exercised => write!(f, "EXERCISED"),
            Self::Withdrawn => write!(f, "WITHDRAWN"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Record of one committed vault operation. Directions are from the
/// vault's point of view: `*_in` entered a pool, `*_out` left it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultReceipt {
    pub sequence: u64,
    pub series_id: SeriesId,
    pub kind: ReceiptKind,
    pub caller: Address,
    /// Option units issued (mint) or destroyed (burn, exercise).
    #[serde(with = "amount::serde_str")]
    pub option_units: Amount,
    #[serde(with = "amount::serde_str")]
    pub strike_in: Amount,
    #[serde(with = "amount::serde_str")]
    pub strike_out: Amount,
    #[serde(with = "amount::serde_str")]
    pub underlying_in: Amount,
    #[serde(with = "amount::serde_str")]
    pub underlying_out: Amount,
    pub issued_at: DateTime<Utc>,
}

impl VaultReceipt {
    /// A receipt with no amounts moved yet.
    #[must_use]
    pub fn new(
        sequence: u64,
        series_id: SeriesId,
        kind: ReceiptKind,
        caller: Address,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sequence,
            series_id,
            kind,
            caller,
            option_units: 0,
            strike_in: 0,
            strike_out: 0,
            underlying_in: 0,
            underlying_out: 0,
            issued_at,
        }
    }

    /// Whether the operation moved nothing at all (e.g. a repeated withdraw).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.option_units == 0
            && self.strike_in == 0
            && self.strike_out == 0
            && self.underlying_in == 0
            && self.underlying_out == 0
    }
}
