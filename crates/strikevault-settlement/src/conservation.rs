//! Vault snapshots and the conservation checker.
//!
//! Invariants checked against a snapshot plus the vault's custody at the
//! two external assets:
//! ```text
//! Σ locked[minter]        == total_locked
//! Σ option balances       == option supply
//! strike_pool + owed      <= strike custody
//! underlying_pool + owed  <= underlying custody
//! before expiry:  strike_pool × 10^18 == option supply × strike_ratio
//! after expiry:   total_locked == 0  ⇒  both pools == 0
//! ```
//!
//! "Owed" is collateral already settled out of the pools whose transfer
//! was rejected; it stays in custody until the minter withdraws again.
//!
//! A failure here means the bookkeeping is corrupt, never that a caller
//! did something wrong.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use strikevault_types::{
    Address, Amount, Result, SeriesId, SeriesState, StrikevaultError, amount, constants,
};

/// One address's view in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinterPosition {
    pub address: Address,
    #[serde(with = "amount::serde_str")]
    pub locked: Amount,
    #[serde(with = "amount::serde_str")]
    pub options: Amount,
}

/// Point-in-time copy of a vault's state, taken under one read lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub series_id: SeriesId,
    pub state: SeriesState,
    #[serde(with = "amount::serde_str")]
    pub strike_ratio: Amount,
    #[serde(with = "amount::serde_str")]
    pub strike_pool: Amount,
    #[serde(with = "amount::serde_str")]
    pub underlying_pool: Amount,
    #[serde(with = "amount::serde_str")]
    pub owed_strike: Amount,
    #[serde(with = "amount::serde_str")]
    pub owed_underlying: Amount,
    #[serde(with = "amount::serde_str")]
    pub total_locked: Amount,
    #[serde(with = "amount::serde_str")]
    pub option_supply: Amount,
    /// Every address with locked collateral or option units, sorted.
    pub positions: Vec<MinterPosition>,
    pub taken_at: DateTime<Utc>,
}

impl VaultSnapshot {
    #[must_use]
    pub fn position(&self, address: &Address) -> Option<&MinterPosition> {
        self.positions.iter().find(|p| p.address == *address)
    }
}

/// Stateless verifier for [`VaultSnapshot`]s.
pub struct ConservationCheck;

impl ConservationCheck {
    /// Verify every conservation invariant.
    ///
    /// # Errors
    /// Returns [`StrikevaultError::InvariantViolation`] naming the first
    /// invariant that does not hold.
    pub fn verify(
        snapshot: &VaultSnapshot,
        strike_custody: Amount,
        underlying_custody: Amount,
    ) -> Result<()> {
        let locked_sum = sum(snapshot.positions.iter().map(|p| p.locked), "locked")?;
        if locked_sum != snapshot.total_locked {
            return Err(violation(format!(
                "sum of locked {locked_sum} != total locked {}",
                snapshot.total_locked
            )));
        }

        let option_sum = sum(snapshot.positions.iter().map(|p| p.options), "options")?;
        if option_sum != snapshot.option_supply {
            return Err(violation(format!(
                "sum of option balances {option_sum} != supply {}",
                snapshot.option_supply
            )));
        }

        let strike_held = sum(
            [snapshot.strike_pool, snapshot.owed_strike].into_iter(),
            "strike pool and owed",
        )?;
        if strike_held > strike_custody {
            return Err(violation(format!(
                "strike pool {} plus owed {} exceeds custody {strike_custody}",
                snapshot.strike_pool, snapshot.owed_strike
            )));
        }
        let underlying_held = sum(
            [snapshot.underlying_pool, snapshot.owed_underlying].into_iter(),
            "underlying pool and owed",
        )?;
        if underlying_held > underlying_custody {
            return Err(violation(format!(
                "underlying pool {} plus owed {} exceeds custody {underlying_custody}",
                snapshot.underlying_pool, snapshot.owed_underlying
            )));
        }

        match snapshot.state {
            SeriesState::NotExpired => {
                // Every outstanding option is backed by exactly one strike ratio.
                let backing = BigUint::from(snapshot.strike_pool)
                    * BigUint::from(constants::OPTION_UNIT);
                let owed =
                    BigUint::from(snapshot.option_supply) * BigUint::from(snapshot.strike_ratio);
                if backing != owed {
                    return Err(violation(format!(
                        "strike pool {} does not cover {} option units at ratio {}",
                        snapshot.strike_pool, snapshot.option_supply, snapshot.strike_ratio
                    )));
                }
            }
            SeriesState::Expired => {
                if snapshot.total_locked == 0
                    && (snapshot.strike_pool != 0 || snapshot.underlying_pool != 0)
                {
                    return Err(violation(format!(
                        "settled series still holds strike {} and underlying {}",
                        snapshot.strike_pool, snapshot.underlying_pool
                    )));
                }
            }
        }
        Ok(())
    }
}

fn sum(mut values: impl Iterator<Item = Amount>, what: &str) -> Result<Amount> {
    values
        .try_fold(0u128, Amount::checked_add)
        .ok_or_else(|| violation(format!("sum of {what} overflows")))
}

fn violation(reason: String) -> StrikevaultError {
    StrikevaultError::InvariantViolation { reason }
}
