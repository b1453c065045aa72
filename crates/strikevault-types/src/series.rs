//! Series model: the immutable definition of one option series and the
//! two-state expiration lifecycle.
//!
//! ```text
//!   ┌─────────────┐  time ≥ expires_at, or admin trigger  ┌─────────┐
//!   │ NOT_EXPIRED ├──────────────────────────────────────▶│ EXPIRED │
//!   └─────────────┘                                       └─────────┘
//! ```
//!
//! There is no transition back to `NOT_EXPIRED`.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Result, SeriesId, StrikevaultError, amount, constants};

/// Lifecycle state of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesState {
    /// Options can be minted, burned, and exercised.
    NotExpired,
    /// Terminal. Only withdrawals and option transfers remain.
    Expired,
}

impl SeriesState {
    /// Transitions are monotonic: only `NotExpired → Expired`.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::NotExpired, Self::Expired))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        *self == Self::Expired
    }
}

impl fmt::Display for SeriesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotExpired => write!(f, "NOT_EXPIRED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// When and by whom a series may be expired.
///
/// At least one of the two fields must be set. With `expires_at`, the
/// series expires by itself once wall time reaches the instant. With
/// `admin`, that address may force expiration at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub admin: Option<Address>,
}

impl ExpirationPolicy {
    /// Expire at a fixed instant, with no manual trigger.
    #[must_use]
    pub fn at(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at: Some(expires_at),
            admin: None,
        }
    }

    /// No expiry instant; only `admin` can expire the series.
    #[must_use]
    pub fn manual(admin: Address) -> Self {
        Self {
            expires_at: None,
            admin: Some(admin),
        }
    }

    /// Add an admin who may expire the series early.
    #[must_use]
    pub fn with_admin(mut self, admin: Address) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Whether wall time alone has expired the series.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Whether `caller` holds the manual trigger.
    #[must_use]
    pub fn is_admin(&self, caller: &Address) -> bool {
        self.admin.as_ref() == Some(caller)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expires_at.is_none() && self.admin.is_none() {
            return Err(StrikevaultError::InvalidSeries {
                reason: "expiration policy needs an instant, an admin, or both".into(),
            });
        }
        Ok(())
    }
}

/// Identity of an external fungible asset as recorded in a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// One configured option series. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    /// Option token name, e.g. `"oh DAI:USDC"`.
    pub name: String,
    /// Option token symbol, e.g. `"OH:DAI:USDC"`.
    pub symbol: String,
    /// Asset delivered by holders at exercise.
    pub underlying: AssetInfo,
    /// Asset locked as collateral at mint.
    pub strike: AssetInfo,
    /// Strike base units required per whole option.
    #[serde(with = "amount::serde_str")]
    pub strike_ratio: Amount,
    pub expiration: ExpirationPolicy,
    pub created_at: DateTime<Utc>,
}

impl Series {
    /// Option unit decimals are fixed, whatever the assets use.
    #[must_use]
    pub fn option_decimals(&self) -> u8 {
        constants::OPTION_DECIMALS
    }

    /// Underlying base units delivered per whole option exercised.
    pub fn underlying_per_option(&self) -> Result<Amount> {
        amount::pow10(self.underlying.decimals)
    }

    /// Address under which the vault for this series holds its pools.
    #[must_use]
    pub fn vault_address(&self) -> Address {
        self.id.vault_address()
    }

    /// Strike ratio as a human number of strike-asset units.
    #[must_use]
    pub fn strike_price(&self) -> Option<Decimal> {
        amount::to_decimal(self.strike_ratio, self.strike.decimals)
    }

    /// Structural validation shared by every constructor.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StrikevaultError::InvalidSeries {
                reason: "name must not be empty".into(),
            });
        }
        if self.symbol.trim().is_empty() {
            return Err(StrikevaultError::InvalidSeries {
                reason: "symbol must not be empty".into(),
            });
        }
        if self.strike_ratio == 0 {
            return Err(StrikevaultError::InvalidSeries {
                reason: "strike ratio must be greater than zero".into(),
            });
        }
        for (role, asset) in [("underlying", &self.underlying), ("strike", &self.strike)] {
            if asset.decimals > constants::MAX_ASSET_DECIMALS {
                return Err(StrikevaultError::InvalidSeries {
                    reason: format!(
                        "{role} decimals {} exceed {}",
                        asset.decimals,
                        constants::MAX_ASSET_DECIMALS
                    ),
                });
            }
        }
        if self.underlying.address == self.strike.address {
            return Err(StrikevaultError::InvalidSeries {
                reason: "underlying and strike must be different assets".into(),
            });
        }
        self.expiration.validate()
    }
}
