//! Series configuration.
//!
//! A [`SeriesConfig`] is the serialized form an operator writes to set up a
//! series. It is turned into an immutable [`Series`] once the two external
//! assets are known.
//!
//! ```json
//! {
//!   "name": "oh DAI:USDC",
//!   "symbol": "OH:DAI:USDC",
//!   "underlying_decimals": 18,
//!   "strike_ratio": "1000001",
//!   "expiration": { "expires_at": "2026-12-31T00:00:00Z" }
//! }
//! ```
//!
//! The strike may be given either as `strike_ratio` (raw strike base units
//! per option) or as `strike_price` (a human number scaled by the strike
//! asset's decimals), never both.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    Amount, AssetInfo, ExpirationPolicy, Result, Series, SeriesId, StrikevaultError, amount,
};

/// Operator-facing definition of a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub name: String,
    pub symbol: String,
    /// Must match the decimals reported by the underlying asset.
    pub underlying_decimals: u8,
    /// Raw strike base units per whole option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike_ratio: Option<String>,
    /// Human strike price, e.g. `"1.000001"` for a 6-decimal asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike_price: Option<String>,
    pub expiration: ExpirationPolicy,
}

impl SeriesConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StrikevaultError::Configuration(format!("series config: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Resolve the strike to raw base units of `strike_decimals`.
    pub fn resolve_strike_ratio(&self, strike_decimals: u8) -> Result<Amount> {
        match (&self.strike_ratio, &self.strike_price) {
            (Some(raw), None) => raw.trim().parse::<Amount>().map_err(|e| {
                StrikevaultError::Configuration(format!("strike_ratio {raw:?}: {e}"))
            }),
            (None, Some(price)) => amount::parse_units(price, strike_decimals),
            (Some(_), Some(_)) => Err(StrikevaultError::Configuration(
                "give strike_ratio or strike_price, not both".into(),
            )),
            (None, None) => Err(StrikevaultError::Configuration(
                "missing strike_ratio or strike_price".into(),
            )),
        }
    }

    /// Build the immutable series for the given assets.
    pub fn into_series(self, underlying: AssetInfo, strike: AssetInfo) -> Result<Series> {
        if self.underlying_decimals != underlying.decimals {
            return Err(StrikevaultError::InvalidSeries {
                reason: format!(
                    "configured underlying decimals {} but {} reports {}",
                    self.underlying_decimals, underlying.symbol, underlying.decimals
                ),
            });
        }
        let strike_ratio = self.resolve_strike_ratio(strike.decimals)?;
        let series = Series {
            id: SeriesId::new(),
            name: self.name,
            symbol: self.symbol,
            underlying,
            strike,
            strike_ratio,
            expiration: self.expiration,
            created_at: Utc::now(),
        };
        series.validate()?;
        Ok(series)
    }
}
