//! Settlement arithmetic.
//!
//! Pure functions over raw fixed-point integers, no state and no side
//! effects:
//!
//! ```text
//! option units     = n × 10^18
//! mint cost        = n × strike_ratio          (also the burn refund)
//! exercise         = n × 10^underlying_decimals in, n × strike_ratio out
//! withdraw payout  = floor(pool × locked / total_locked)   per pool
//! ```
//!
//! Rounding is always toward zero. The last minter to withdraw holds the
//! whole remaining `total_locked`, so the floor remainders of earlier
//! withdrawals end up with them and the pools drain exactly to zero.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use strikevault_types::{Amount, Result, Series, StrikevaultError, amount, constants};

/// Amounts moved by exercising options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseAmounts {
    /// Option units burned from the holder.
    pub option_units: Amount,
    /// Underlying pulled from the holder into the pool.
    pub underlying_in: Amount,
    /// Strike paid from the pool to the holder.
    pub strike_out: Amount,
}

/// One minter's post-expiry payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WithdrawalAmounts {
    pub strike: Amount,
    pub underlying: Amount,
}

/// Fixed-point settlement math for one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementEngine {
    strike_ratio: Amount,
    underlying_per_option: Amount,
}

impl SettlementEngine {
    /// # Errors
    /// - `InvalidSeries` if `strike_ratio` is zero
    /// - `ArithmeticOverflow` if `10^underlying_decimals` does not fit
    pub fn new(strike_ratio: Amount, underlying_decimals: u8) -> Result<Self> {
        if strike_ratio == 0 {
            return Err(StrikevaultError::InvalidSeries {
                reason: "strike ratio must be greater than zero".into(),
            });
        }
        Ok(Self {
            strike_ratio,
            underlying_per_option: amount::pow10(underlying_decimals)?,
        })
    }

    pub fn for_series(series: &Series) -> Result<Self> {
        Self::new(series.strike_ratio, series.underlying.decimals)
    }

    #[must_use]
    pub fn strike_ratio(&self) -> Amount {
        self.strike_ratio
    }

    #[must_use]
    pub fn underlying_per_option(&self) -> Amount {
        self.underlying_per_option
    }

    /// Option units for `options` whole options.
    pub fn option_units(options: Amount) -> Result<Amount> {
        amount::mul(options, constants::OPTION_UNIT, "option units")
    }

    /// Strike locked by minting `options`, and refunded by burning them.
    pub fn collateral_for(&self, options: Amount) -> Result<Amount> {
        amount::mul(options, self.strike_ratio, "strike collateral")
    }

    /// What exercising `options` moves.
    pub fn exercise(&self, options: Amount) -> Result<ExerciseAmounts> {
        Ok(ExerciseAmounts {
            option_units: Self::option_units(options)?,
            underlying_in: amount::mul(options, self.underlying_per_option, "exercise underlying")?,
            strike_out: self.collateral_for(options)?,
        })
    }

    /// A minter's share of both pools.
    pub fn withdrawal(
        strike_pool: Amount,
        underlying_pool: Amount,
        locked: Amount,
        total_locked: Amount,
    ) -> Result<WithdrawalAmounts> {
        Ok(WithdrawalAmounts {
            strike: pro_rata_share(strike_pool, locked, total_locked)?,
            underlying: pro_rata_share(underlying_pool, locked, total_locked)?,
        })
    }
}

/// `floor(pool × share / total)`, exact for any `u128` inputs.
///
/// Returns zero when `total` is zero. A `share` above `total` means the
/// locked bookkeeping is corrupt and is reported as `InvariantViolation`.
pub fn pro_rata_share(pool: Amount, share: Amount, total: Amount) -> Result<Amount> {
    if total == 0 || pool == 0 || share == 0 {
        return Ok(0);
    }
    if share > total {
        return Err(StrikevaultError::InvariantViolation {
            reason: format!("share {share} exceeds total locked {total}"),
        });
    }
    if share == total {
        return Ok(pool);
    }
    if let Some(product) = pool.checked_mul(share) {
        return Ok(product / total);
    }
    // 256-bit intermediate; the quotient is at most `pool`, so it fits.
    let wide = BigUint::from(pool) * BigUint::from(share) / BigUint::from(total);
    Amount::try_from(&wide).map_err(|_| StrikevaultError::ArithmeticOverflow {
        context: "pro-rata share",
    })
}
